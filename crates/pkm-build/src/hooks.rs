use camino::Utf8Path;
use fs_err as fs;
use serde::Deserialize;

use crate::error::BuildError;

/// A single argument to a PEP 517 hook call, rendered as a Python literal. Hooks in this
/// protocol only ever take `None` or a string (a directory path, typically), so that's all we
/// need to render.
#[derive(Debug, Clone)]
pub enum HookArg {
    None,
    Str(String),
}

impl HookArg {
    fn to_python_literal(&self) -> String {
        match self {
            HookArg::None => "None".to_string(),
            // Rust's `Debug` escaping for `"` and `\` lines up with Python's for the plain
            // paths these arguments carry; anything exotic would need a real repr().
            HookArg::Str(value) => format!("{value:?}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HookOutput {
    status: String,
    result: serde_json::Value,
}

/// The outcome of invoking one hook: either it ran and produced `result`, or the backend module
/// doesn't define it at all, in which case the hook is treated as a no-op rather than an error.
#[derive(Debug, Clone)]
pub struct HookResult {
    pub defined: bool,
    pub result: serde_json::Value,
}

/// Turns a PEP 517 `build-backend` string (`"module:attr"` or `"module"`) into a Python snippet
/// that binds the name `build_backend` to the resolved module or attribute.
pub fn backend_import_statement(build_backend: &str) -> String {
    match build_backend.split_once(':') {
        Some((module, attr)) => format!("import {module}\nbuild_backend = {module}.{attr}"),
        None => format!("import {build_backend} as build_backend"),
    }
}

/// Runs one PEP 517 hook inside `python`, with `source_tree` as the working directory (grounded
/// in `project_builders/external_builders.py`'s `_exec_build_cycle_script`): generates a tiny
/// launcher that checks `hasattr` before calling, and writes the JSON result to a scratch file
/// rather than stdout so backend print statements can't corrupt the result.
pub fn invoke_hook(
    python: &Utf8Path,
    source_tree: &Utf8Path,
    backend_import: &str,
    hook: &'static str,
    args: &[HookArg],
    extra_sys_path: &[String],
) -> Result<HookResult, BuildError> {
    let workdir = tempfile::tempdir()?;
    let workdir = Utf8Path::from_path(workdir.path()).expect("tempdir path is utf8");
    let output_path = workdir.join("hook-output.json");
    let output_literal = format!("{:?}", output_path.as_str());

    let arg_list = args.iter().map(HookArg::to_python_literal).collect::<Vec<_>>().join(", ");
    let script = format!(
        "{backend_import}\n\
         import json\n\
         \n\
         def _ret(status, result):\n\
         \twith open({output_literal}, 'w') as out:\n\
         \t\tjson.dump({{'status': status, 'result': result}}, out)\n\
         \n\
         if not hasattr(build_backend, {hook:?}):\n\
         \t_ret('undefined_hook', None)\n\
         else:\n\
         \tresult = build_backend.{hook}({arg_list})\n\
         \t_ret('success', result)\n"
    );

    let mut command = std::process::Command::new(python.as_std_path());
    command.args(["-c", &script]).current_dir(source_tree);
    if !extra_sys_path.is_empty() {
        command.env("PYTHONPATH", extra_sys_path.join(":"));
    }
    let output = command.output()?;

    if !output.status.success() {
        return Err(BuildError::HookFailed {
            backend: backend_import.to_string(),
            hook,
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let raw = fs::read_to_string(&output_path).map_err(|_| BuildError::MissingOutput {
        backend: backend_import.to_string(),
        hook,
    })?;
    let parsed: HookOutput = serde_json::from_str(&raw).map_err(|_| BuildError::MissingOutput {
        backend: backend_import.to_string(),
        hook,
    })?;

    Ok(HookResult { defined: parsed.status == "success", result: parsed.result })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_only_backend_imports_as_build_backend() {
        assert_eq!(backend_import_statement("setuptools.build_meta"), "import setuptools.build_meta as build_backend");
    }

    #[test]
    fn module_colon_attr_backend_rebinds_the_attribute() {
        assert_eq!(
            backend_import_statement("flit_core.buildapi:hooks"),
            "import flit_core.buildapi\nbuild_backend = flit_core.buildapi.hooks"
        );
    }
}
