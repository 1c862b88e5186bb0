use std::process::Command;

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::info::InterpreterInfo;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to run {0}")]
    Spawn(camino::Utf8PathBuf, #[source] std::io::Error),
    #[error("interpreter at {path} exited with a failure querying its own metadata:\n{stderr}")]
    NonZeroExit { path: camino::Utf8PathBuf, stderr: String },
    #[error("interpreter at {path} returned unparseable metadata: {source}")]
    Deserialize { path: camino::Utf8PathBuf, source: serde_json::Error },
}

/// A short, stdlib-only probe script, embedded as a string and passed via `-c` (no tempfile
/// needed, matching `gourgeist`'s one-shot CLI invocations). Prints a single JSON line so the
/// caller only has to parse the last line of stdout, tolerant of interpreters that print banner
/// text on startup (e.g. via `PYTHONSTARTUP`).
const PROBE_SCRIPT: &str = r#"
import json, platform, sys, sysconfig
info = sys.version_info
tags = []
try:
    from packaging.tags import sys_tags
    tags = [(t.interpreter, t.abi, t.platform) for t in sys_tags()]
except Exception:
    impl = "cp" if platform.python_implementation() == "CPython" else "pp"
    tags = [(f"{impl}{info.major}{info.minor}", "none", "any"), ("py3", "none", "any")]
record = {
    "major": info.major,
    "minor": info.minor,
    "patch": info.micro,
    "implementation": platform.python_implementation(),
    "base_prefix": sysconfig.get_config_var("base") or sys.base_prefix,
    "base_exec_prefix": sys.base_exec_prefix,
    "compatible_tags": tags,
    "markers": {
        "os_name": sys.platform if False else __import__("os").name,
        "sys_platform": sys.platform,
        "platform_machine": platform.machine(),
        "platform_python_implementation": platform.python_implementation(),
        "platform_release": platform.release(),
        "platform_system": platform.system(),
        "platform_version": platform.version(),
        "python_version": f"{info.major}.{info.minor}",
        "python_full_version": platform.python_version(),
        "implementation_name": sys.implementation.name,
        "implementation_version": platform.python_version(),
    },
}
print(json.dumps(record))
"#;

/// Runs `python -c <probe>` and parses the resulting `InterpreterInfo`. Blocking: interpreter
/// discovery happens once per candidate at zoo startup, not on the solver's hot path.
#[instrument(skip_all, fields(path = %path))]
pub fn query_interpreter(path: &Utf8Path) -> Result<InterpreterInfo, QueryError> {
    debug!("Querying interpreter");
    let output = Command::new(path.as_std_path())
        .args(["-c", PROBE_SCRIPT])
        .output()
        .map_err(|err| QueryError::Spawn(path.to_path_buf(), err))?;

    if !output.status.success() {
        return Err(QueryError::NonZeroExit {
            path: path.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let last_line = stdout.lines().last().unwrap_or_default();
    serde_json::from_str(last_line).map_err(|source| QueryError::Deserialize { path: path.to_path_buf(), source })
}
