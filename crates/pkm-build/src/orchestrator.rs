use std::io::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pkm_distribution::{Environment, PackageDescriptor};
use pkm_interpreter::Interpreter;
use pkm_pep508::Dependency;

use crate::backend::{BackendKind, BuildSystem, ProjectIdentity};
use crate::cycle;
use crate::error::BuildError;
use crate::hooks::{backend_import_statement, invoke_hook, HookArg};

/// Which PEP 517 artifact a build call is asking for; each maps to a different required hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedArtifact {
    Wheel,
    EditableWheel,
    Metadata,
    Sdist,
}

/// Unpacks a `.zip` or `.tar.gz` source archive into `dest` and returns the path of the single
/// top-level directory it must contain (grounded in `puffin-build::extract_archive`).
pub fn extract_source_archive(path: &Utf8Path, dest: &Utf8Path) -> Result<Utf8PathBuf, BuildError> {
    fs::create_dir_all(dest)?;

    if path.extension().is_some_and(|ext| ext == "zip") {
        let mut archive = zip::ZipArchive::new(fs::File::open(path)?)?;
        archive.extract(dest)?;
    } else if path.extension().is_some_and(|ext| ext == "gz")
        && path.file_stem().is_some_and(|stem| Utf8Path::new(stem).extension() == Some("tar"))
    {
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(fs::File::open(path)?));
        archive.unpack(dest)?;
    } else {
        return Err(BuildError::UnsupportedArchiveType(path.to_path_buf()));
    }

    let top_level = fs::read_dir(dest)?.collect::<std::io::Result<Vec<_>>>()?;
    let [root] = top_level.as_slice() else {
        return Err(BuildError::InvalidSourceDistribution(
            dest.to_path_buf(),
            format!("expected exactly one top-level directory in the archive, found {}", top_level.len()),
        ));
    };
    Ok(Utf8Path::from_path(root.path()).expect("archive member path is utf8").to_path_buf())
}

/// Materializes an ephemeral build environment for `source_tree` and produces the requested
/// artifact, dispatching to the standard or external builder. `install_requirements`
/// is injected rather than depending directly on `pkm-resolver`/`pkm-pubgrub`, mirroring
/// `pkm-venv::EnvironmentZoo::create_application`'s `trial_solve` closure — this crate only
/// needs *some* way to get requirements into an environment, not the resolver itself.
pub fn build(
    descriptor: &PackageDescriptor,
    source_tree: &Utf8Path,
    target_dir: &Utf8Path,
    base_interpreter: &Interpreter,
    requested: RequestedArtifact,
    mut install_requirements: impl FnMut(&Environment, &[Dependency]) -> Result<(), BuildError>,
) -> Result<Utf8PathBuf, BuildError> {
    let _guard = cycle::enter(descriptor)?;
    fs::create_dir_all(target_dir)?;

    let build_system = BuildSystem::from_source_tree(source_tree)?;
    match (build_system.kind(), requested) {
        (BackendKind::Standard, RequestedArtifact::Wheel) => standard_build_wheel(source_tree, target_dir, false),
        (BackendKind::Standard, RequestedArtifact::Metadata) => standard_build_wheel(source_tree, target_dir, true),
        (BackendKind::Standard, RequestedArtifact::Sdist) => standard_build_sdist(source_tree, target_dir),
        (BackendKind::Standard, RequestedArtifact::EditableWheel) => Err(BuildError::UndefinedRequiredHook {
            backend: "pkm (standard)".to_string(),
            hook: "build_editable",
        }),
        (BackendKind::External, _) => {
            let scratch = tempfile::tempdir()?;
            let scratch = Utf8Path::from_path(scratch.path()).expect("tempdir path is utf8");
            let env = pkm_venv::create_bare_venv(&scratch.join("venv"), base_interpreter)?;

            if !build_system.requires.is_empty() {
                install_requirements(&env, &build_system.requires)?;
            }

            external_build(&build_system, source_tree, target_dir, &env, requested, &mut install_requirements)
        }
    }
}

fn external_build(
    build_system: &BuildSystem,
    source_tree: &Utf8Path,
    target_dir: &Utf8Path,
    env: &Environment,
    requested: RequestedArtifact,
    install_requirements: &mut impl FnMut(&Environment, &[Dependency]) -> Result<(), BuildError>,
) -> Result<Utf8PathBuf, BuildError> {
    // > If the pyproject.toml file is absent, or the build-backend key is missing, tools should
    // > revert to the legacy behaviour of running setup.py implicitly via
    // > setuptools.build_meta:__legacy__.
    let backend_name = build_system.build_backend.clone().unwrap_or_else(|| "setuptools.build_meta:__legacy__".to_string());
    let backend_import = backend_import_statement(&backend_name);
    let extra_sys_path: Vec<String> =
        build_system.backend_path.iter().map(|p| source_tree.join(p).as_str().to_string()).collect();

    let requires_hook = match requested {
        RequestedArtifact::Wheel | RequestedArtifact::Metadata => "get_requires_for_build_wheel",
        RequestedArtifact::EditableWheel => "get_requires_for_build_editable",
        RequestedArtifact::Sdist => "get_requires_for_build_sdist",
    };
    let extra_requires =
        invoke_hook(&env.interpreter, source_tree, &backend_import, requires_hook, &[HookArg::None], &extra_sys_path)?;
    if extra_requires.defined {
        let names: Vec<String> = serde_json::from_value(extra_requires.result).unwrap_or_default();
        if !names.is_empty() {
            let deps = names
                .iter()
                .map(|raw| raw.parse::<Dependency>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| BuildError::RequirementsInstall(err.to_string()))?;
            install_requirements(env, &deps)?;
        }
    }

    let target_literal = target_dir.as_str().to_string();

    if requested == RequestedArtifact::Metadata {
        let output = invoke_hook(
            &env.interpreter,
            source_tree,
            &backend_import,
            "prepare_metadata_for_build_wheel",
            &[HookArg::Str(target_literal), HookArg::None],
            &extra_sys_path,
        )?;
        return artifact_path(&backend_name, "prepare_metadata_for_build_wheel", output, target_dir);
    }

    let (hook, args) = match requested {
        RequestedArtifact::Wheel => {
            ("build_wheel", vec![HookArg::Str(target_dir.as_str().to_string()), HookArg::None, HookArg::None])
        }
        RequestedArtifact::EditableWheel => {
            ("build_editable", vec![HookArg::Str(target_dir.as_str().to_string()), HookArg::None, HookArg::None])
        }
        RequestedArtifact::Sdist => ("build_sdist", vec![HookArg::Str(target_dir.as_str().to_string()), HookArg::None]),
        RequestedArtifact::Metadata => unreachable!("handled above"),
    };

    let output = invoke_hook(&env.interpreter, source_tree, &backend_import, hook, &args, &extra_sys_path)?;
    artifact_path(&backend_name, hook, output, target_dir)
}

fn artifact_path(
    backend: &str,
    hook: &'static str,
    output: crate::hooks::HookResult,
    target_dir: &Utf8Path,
) -> Result<Utf8PathBuf, BuildError> {
    if !output.defined {
        return Err(BuildError::UndefinedRequiredHook { backend: backend.to_string(), hook });
    }
    let filename: String = serde_json::from_value(output.result)
        .map_err(|_| BuildError::MissingOutput { backend: backend.to_string(), hook })?;
    let path = target_dir.join(filename);
    if !path.exists() {
        return Err(BuildError::MissingOutput { backend: backend.to_string(), hook });
    }
    Ok(path)
}

/// Builds a wheel (or, if `only_metadata`, just its `.dist-info`) directly from the source tree's
/// `src/<package>` or `<package>/` layout, without involving any PEP 517 backend (grounded in
/// `project_builders/standard_builders.py`). Reading the full project table (dependencies, entry
/// points...) is a project-config concern out of scope here; only `name`/`version` are used.
fn standard_build_wheel(source_tree: &Utf8Path, target_dir: &Utf8Path, only_metadata: bool) -> Result<Utf8PathBuf, BuildError> {
    let identity = ProjectIdentity::from_source_tree(source_tree)?;
    let dist_name = identity.distribution_name();
    let package_src = locate_package_dir(source_tree, &dist_name)?;
    let package_root = package_src.parent().expect("package dir has a parent").to_path_buf();

    let dist_info_dir_name = format!("{dist_name}-{}.dist-info", identity.version);

    if only_metadata {
        let dist_info_path = target_dir.join(&dist_info_dir_name);
        fs::create_dir_all(&dist_info_path)?;
        write_dist_info_files(&dist_info_path, &identity)?;
        return Ok(dist_info_path);
    }

    let wheel_name = format!("{dist_name}-{}-py3-none-any.whl", identity.version);
    let wheel_path = target_dir.join(&wheel_name);
    let file = fs::File::create(&wheel_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    for entry in walkdir::WalkDir::new(&package_src) {
        let entry = entry.map_err(|err| BuildError::Io(std::io::Error::other(err.to_string())))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let path = Utf8Path::from_path(entry.path()).expect("walked path is utf8");
        if path.components().any(|c| c.as_str() == "__pycache__") {
            continue;
        }
        let relative = path.strip_prefix(&package_root).unwrap_or(path);
        writer.start_file(relative.as_str(), options)?;
        writer.write_all(&fs::read(path)?)?;
    }

    writer.start_file(format!("{dist_info_dir_name}/METADATA"), options)?;
    write!(writer, "Metadata-Version: 2.1\nName: {}\nVersion: {}\n", identity.name, identity.version)?;
    writer.start_file(format!("{dist_info_dir_name}/WHEEL"), options)?;
    write!(writer, "Wheel-Version: 1.0\nGenerator: pkm\nRoot-Is-Purelib: true\nTag: py3-none-any\n")?;
    // RECORD is finalized at install time by pkm-install, which re-signs every file it actually
    // places on disk; an empty placeholder here just reserves the entry the wheel format expects.
    writer.start_file(format!("{dist_info_dir_name}/RECORD"), options)?;
    writer.finish()?;

    Ok(wheel_path)
}

fn standard_build_sdist(source_tree: &Utf8Path, target_dir: &Utf8Path) -> Result<Utf8PathBuf, BuildError> {
    let identity = ProjectIdentity::from_source_tree(source_tree)?;
    let dist_name = identity.distribution_name();
    let sdist_name = format!("{dist_name}-{}.tar.gz", identity.version);
    let sdist_path = target_dir.join(&sdist_name);

    let file = fs::File::create(&sdist_path)?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut archive = tar::Builder::new(encoder);
    archive.append_dir_all(format!("{dist_name}-{}", identity.version), source_tree.as_std_path())?;
    archive.finish()?;

    Ok(sdist_path)
}

fn locate_package_dir(source_tree: &Utf8Path, dist_name: &str) -> Result<Utf8PathBuf, BuildError> {
    let under_src = source_tree.join("src").join(dist_name);
    if under_src.is_dir() {
        return Ok(under_src);
    }
    let at_root = source_tree.join(dist_name);
    if at_root.is_dir() {
        return Ok(at_root);
    }
    Err(BuildError::InvalidSourceDistribution(
        source_tree.to_path_buf(),
        format!("no `{dist_name}` package directory found under the source tree or its `src/` layout"),
    ))
}

fn write_dist_info_files(dist_info_path: &Utf8Path, identity: &ProjectIdentity) -> Result<(), BuildError> {
    fs::write(
        dist_info_path.join("METADATA"),
        format!("Metadata-Version: 2.1\nName: {}\nVersion: {}\n", identity.name, identity.version),
    )?;
    fs::write(
        dist_info_path.join("WHEEL"),
        "Wheel-Version: 1.0\nGenerator: pkm\nRoot-Is-Purelib: true\nTag: py3-none-any\n",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkm_normalize::PackageName;
    use pkm_version::Version;
    use std::str::FromStr;

    fn descriptor(name: &str) -> PackageDescriptor {
        PackageDescriptor::new(PackageName::new(name).unwrap(), Version::from_str("1.0.0").unwrap())
    }

    #[test]
    fn standard_build_wheel_zips_the_src_layout_package() {
        let work = tempfile::tempdir().unwrap();
        let work = Utf8Path::from_path(work.path()).unwrap();
        let source_tree = work.join("project");
        fs::create_dir_all(source_tree.join("src/demo")).unwrap();
        fs::write(source_tree.join("src/demo/__init__.py"), "VERSION = 1\n").unwrap();
        fs::write(source_tree.join("pyproject.toml"), "[project]\nname = \"demo\"\nversion = \"1.0\"\n").unwrap();

        let target_dir = work.join("dist");
        let wheel_path = standard_build_wheel(&source_tree, &target_dir, false).unwrap();
        assert_eq!(wheel_path.file_name().unwrap(), "demo-1.0-py3-none-any.whl");

        let archive = zip::ZipArchive::new(fs::File::open(&wheel_path).unwrap()).unwrap();
        let names: Vec<_> = archive.file_names().map(ToString::to_string).collect();
        assert!(names.contains(&"demo/__init__.py".to_string()));
        assert!(names.contains(&"demo-1.0.dist-info/METADATA".to_string()));
    }

    #[test]
    fn missing_package_directory_is_an_error() {
        let work = tempfile::tempdir().unwrap();
        let work = Utf8Path::from_path(work.path()).unwrap();
        fs::write(work.join("pyproject.toml"), "[project]\nname = \"demo\"\nversion = \"1.0\"\n").unwrap();
        assert!(standard_build_wheel(work, &work.join("dist"), false).is_err());
    }

    #[test]
    fn cycle_guard_rejects_reentrant_build_of_the_same_descriptor() {
        let _guard = cycle::enter(&descriptor("demo")).unwrap();
        let work = tempfile::tempdir().unwrap();
        let work = Utf8Path::from_path(work.path()).unwrap();
        let interpreter = fake_interpreter();
        let err = build(
            &descriptor("demo"),
            work,
            &work.join("dist"),
            &interpreter,
            RequestedArtifact::Wheel,
            |_, _| Ok(()),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Cycle(_)));
    }

    fn fake_interpreter() -> Interpreter {
        use pkm_interpreter::InterpreterInfo;
        Interpreter {
            path: Utf8PathBuf::from("/usr/bin/python3"),
            info: InterpreterInfo {
                major: 3,
                minor: 11,
                patch: 0,
                implementation: "cpython".to_string(),
                base_prefix: "/usr".to_string(),
                base_exec_prefix: "/usr".to_string(),
                compatible_tags: vec![("cp311".to_string(), "cp311".to_string(), "linux_x86_64".to_string())],
                markers: pkm_interpreter::MarkerEnvironmentFields {
                    os_name: "posix".to_string(),
                    sys_platform: "linux".to_string(),
                    platform_machine: "x86_64".to_string(),
                    platform_python_implementation: "CPython".to_string(),
                    platform_release: String::new(),
                    platform_system: "Linux".to_string(),
                    platform_version: String::new(),
                    python_version: "3.11".to_string(),
                    python_full_version: "3.11.0".to_string(),
                    implementation_name: "cpython".to_string(),
                    implementation_version: "3.11.0".to_string(),
                },
            },
        }
    }
}
