use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pkm_distribution::{Environment, EnvironmentLayout};
use pkm_interpreter::Interpreter;
use tracing::info;

use crate::error::Error;

/// Writes a minimal `.cfg`-style file: one `key = value` line per entry, matching the format
/// `pyvenv.cfg` uses (and that CPython's own venv creation reads back).
fn write_cfg(path: &Utf8Path, entries: &[(&str, &str)]) -> Result<(), Error> {
    let mut contents = String::new();
    for (key, value) in entries {
        contents.push_str(key);
        contents.push_str(" = ");
        contents.push_str(value);
        contents.push('\n');
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Creates an empty environment directory rooted at `location`, symlinking (unix) or copying
/// (windows, where symlinks need elevated privileges) the base interpreter into its canonical
/// `bin`/`Scripts` position and writing `pyvenv.cfg`.
///
/// If `location` already exists but isn't a prior pkm environment (no `pyvenv.cfg`), refuses
/// with `FileExists` rather than overwriting what might be the caller's unrelated directory.
pub fn create_bare_venv(location: &Utf8Path, base: &Interpreter) -> Result<Environment, Error> {
    if location.exists() {
        if location.join("pyvenv.cfg").is_file() {
            info!(%location, "removing stale environment before recreating it");
            fs::remove_dir_all(location)?;
        } else {
            return Err(Error::FileExists(location.to_path_buf()));
        }
    }
    fs::create_dir_all(location)?;
    let location = location.canonicalize_utf8()?;

    let python_tag = format!("python{}.{}", base.info.major, base.info.minor);
    let layout = if cfg!(windows) {
        EnvironmentLayout::windows(&location)
    } else {
        EnvironmentLayout::posix(&location, &python_tag)
    };

    fs::create_dir_all(&layout.scripts)?;
    fs::create_dir_all(&layout.purelib)?;
    fs::write(location.join(".gitignore"), "*\n")?;

    let venv_python = layout.scripts.join(if cfg!(windows) { "python.exe" } else { "python" });
    link_interpreter(&base.path, &venv_python)?;
    #[cfg(unix)]
    {
        let _ = fs::os::unix::fs::symlink("python", layout.scripts.join(format!("python{}", base.info.major)));
        let _ = fs::os::unix::fs::symlink("python", layout.scripts.join(&python_tag));
    }

    let base_prefix = base.info.base_prefix.clone();
    write_cfg(
        &location.join("pyvenv.cfg"),
        &[
            ("home", base.path.parent().map(Utf8Path::as_str).unwrap_or_default()),
            ("implementation", &base.info.implementation),
            ("version_info", &base.info.python_version()),
            ("include-system-site-packages", "false"),
            ("base-prefix", &base_prefix),
            ("base-exec-prefix", &base.info.base_exec_prefix),
            ("base-executable", base.path.as_str()),
        ],
    )?;

    Ok(Environment {
        interpreter: venv_python,
        layout,
        markers: base.info.marker_environment(),
        compatible_tags: base.info.compatible_tags.clone(),
    })
}

#[cfg(unix)]
fn link_interpreter(base: &Utf8Path, venv_python: &Utf8Path) -> Result<(), Error> {
    fs::os::unix::fs::symlink(base, venv_python)?;
    Ok(())
}

#[cfg(not(unix))]
fn link_interpreter(base: &Utf8Path, venv_python: &Utf8Path) -> Result<(), Error> {
    fs::copy(base, venv_python)?;
    Ok(())
}

/// Whether `root` holds a pkm-materialized environment: the one piece of on-disk state the zoo
/// relies on to distinguish "environment I manage" from "directory reserved for later use".
/// Validity is the presence of an interpreter executable at this canonical path.
pub fn canonical_interpreter_path(root: &Utf8Path) -> Utf8PathBuf {
    if cfg!(windows) {
        root.join("Scripts").join("python.exe")
    } else {
        root.join("bin").join("python")
    }
}
