use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

/// Matches `python`, `python3`, `python3.11`, `python-3.11`, and the `.exe`-suffixed Windows
/// forms: files matching `python(-?[0-9.]*)?(\.exe)?` with the executable bit set.
static PYTHON_EXE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^python(-?[0-9.]*)?(\.exe)?$").expect("valid regex"));

/// Whether `name` looks like a python executable by filename alone; callers still need to check
/// the executable bit (and, on Windows, that files ending `.exe` are the only candidates).
pub fn looks_like_python(name: &str) -> bool {
    PYTHON_EXE.is_match(name)
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

/// Scans every directory on `PATH` (in order) for files matching [`looks_like_python`] with the
/// executable bit set. Returns paths in `PATH` order, first-found-per-directory first; duplicate
/// basenames across directories are *not* deduplicated here — [`crate::Interpreter`] discovery
/// queries each path and callers can dedupe on resolved version if they want.
pub fn scan_path() -> Vec<Utf8PathBuf> {
    let Some(path_var) = std::env::var_os("PATH") else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for dir in std::env::split_paths(&path_var) {
        let Some(dir) = Utf8Path::from_path(&dir) else { continue };
        let Ok(entries) = std::fs::read_dir(dir) else { continue };
        let mut names: Vec<_> = entries.filter_map(Result::ok).collect();
        names.sort_by_key(|e| e.file_name());
        for entry in names {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else { continue };
            if !looks_like_python(&name) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else { continue };
            if !metadata.is_file() || !is_executable(&metadata) {
                continue;
            }
            if let Some(path) = Utf8Path::from_path(&entry.path()) {
                found.push(path.to_path_buf());
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_expected_names() {
        for name in ["python", "python3", "python3.11", "python-3.11", "python3.exe", "python.exe"] {
            assert!(looks_like_python(name), "{name} should match");
        }
    }

    #[test]
    fn rejects_unrelated_names() {
        for name in ["python3-config", "ipython", "pythonw", "pip"] {
            assert!(!looks_like_python(name), "{name} should not match");
        }
    }
}
