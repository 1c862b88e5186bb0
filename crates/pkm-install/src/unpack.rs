use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pkm_distribution::Environment;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::Error;
use crate::record::{write_record, RecordEntry};

/// How a wheel's files are placed into site-packages: hardlinked into place by default, falling
/// back to a copy when hardlinks aren't available, plus an explicit symlink mode for the
/// shared-package store path.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum LinkMode {
    #[default]
    Hardlink,
    Symlink,
    Copy,
}

impl LinkMode {
    fn place(self, from: &Utf8Path, to: &Utf8Path) -> std::io::Result<()> {
        match self {
            Self::Copy => {
                fs::copy(from, to)?;
                Ok(())
            }
            Self::Symlink => place_symlink(from, to),
            Self::Hardlink => match fs::hard_link(from, to) {
                Ok(()) => Ok(()),
                Err(_) => {
                    fs::copy(from, to)?;
                    Ok(())
                }
            },
        }
    }
}

#[cfg(unix)]
fn place_symlink(from: &Utf8Path, to: &Utf8Path) -> std::io::Result<()> {
    fs_err::os::unix::fs::symlink(from, to)
}

#[cfg(not(unix))]
fn place_symlink(from: &Utf8Path, to: &Utf8Path) -> std::io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

/// Extracts a `.whl` zip archive to `dest` (an empty scratch directory), returning the
/// `{name}-{version}.dist-info` prefix found at the archive's top level.
pub fn extract_wheel(wheel_path: &Utf8Path, dest: &Utf8Path) -> Result<String, Error> {
    fs::create_dir_all(dest)?;
    let file = fs::File::open(wheel_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    archive.extract(dest.as_std_path())?;
    find_dist_info_prefix(dest)
}

fn find_dist_info_prefix(extracted: &Utf8Path) -> Result<String, Error> {
    for entry in fs::read_dir(extracted)? {
        let entry = entry?;
        let Some(path) = Utf8Path::from_path(&entry.path()) else { continue };
        if entry.file_type()?.is_dir() && path.extension() == Some("dist-info") {
            let prefix = path.file_stem().expect("dist-info path has a stem").to_string();
            return Ok(prefix);
        }
    }
    Err(Error::MissingDistInfo(extracted.to_path_buf()))
}

/// Moves every subtree of `{prefix}.data/` onto its destination key: `purelib`/`platlib` for
/// package code, `scripts` for executables, `data` for tree-copied data. Known keys map onto the
/// environment layout; unrecognized keys (e.g. `headers`) fall back to `include`.
fn relocate_data_dir(extracted: &Utf8Path, prefix: &str, env: &Environment) -> Result<(), Error> {
    let data_dir = extracted.join(format!("{prefix}.data"));
    if !data_dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(&data_dir)? {
        let entry = entry?;
        let Some(key_path) = Utf8Path::from_path(&entry.path()) else { continue };
        let key = key_path.file_name().unwrap_or_default();
        let dest_root = match key {
            "purelib" => &env.layout.purelib,
            "platlib" => &env.layout.platlib,
            "scripts" => &env.layout.scripts,
            "data" => &env.layout.data,
            _ => &env.layout.include,
        };
        for item in fs::read_dir(key_path)? {
            let item = item?;
            let Some(item_path) = Utf8Path::from_path(&item.path()) else { continue };
            let dest = dest_root.join(item_path.file_name().unwrap_or_default());
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(item_path, &dest)?;
        }
    }
    fs::remove_dir_all(&data_dir)?;
    Ok(())
}

/// Unpacks an already-extracted wheel directory (as produced by [`extract_wheel`]) into `env`'s
/// purelib, relocating the `.data` subtree, writing `RECORD`, and verifying every entry's hash.
/// Returns the `.dist-info` directory path inside the environment.
pub fn install_extracted(extracted: &Utf8Path, dist_info_prefix: &str, env: &Environment, mode: LinkMode) -> Result<Utf8PathBuf, Error> {
    relocate_data_dir(extracted, dist_info_prefix, env)?;

    let mut entries = Vec::new();
    for walked in WalkDir::new(extracted) {
        let walked = walked.map_err(std::io::Error::from)?;
        if walked.file_type().is_dir() {
            continue;
        }
        let Some(abs) = Utf8Path::from_path(walked.path()) else { continue };
        let relative = abs.strip_prefix(extracted).expect("walked paths are under extracted").to_path_buf();
        let dest = env.layout.purelib.join(&relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let _ = fs::remove_file(&dest);

        let is_record = relative.as_str().ends_with(&format!("{dist_info_prefix}.dist-info/RECORD"));
        if is_record {
            // RECORD is rewritten after install (it doesn't yet list itself), so copy rather
            // than link: linking would make the source wheel's stale RECORD alias the final one.
            fs::copy(abs, &dest)?;
        } else {
            mode.place(abs, &dest)?;
        }
        entries.push(RecordEntry::for_file(relative.as_str(), &dest)?);
    }

    let dist_info_dir = env.layout.purelib.join(format!("{dist_info_prefix}.dist-info"));
    let record_path = dist_info_dir.join("RECORD");
    let record_self = RecordEntry { path: format!("{dist_info_prefix}.dist-info/RECORD"), hash: None, size: None };
    let mut final_entries = entries;
    final_entries.push(record_self);
    write_record(&record_path, &final_entries)?;

    verify_record(&env.layout.purelib, &record_path)?;

    debug!(dist_info_prefix, count = final_entries.len(), "installed wheel");
    Ok(dist_info_dir)
}

/// Re-reads `RECORD` and checks every entry's hash against the file now on disk.
pub fn verify_record(purelib: &Utf8Path, record_path: &Utf8Path) -> Result<(), Error> {
    for entry in crate::record::read_record(record_path)? {
        if entry.hash.is_none() {
            continue;
        }
        if !entry.verify(purelib)? {
            return Err(Error::RecordMismatch(entry.path));
        }
    }
    Ok(())
}

/// Removes every file a `RECORD` lists, then prunes directories left empty by that removal,
/// deepest first.
pub fn uninstall_from_record(purelib: &Utf8Path, dist_info_dir: &Utf8Path) -> Result<(), Error> {
    let record_path = dist_info_dir.join("RECORD");
    let entries = crate::record::read_record(&record_path)?;

    let mut visited_dirs = BTreeSet::new();
    for entry in &entries {
        let path = purelib.join(&entry.path);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        if let Some(parent) = path.parent() {
            visited_dirs.insert(parent.to_path_buf());
        }
    }

    for dir in visited_dirs.iter().rev() {
        prune_if_empty(purelib, dir)?;
    }

    if dist_info_dir.is_dir() {
        fs::remove_dir_all(dist_info_dir)?;
    }
    Ok(())
}

fn prune_if_empty(stop_at: &Utf8Path, start: &Utf8Path) -> Result<(), Error> {
    let mut current = start.to_path_buf();
    loop {
        if current == *stop_at || !current.starts_with(stop_at) {
            return Ok(());
        }
        let mut read_dir = match fs::read_dir(&current) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        if read_dir.next().is_some() {
            return Ok(());
        }
        drop(read_dir);
        fs::remove_dir(&current)?;
        let Some(parent) = current.parent() else { return Ok(()) };
        current = parent.to_path_buf();
    }
}
