use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pkm_normalize::PackageName;

use crate::error::Error;

/// One row of the installed-package inventory: derived from a `.dist-info/METADATA` file, never
/// persisted independently — the wheel's own install footprint *is* the inventory.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub name: PackageName,
    pub version: String,
    pub dist_info: Utf8PathBuf,
}

fn parse_metadata_field<'a>(metadata: &'a str, field: &str) -> Option<&'a str> {
    metadata.lines().find_map(|line| line.strip_prefix(&format!("{field}: ")))
}

fn read_installed(dist_info: &Utf8Path) -> Result<Option<InstalledPackage>, Error> {
    let metadata_path = dist_info.join("METADATA");
    if !metadata_path.is_file() {
        return Ok(None);
    }
    let metadata = fs::read_to_string(&metadata_path)?;
    let name = parse_metadata_field(&metadata, "Name").ok_or_else(|| Error::MissingMetadataField {
        path: metadata_path.clone(),
        field: "Name",
    })?;
    let version = parse_metadata_field(&metadata, "Version").ok_or_else(|| Error::MissingMetadataField {
        path: metadata_path.clone(),
        field: "Version",
    })?;
    let name = PackageName::new(name).map_err(|_| Error::MissingMetadataField { path: metadata_path, field: "Name" })?;
    Ok(Some(InstalledPackage { name, version: version.to_string(), dist_info: dist_info.to_path_buf() }))
}

/// Scans `purelib` for `*.dist-info` directories and returns the package each one describes.
/// Package names normalize via case-folding and `-`/`_` equivalence; that happens for free here
/// since [`PackageName::new`] does it.
pub fn installed_packages(purelib: &Utf8Path) -> Result<Vec<InstalledPackage>, Error> {
    let mut packages = Vec::new();
    if !purelib.is_dir() {
        return Ok(packages);
    }
    for entry in fs::read_dir(purelib)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(path) = Utf8Path::from_path(&entry.path()) else { continue };
        if path.extension() != Some("dist-info") {
            continue;
        }
        if let Some(package) = read_installed(path)? {
            packages.push(package);
        }
    }
    packages.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(packages)
}

/// Looks up one installed package by (normalized) name.
pub fn installed_package(purelib: &Utf8Path, name: &PackageName) -> Result<Option<InstalledPackage>, Error> {
    Ok(installed_packages(purelib)?.into_iter().find(|pkg| &pkg.name == name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_package_by_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let dist_info = root.join("requests-2.31.0.dist-info");
        fs::create_dir_all(&dist_info).unwrap();
        fs::write(dist_info.join("METADATA"), "Metadata-Version: 2.1\nName: requests\nVersion: 2.31.0\n").unwrap();

        let packages = installed_packages(root).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name.as_str(), "requests");
    }

    #[test]
    fn normalizes_name_for_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let dist_info = root.join("My_Package-1.0.dist-info");
        fs::create_dir_all(&dist_info).unwrap();
        fs::write(dist_info.join("METADATA"), "Metadata-Version: 2.1\nName: My_Package\nVersion: 1.0\n").unwrap();

        let found = installed_package(root, &PackageName::new("my-package").unwrap()).unwrap();
        assert!(found.is_some());
    }
}
