//! Wheel installation: unpacks a wheel into an environment's standardized layout, writes and
//! verifies `RECORD`, and derives the installed-package inventory from `.dist-info/METADATA`
//! presence.

mod error;
mod inventory;
mod record;
mod unpack;

use camino::Utf8Path;
use pkm_distribution::Environment;
use pkm_normalize::PackageName;
use tempfile::TempDir;

pub use error::Error;
pub use inventory::{installed_package, installed_packages, InstalledPackage};
pub use record::{read_record, write_record, RecordEntry};
pub use unpack::{extract_wheel, install_extracted, uninstall_from_record, verify_record, LinkMode};

/// Installs the wheel at `wheel_path` into `env`, unpacking it through a scratch temp directory.
/// Whether this install was user-requested vs. a transitive dependency only matters to the
/// project config layer that decides what to write back to a manifest, which this crate doesn't
/// own.
pub fn install(wheel_path: &Utf8Path, env: &Environment, link_mode: LinkMode) -> Result<InstalledPackage, Error> {
    let scratch = TempDir::new()?;
    let extracted = Utf8Path::from_path(scratch.path()).expect("tempdir path is utf8");
    let prefix = extract_wheel(wheel_path, extracted)?;
    let dist_info_dir = install_extracted(extracted, &prefix, env, link_mode)?;
    installed_package_at(&dist_info_dir)
}

fn installed_package_at(dist_info_dir: &Utf8Path) -> Result<InstalledPackage, Error> {
    let purelib = dist_info_dir.parent().expect("dist-info dir has a parent");
    let name_part = dist_info_dir
        .file_stem()
        .and_then(|stem| stem.rsplit_once('-'))
        .map(|(name, _version)| name)
        .unwrap_or_default();
    let name = PackageName::new(name_part).map_err(|_| Error::MissingDistInfo(dist_info_dir.to_path_buf()))?;
    installed_package(purelib, &name)?.ok_or_else(|| Error::MissingDistInfo(dist_info_dir.to_path_buf()))
}

/// Uninstalls a package by normalized name: removes its files per `RECORD`, prunes orphaned
/// directories, and removes the `.dist-info` directory itself.
pub fn uninstall(env: &Environment, name: &PackageName) -> Result<(), Error> {
    let Some(package) = installed_package(&env.layout.purelib, name)? else {
        return Ok(());
    };
    uninstall_from_record(&env.layout.purelib, &package.dist_info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_err as fs;
    use pkm_distribution::EnvironmentLayout;
    use pkm_pep508::MarkerEnvironment;

    fn test_env(root: &Utf8Path) -> Environment {
        let layout = EnvironmentLayout::posix(root, "python3.11");
        fs::create_dir_all(&layout.purelib).unwrap();
        Environment {
            interpreter: root.join("bin/python"),
            layout,
            markers: MarkerEnvironment::new(),
            compatible_tags: vec![("py3".to_string(), "none".to_string(), "any".to_string())],
        }
    }

    fn write_fake_wheel(path: &Utf8Path) {
        let file = fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();

        writer.start_file("demo/__init__.py", options).unwrap();
        std::io::Write::write_all(&mut writer, b"VERSION = 1\n").unwrap();

        writer.start_file("demo-1.0.dist-info/METADATA", options).unwrap();
        std::io::Write::write_all(&mut writer, b"Metadata-Version: 2.1\nName: demo\nVersion: 1.0\n").unwrap();

        writer.start_file("demo-1.0.dist-info/WHEEL", options).unwrap();
        std::io::Write::write_all(&mut writer, b"Wheel-Version: 1.0\nGenerator: pkm\nRoot-Is-Purelib: true\nTag: py3-none-any\n").unwrap();

        writer.start_file("demo-1.0.dist-info/RECORD", options).unwrap();
        std::io::Write::write_all(&mut writer, b"").unwrap();

        writer.finish().unwrap();
    }

    #[test]
    fn install_then_uninstall_removes_every_file() {
        let work = tempfile::tempdir().unwrap();
        let work = Utf8Path::from_path(work.path()).unwrap();
        let env_root = work.join("env");
        let env = test_env(&env_root);

        let wheel_path = work.join("demo-1.0-py3-none-any.whl");
        write_fake_wheel(&wheel_path);

        let installed = install(&wheel_path, &env, LinkMode::Copy).unwrap();
        assert_eq!(installed.name.as_str(), "demo");
        assert!(env.layout.purelib.join("demo/__init__.py").is_file());

        uninstall(&env, &installed.name).unwrap();
        assert!(!env.layout.purelib.join("demo/__init__.py").is_file());
        assert!(!env.layout.purelib.join("demo-1.0.dist-info").is_dir());
    }

    #[test]
    fn installed_packages_lists_fresh_install() {
        let work = tempfile::tempdir().unwrap();
        let work = Utf8Path::from_path(work.path()).unwrap();
        let env_root = work.join("env");
        let env = test_env(&env_root);

        let wheel_path = work.join("demo-1.0-py3-none-any.whl");
        write_fake_wheel(&wheel_path);
        install(&wheel_path, &env, LinkMode::Copy).unwrap();

        let packages = installed_packages(&env.layout.purelib).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].version, "1.0");
    }
}
