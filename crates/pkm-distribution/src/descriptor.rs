use std::fmt;

use pkm_normalize::PackageName;
use pkm_version::Version;

/// `(name, version)` — the identity of a resolved package, independent of which repository or
/// archive format produced it.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PackageDescriptor {
    pub name: PackageName,
    pub version: Version,
}

impl PackageDescriptor {
    pub fn new(name: PackageName, version: Version) -> Self {
        Self { name, version }
    }
}

impl fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}
