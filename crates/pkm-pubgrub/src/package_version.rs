use pkm_version::{Version, VersionSpecifier};

/// The sorted, lazily-populated list of known versions for one package.
///
/// Each version is conceptually a `PackageVersion` node linking to its successor; rather than a
/// back-pointer (which would make the chain a reference cycle), the chain is a flat sorted
/// vector and a version's neighbors are found by index.
#[derive(Debug, Default, Clone)]
pub struct VersionChain {
    versions: Vec<Version>,
}

impl VersionChain {
    pub fn new(mut versions: Vec<Version>) -> Self {
        versions.sort();
        versions.dedup();
        Self { versions }
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn index_of(&self, version: &Version) -> Option<usize> {
        self.versions.iter().position(|v| v == version)
    }

    /// The range spanning from the previous known version (exclusive) to the next known version
    /// (exclusive) around `index`. This is the widest range over which the dependency metadata
    /// of the version at `index` can be assumed to generalize without contradicting a known
    /// neighbor; merging two adjacent generalized constraints with identical dependency edges
    /// collapses what would otherwise be one incompatibility per version into one per run.
    pub fn generalized_constraint(&self, index: usize) -> VersionSpecifier {
        let min = if index == 0 {
            None
        } else {
            self.versions.get(index - 1).cloned()
        };
        let max = self.versions.get(index + 1).cloned();
        VersionSpecifier::range(min, max, false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn generalized_constraint_spans_open_neighbors() {
        let chain = VersionChain::new(vec![v("1.0"), v("2.0"), v("3.0")]);
        let mid = chain.generalized_constraint(1);
        assert!(mid.allows_version(&v("2.0")));
        assert!(mid.allows_version(&v("1.5")));
        assert!(!mid.allows_version(&v("1.0")));
        assert!(!mid.allows_version(&v("3.0")));
    }

    #[test]
    fn ends_are_open_ended() {
        let chain = VersionChain::new(vec![v("1.0"), v("2.0")]);
        let first = chain.generalized_constraint(0);
        assert!(first.allows_version(&v("0.1")));
        let last = chain.generalized_constraint(1);
        assert!(last.allows_version(&v("100.0")));
    }
}
