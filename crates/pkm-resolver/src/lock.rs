use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use pkm_distribution::PackageDescriptor;
use pkm_normalize::PackageName;
use pkm_pep508::Dependency;
use pkm_version::Version;

use crate::repository::{Repository, RepositoryError};

/// Lets a boxed repository satisfy the `R: Repository` bound so `LockPrioritizingRepository` can
/// wrap a `CompositeRepository` behind a trait object, not just a concrete type.
#[async_trait]
impl Repository for Arc<dyn Repository> {
    async fn match_dependency(&self, dependency: &Dependency) -> Result<Vec<PackageDescriptor>, RepositoryError> {
        self.as_ref().match_dependency(dependency).await
    }

    async fn dependencies_of(&self, descriptor: &PackageDescriptor) -> Result<Vec<Dependency>, RepositoryError> {
        self.as_ref().dependencies_of(descriptor).await
    }
}

/// Wraps another repository and biases candidate order towards a previously-locked version: if
/// the locked version is still among the inner repository's candidates, it is moved to the front
/// so the solver's MRV heuristic tries it first and a re-resolve reproduces an existing lockfile
/// whenever the requirements still allow it.
///
/// Open Question (recorded in `DESIGN.md`): what happens when the locked version has disappeared
/// from the repository (yanked, index rebuilt)? Decided here as a silent fall-through — the
/// unmodified candidate list is returned and the solver picks a fresh version by its normal
/// heuristic, rather than treating a vanished lock entry as a hard failure.
#[derive(Debug)]
pub struct LockPrioritizingRepository<R> {
    inner: R,
    locked: FxHashMap<PackageName, Version>,
}

impl<R> LockPrioritizingRepository<R> {
    pub fn new(inner: R, locked: FxHashMap<PackageName, Version>) -> Self {
        Self { inner, locked }
    }
}

#[async_trait]
impl<R: Repository> Repository for LockPrioritizingRepository<R> {
    async fn match_dependency(&self, dependency: &Dependency) -> Result<Vec<PackageDescriptor>, RepositoryError> {
        let mut candidates = self.inner.match_dependency(dependency).await?;

        if let Some(locked_version) = self.locked.get(&dependency.name) {
            if let Some(pos) = candidates.iter().position(|d| &d.version == locked_version) {
                let hit = candidates.remove(pos);
                candidates.insert(0, hit);
            }
        }

        Ok(candidates)
    }

    async fn dependencies_of(&self, descriptor: &PackageDescriptor) -> Result<Vec<Dependency>, RepositoryError> {
        self.inner.dependencies_of(descriptor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;
    use pkm_normalize::PackageName;
    use pkm_version::VersionSpecifier;
    use std::str::FromStr;

    #[derive(Debug)]
    struct FixedRepo(Vec<PackageDescriptor>);

    #[async_trait]
    impl Repository for FixedRepo {
        async fn match_dependency(&self, _dependency: &Dependency) -> Result<Vec<PackageDescriptor>, RepositoryError> {
            Ok(self.0.clone())
        }
        async fn dependencies_of(&self, _descriptor: &PackageDescriptor) -> Result<Vec<Dependency>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    fn descriptor(name: &str, version: &str) -> PackageDescriptor {
        PackageDescriptor::new(
            PackageName::new(name).unwrap(),
            Version::from_str(version).unwrap(),
        )
    }

    #[tokio::test]
    async fn moves_locked_version_to_front() {
        let inner = FixedRepo(vec![
            descriptor("a", "3.0.0"),
            descriptor("a", "2.0.0"),
            descriptor("a", "1.0.0"),
        ]);
        let mut locked = FxHashMap::default();
        locked.insert(PackageName::new("a").unwrap(), Version::from_str("1.0.0").unwrap());
        let repo = LockPrioritizingRepository::new(inner, locked);

        let dep = Dependency::new(PackageName::new("a").unwrap(), VersionSpecifier::any());
        let candidates = repo.match_dependency(&dep).await.unwrap();
        assert_eq!(candidates[0].version, Version::from_str("1.0.0").unwrap());
    }

    #[tokio::test]
    async fn falls_through_silently_when_locked_version_is_gone() {
        let inner = FixedRepo(vec![descriptor("a", "3.0.0"), descriptor("a", "2.0.0")]);
        let mut locked = FxHashMap::default();
        locked.insert(PackageName::new("a").unwrap(), Version::from_str("9.9.9").unwrap());
        let repo = LockPrioritizingRepository::new(inner, locked);

        let dep = Dependency::new(PackageName::new("a").unwrap(), VersionSpecifier::any());
        let candidates = repo.match_dependency(&dep).await.unwrap();
        assert_eq!(candidates[0].version, Version::from_str("3.0.0").unwrap());
    }
}
