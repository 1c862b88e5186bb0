use rustc_hash::FxHashMap;

use pkm_normalize::PackageName;
use pkm_pep508::{Dependency, MarkerEnvironment, MarkerVar};
use pkm_pubgrub::DependencyProvider;
use pkm_version::{Version, VersionSpecifier};

use crate::repository::{Repository, RepositoryError};

/// Bridges a [`Repository`] into [`pkm_pubgrub::DependencyProvider`].
///
/// The solver's provider interface is synchronous by design — the solver itself stays synchronous
/// and is driven from a blocking call on the async runtime rather than being made async itself —
/// while repository fetches are naturally async I/O. This type is the
/// blocking-call boundary: each `candidates`/`dependencies` call parks the current thread on the
/// Tokio handle rather than spawning, since the solver calls are themselves already running off
/// the runtime's thread pool from a `spawn_blocking` or `block_in_place` context.
pub struct ResolverProvider<'r> {
    repository: &'r dyn Repository,
    env: MarkerEnvironment,
    extras: FxHashMap<PackageName, Vec<String>>,
}

impl<'r> ResolverProvider<'r> {
    pub fn new(repository: &'r dyn Repository, env: MarkerEnvironment) -> Self {
        Self { repository, env, extras: FxHashMap::default() }
    }

    pub fn with_extras(mut self, package: PackageName, extras: Vec<String>) -> Self {
        self.extras.insert(package, extras);
        self
    }

    fn active_extras(&self, package: &PackageName) -> &[String] {
        self.extras.get(package).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A dependency guarded by `extra == "..."` only activates once the environment is evaluated
    /// with that extra's name bound to `MarkerVar::Extra` (PEP 508's extras semantics); so this
    /// tries the base environment first, then once per requested extra, since more than one extra
    /// can be active for the same package at once.
    fn dependency_applies(&self, dependency: &Dependency, package: &PackageName) -> bool {
        if dependency.applies_to(&self.env) {
            return true;
        }
        self.active_extras(package).iter().any(|extra| {
            let env_with_extra = self.env.clone().with(MarkerVar::Extra, extra.clone());
            dependency.applies_to(&env_with_extra)
        })
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    }
}

impl<'r> DependencyProvider for ResolverProvider<'r> {
    type Err = RepositoryError;

    fn candidates(&mut self, package: &PackageName) -> Result<Vec<Version>, Self::Err> {
        let probe = Dependency::new(package.clone(), VersionSpecifier::any());
        let descriptors = Self::block_on(self.repository.match_dependency(&probe))?;
        Ok(descriptors.into_iter().map(|d| d.version).collect())
    }

    fn dependencies(&mut self, package: &PackageName, version: &Version) -> Result<Vec<(PackageName, VersionSpecifier)>, Self::Err> {
        let descriptor = pkm_distribution::PackageDescriptor::new(package.clone(), version.clone());
        let dependencies = Self::block_on(self.repository.dependencies_of(&descriptor))?;
        Ok(dependencies
            .into_iter()
            .filter(|dep| self.dependency_applies(dep, package))
            .map(|dep| (dep.name, dep.version_spec))
            .collect())
    }
}
