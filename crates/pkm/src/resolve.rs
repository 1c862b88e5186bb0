use std::sync::Arc;

use rustc_hash::FxHashMap;
use url::Url;

use pkm_client::RegistryClient;
use pkm_distribution::PackageDescriptor;
use pkm_normalize::PackageName;
use pkm_pep508::{Dependency, MarkerEnvironment};
use pkm_pubgrub::{SolveError, Solver};
use pkm_resolver::{CompositeRepository, ResolverProvider, SimpleIndexRepository};
use pkm_version::Version;

use crate::metadata_source::WheelMetadataSource;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Unsolvable(#[from] pkm_pubgrub::UnsolvableProblem),
    #[error("repository error: {0}")]
    Repository(String),
    #[error(transparent)]
    Cycle(#[from] pkm_resolver::CycleError),
}

/// A completed resolution: the chosen version for every package, and a topological build order
/// over that set, so each non-wheel package builds after its dependencies.
pub struct Resolution {
    pub decisions: FxHashMap<PackageName, Version>,
    pub build_order: Vec<PackageName>,
}

/// Resolves `root_requirements` against the default simple index, then derives a
/// topological build order over the winning package set. One `SimpleIndexRepository` (and its
/// populate-once candidate cache) is built fresh per call, so a given `(package, constraint)`
/// query returns the same ordered list every time within one solve.
pub fn resolve(
    index_url: &Url,
    compatible_tags: Vec<(String, String, String)>,
    markers: MarkerEnvironment,
    root_name: PackageName,
    root_requirements: Vec<Dependency>,
) -> Result<Resolution, ResolveError> {
    let index = SimpleIndexRepository::new(
        RegistryClient::new(index_url.clone()),
        compatible_tags,
        Arc::new(WheelMetadataSource::new()),
    );
    let repository = CompositeRepository::new().with_search_entry(Arc::new(index));

    let root_constraints =
        root_requirements.iter().map(|dep| (dep.name.clone(), dep.version_spec.clone())).collect();

    let mut provider = ResolverProvider::new(&repository, markers);
    for dep in &root_requirements {
        if !dep.extras.is_empty() {
            provider = provider.with_extras(dep.name.clone(), dep.extras.iter().cloned().collect());
        }
    }

    let solver = Solver::new(provider, root_name);
    let decisions = solver.solve(root_constraints).map_err(|err| match err {
        SolveError::Unsolvable(problem) => ResolveError::Unsolvable(problem),
        SolveError::Provider(err) => ResolveError::Repository(err.to_string()),
    })?;

    let build_order = pkm_resolver::topological_build_order(&decisions, |name, version| {
        let descriptor = PackageDescriptor::new(name.clone(), version.clone());
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                use pkm_resolver::Repository;
                repository.dependencies_of(&descriptor).await.unwrap_or_default()
            })
        })
        .into_iter()
        .map(|dep| dep.name)
        .collect()
    })?;

    Ok(Resolution { decisions, build_order })
}
