use std::fmt;

use async_trait::async_trait;

use pkm_distribution::PackageDescriptor;
use pkm_pep508::Dependency;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("no repository handler is registered for URL scheme `{0}`")]
    NoHandlerForUrl(String),
    #[error(transparent)]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// An abstract source of packages: `match_dependency` returns every candidate whose
/// version satisfies the dependency's specifier, and `dependencies_of` lazily fetches a specific
/// candidate's dependency list.
///
/// A trait object boundary rather than a closed enum, so third-party
/// backends (a private index, a custom VCS) can implement this without the composite repository
/// knowing their concrete type, in contrast to the fixed URL-scheme routing table which *is* a
/// closed variant (see [`crate::composite::CompositeRepository`]).
#[async_trait]
pub trait Repository: fmt::Debug + Send + Sync {
    async fn match_dependency(&self, dependency: &Dependency) -> Result<Vec<PackageDescriptor>, RepositoryError>;

    async fn dependencies_of(&self, descriptor: &PackageDescriptor) -> Result<Vec<Dependency>, RepositoryError>;
}
