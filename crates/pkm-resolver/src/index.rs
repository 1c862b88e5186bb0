use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use pkm_client::RegistryClient;
use pkm_distribution::{PackageDescriptor, SourceDistFilename, WheelFilename};
use pkm_pep508::Dependency;
use pkm_version::Version;

use crate::repository::{Repository, RepositoryError};

/// Reads the dependency list out of a specific distribution file. A `SimpleIndexRepository` only
/// knows how to turn index pages into candidate versions; producing a wheel's or sdist's actual
/// metadata means either reading `*.dist-info/METADATA` out of a wheel archive, or invoking a
/// PEP 517 build backend for an sdist — both of which live above this crate (`pkm-build`), so this
/// trait is the seam a caller plugs that capability into, keeping the resolver crate from needing
/// a dependency edge back onto the build orchestrator.
#[async_trait]
pub trait MetadataSource: std::fmt::Debug + Send + Sync {
    async fn read_dependencies(&self, file_url: &url::Url) -> Result<Vec<Dependency>, Box<dyn std::error::Error + Send + Sync>>;
}

/// The simple-index HTML backend: lists a package's files via [`RegistryClient`],
/// keeps only the files compatible with this run's tags (filtering wheels whose tags can never be
/// installed before they ever reach the solver), and orders candidates by descending version so a
/// plain `DependencyProvider::candidates` call already prefers the newest release.
#[derive(Debug)]
pub struct SimpleIndexRepository {
    client: RegistryClient,
    compatible_tags: Vec<(String, String, String)>,
    metadata: Arc<dyn MetadataSource>,
}

impl SimpleIndexRepository {
    pub fn new(client: RegistryClient, compatible_tags: Vec<(String, String, String)>, metadata: Arc<dyn MetadataSource>) -> Self {
        Self { client, compatible_tags, metadata }
    }
}

#[async_trait]
impl Repository for SimpleIndexRepository {
    async fn match_dependency(&self, dependency: &Dependency) -> Result<Vec<PackageDescriptor>, RepositoryError> {
        let files = self
            .client
            .package_files(&dependency.name)
            .await
            .map_err(|e| RepositoryError::Backend(Box::new(e)))?;

        let mut versions: Vec<Version> = files
            .iter()
            .filter_map(|file| {
                if let Ok(wheel) = WheelFilename::from_str(&file.filename) {
                    wheel.is_compatible(&self.compatible_tags).then_some(wheel.version)
                } else {
                    SourceDistFilename::from_str(&file.filename).ok().map(|sdist| sdist.version)
                }
            })
            .filter(|version| dependency.version_spec.allows_version(version))
            .collect();

        versions.sort();
        versions.dedup();
        versions.reverse();

        Ok(versions
            .into_iter()
            .map(|version| PackageDescriptor::new(dependency.name.clone(), version))
            .collect())
    }

    async fn dependencies_of(&self, descriptor: &PackageDescriptor) -> Result<Vec<Dependency>, RepositoryError> {
        let files = self
            .client
            .package_files(&descriptor.name)
            .await
            .map_err(|e| RepositoryError::Backend(Box::new(e)))?;

        let file = files
            .iter()
            .find(|file| {
                WheelFilename::from_str(&file.filename)
                    .map(|w| w.version == descriptor.version && w.is_compatible(&self.compatible_tags))
                    .unwrap_or_else(|_| {
                        SourceDistFilename::from_str(&file.filename)
                            .map(|s| s.version == descriptor.version)
                            .unwrap_or(false)
                    })
            })
            .ok_or_else(|| {
                RepositoryError::Backend(format!("no distribution file found for {descriptor}").into())
            })?;

        self.metadata
            .read_dependencies(&file.url)
            .await
            .map_err(RepositoryError::Backend)
    }
}
