use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use pkm_distribution::PackageDescriptor;
use pkm_normalize::PackageName;
use pkm_pep508::Dependency;

use crate::repository::{Repository, RepositoryError};

/// Buckets a URL scheme into one of the handler keys a [`CompositeRepository`] routes on. `git+`
/// prefixed schemes (`git+https`, `git+ssh`, ...) and the bare `git` scheme all share one handler,
/// mirroring how VCS URLs are written in a PEP 508 direct reference.
fn scheme_bucket(scheme: &str) -> &str {
    if scheme == "git" || scheme.starts_with("git+") {
        "git"
    } else if scheme == "file" {
        "file"
    } else {
        "http"
    }
}

/// Routes a dependency to the right backend in order:
///
/// 1. A dependency carrying a URL goes straight to the handler registered for its scheme.
/// 2. Else, a package name pinned to a specific repository is delegated there exclusively.
/// 3. Else, the search list is tried in order; the first repository to return a non-empty
///    candidate list wins.
///
/// The pin and search-list entries are trait objects (open to third-party backends); the
/// URL-scheme table is a closed bucket of `git` / `file` / `http` keys, since a dependency's URL
/// scheme is the one piece of routing information with no plugin surface.
#[derive(Default)]
pub struct CompositeRepository {
    url_handlers: FxHashMap<&'static str, Arc<dyn Repository>>,
    pinned: FxHashMap<PackageName, Arc<dyn Repository>>,
    search_list: Vec<Arc<dyn Repository>>,
    // Remembers which repository answered for a descriptor, so `dependencies_of` can be routed
    // back to the same backend without re-running the match order.
    source_of: Mutex<FxHashMap<PackageDescriptor, Arc<dyn Repository>>>,
}

impl std::fmt::Debug for CompositeRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeRepository")
            .field("url_handlers", &self.url_handlers.keys().collect::<Vec<_>>())
            .field("pinned", &self.pinned.keys().collect::<Vec<_>>())
            .field("search_list_len", &self.search_list.len())
            .finish()
    }
}

impl CompositeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url_handler(mut self, scheme: &'static str, repo: Arc<dyn Repository>) -> Self {
        self.url_handlers.insert(scheme, repo);
        self
    }

    pub fn with_pin(mut self, package: PackageName, repo: Arc<dyn Repository>) -> Self {
        self.pinned.insert(package, repo);
        self
    }

    pub fn with_search_entry(mut self, repo: Arc<dyn Repository>) -> Self {
        self.search_list.push(repo);
        self
    }

    fn remember(&self, descriptor: &PackageDescriptor, repo: &Arc<dyn Repository>) {
        self.source_of
            .lock()
            .expect("source_of mutex poisoned")
            .insert(descriptor.clone(), Arc::clone(repo));
    }
}

#[async_trait]
impl Repository for CompositeRepository {
    async fn match_dependency(&self, dependency: &Dependency) -> Result<Vec<PackageDescriptor>, RepositoryError> {
        if let Some(url) = &dependency.url {
            let bucket = scheme_bucket(url.scheme());
            let handler = self
                .url_handlers
                .get(bucket)
                .ok_or_else(|| RepositoryError::NoHandlerForUrl(url.scheme().to_string()))?;
            let candidates = handler.match_dependency(dependency).await?;
            for descriptor in &candidates {
                self.remember(descriptor, handler);
            }
            return Ok(candidates);
        }

        if let Some(repo) = self.pinned.get(&dependency.name) {
            let candidates = repo.match_dependency(dependency).await?;
            for descriptor in &candidates {
                self.remember(descriptor, repo);
            }
            return Ok(candidates);
        }

        for repo in &self.search_list {
            let candidates = repo.match_dependency(dependency).await?;
            if !candidates.is_empty() {
                for descriptor in &candidates {
                    self.remember(descriptor, repo);
                }
                return Ok(candidates);
            }
        }

        Ok(Vec::new())
    }

    async fn dependencies_of(&self, descriptor: &PackageDescriptor) -> Result<Vec<Dependency>, RepositoryError> {
        let source = self
            .source_of
            .lock()
            .expect("source_of mutex poisoned")
            .get(descriptor)
            .cloned();

        match source {
            Some(repo) => repo.dependencies_of(descriptor).await,
            // Nothing has matched this descriptor yet this run (e.g. a cold cache hit from a
            // restored lockfile) — fall back to the search list in order.
            None => {
                for repo in &self.search_list {
                    if let Ok(deps) = repo.dependencies_of(descriptor).await {
                        self.remember(descriptor, repo);
                        return Ok(deps);
                    }
                }
                Ok(Vec::new())
            }
        }
    }
}
