use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};
use url::Url;

use pkm_normalize::PackageName;
use pkm_once_map::OnceMap;

use crate::html::{IndexFile, SimpleIndexPage};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to fetch `{0}`")]
    Request(Url, #[source] reqwest::Error),
    #[error("index returned {1} for `{0}`")]
    Status(Url, reqwest::StatusCode),
    #[error(transparent)]
    Html(#[from] crate::html::Error),
    #[error("request to `{0}` exceeded its deadline")]
    Timeout(Url),
}

/// Fetches and caches package candidate pages from a simple-index HTML repository. Candidate
/// lookups are populate-once per package name: concurrent resolver threads asking about the same
/// package share one fetch, and candidate queries return the same ordered list on every call
/// within a run because the first answer is cached and never re-fetched.
pub struct RegistryClient {
    http: reqwest::Client,
    index_url: Url,
    timeout: Duration,
    cache: OnceMap<PackageName, Vec<IndexFile>>,
}

impl RegistryClient {
    pub fn new(index_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            index_url,
            timeout: Duration::from_secs(30),
            cache: OnceMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The files listed for `package` on the index, fetched once and cached for the life of this
    /// client.
    #[instrument(skip(self))]
    pub async fn package_files(&self, package: &PackageName) -> Result<Arc<Vec<IndexFile>>, Error> {
        if let Some(cached) = self.cache.get(package) {
            return Ok(cached);
        }
        if self.cache.register(package.clone()) {
            let files = match self.fetch(package).await {
                Ok(files) => files,
                Err(err) => {
                    // Per-package repository errors are logged and converted into empty
                    // candidate lists, so one bad package doesn't sink the whole resolve.
                    debug!(%package, %err, "repository fetch failed, treating as no candidates");
                    Vec::new()
                }
            };
            self.cache.done(package.clone(), files);
        }
        Ok(self.cache.wait(package).await.expect("this package's job is always eventually `done`"))
    }

    async fn fetch(&self, package: &PackageName) -> Result<Vec<IndexFile>, Error> {
        let page_url = self
            .index_url
            .join(&format!("{package}/"))
            .expect("package names are valid URL path segments");

        let response = tokio::time::timeout(self.timeout, self.http.get(page_url.clone()).send())
            .await
            .map_err(|_| Error::Timeout(page_url.clone()))?
            .map_err(|e| Error::Request(page_url.clone(), e))?;

        if !response.status().is_success() {
            return Err(Error::Status(page_url, response.status()));
        }

        let text = tokio::time::timeout(self.timeout, response.text())
            .await
            .map_err(|_| Error::Timeout(page_url.clone()))?
            .map_err(|e| Error::Request(page_url.clone(), e))?;

        let page = SimpleIndexPage::parse(&text, &page_url)?;
        Ok(page.files)
    }
}
