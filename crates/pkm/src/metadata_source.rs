use std::io::{Cursor, Read};

use async_trait::async_trait;
use pkm_pep508::Dependency;
use pkm_resolver::MetadataSource;
use url::Url;

/// Reads a wheel's dependency list by downloading it and parsing `Requires-Dist` lines out of its
/// `*.dist-info/METADATA`. Sdist candidates need a full PEP 517 build to know their dependencies
/// (the `get_requires_for_build_*`/metadata hooks in `pkm-build`); wiring that into the solver's
/// metadata seam happens in the build orchestrator, not here, so sdist-only packages resolve with
/// no declared dependencies rather than failing the whole resolve.
#[derive(Debug, Default)]
pub struct WheelMetadataSource {
    http: reqwest::Client,
}

impl WheelMetadataSource {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }
}

#[async_trait]
impl MetadataSource for WheelMetadataSource {
    async fn read_dependencies(&self, file_url: &Url) -> Result<Vec<Dependency>, Box<dyn std::error::Error + Send + Sync>> {
        if !file_url.path().ends_with(".whl") {
            return Ok(Vec::new());
        }

        let bytes = self.http.get(file_url.clone()).send().await?.bytes().await?;
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

        let metadata_name = (0..archive.len())
            .map(|i| Ok::<_, zip::result::ZipError>(archive.by_index(i)?.name().to_string()))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .find(|name| name.ends_with(".dist-info/METADATA"))
            .ok_or("wheel has no `.dist-info/METADATA` entry")?;

        let mut contents = String::new();
        archive.by_name(&metadata_name)?.read_to_string(&mut contents)?;

        Ok(contents
            .lines()
            .filter_map(|line| line.strip_prefix("Requires-Dist: "))
            .filter_map(|requirement| requirement.parse::<Dependency>().ok())
            .collect())
    }
}
