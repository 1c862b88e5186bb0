use std::fmt;
use std::str::FromStr;

use pkm_normalize::PackageName;
use pkm_version::Version;

#[derive(Debug, Clone, thiserror::Error)]
#[error("`{0}` is not a valid {1} filename: {2}")]
pub struct FilenameError(pub String, pub &'static str, pub String);

/// The compatibility tag triple embedded in a wheel filename: `{python}-{abi}-{platform}`, each
/// of which may itself be a `.`-joined set of compressed tags (e.g. `cp310.cp311-abi3-any`).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct WheelTags {
    pub python: Vec<String>,
    pub abi: Vec<String>,
    pub platform: Vec<String>,
}

impl fmt::Display for WheelTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.python.join("."), self.abi.join("."), self.platform.join("."))
    }
}

/// `{name}-{version}[-{build_tag}]-{python}-{abi}-{platform}.whl`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct WheelFilename {
    pub name: PackageName,
    pub version: Version,
    pub build_tag: Option<String>,
    pub tags: WheelTags,
}

impl fmt::Display for WheelFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", dist_info_name(&self.name), self.version)?;
        if let Some(build_tag) = &self.build_tag {
            write!(f, "-{build_tag}")?;
        }
        write!(f, "-{}.whl", self.tags)
    }
}

impl FromStr for WheelFilename {
    type Err = FilenameError;

    fn from_str(filename: &str) -> Result<Self, Self::Err> {
        let stem = filename
            .strip_suffix(".whl")
            .ok_or_else(|| FilenameError(filename.to_string(), "wheel", "must end with .whl".to_string()))?;
        let parts: Vec<&str> = stem.split('-').collect();
        let (name, version, build_tag, python, abi, platform) = match parts.as_slice() {
            [name, version, python, abi, platform] => (*name, *version, None, *python, *abi, *platform),
            [name, version, build, python, abi, platform] => (*name, *version, Some(*build), *python, *abi, *platform),
            _ => {
                return Err(FilenameError(
                    filename.to_string(),
                    "wheel",
                    "expected 5 or 6 `-`-separated segments".to_string(),
                ))
            }
        };
        Ok(Self {
            name: PackageName::new(name).map_err(|e| FilenameError(filename.to_string(), "wheel", e.to_string()))?,
            version: Version::parse(version).map_err(|e| FilenameError(filename.to_string(), "wheel", e.to_string()))?,
            build_tag: build_tag.map(str::to_string),
            tags: WheelTags {
                python: python.split('.').map(str::to_string).collect(),
                abi: abi.split('.').map(str::to_string).collect(),
                platform: platform.split('.').map(str::to_string).collect(),
            },
        })
    }
}

impl WheelFilename {
    /// Whether any of the wheel's compressed tags appear in the environment's compatible tag
    /// set; used by the repository layer to filter candidate wheels before they ever reach the
    /// solver (an incompatible wheel is simply not a candidate).
    pub fn is_compatible(&self, compatible: &[(String, String, String)]) -> bool {
        self.tags.python.iter().any(|py| {
            self.tags.abi.iter().any(|abi| {
                self.tags
                    .platform
                    .iter()
                    .any(|plat| compatible.iter().any(|(p, a, pl)| p == py && a == abi && pl == plat))
            })
        })
    }
}

/// `{name}-{version}.{tar.gz|zip}`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SourceDistFilename {
    pub name: PackageName,
    pub version: Version,
    pub extension: String,
}

impl fmt::Display for SourceDistFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}.{}", dist_info_name(&self.name), self.version, self.extension)
    }
}

impl FromStr for SourceDistFilename {
    type Err = FilenameError;

    fn from_str(filename: &str) -> Result<Self, Self::Err> {
        const EXTENSIONS: &[&str] = &["tar.gz", "zip", "tar.bz2", "tar.xz"];
        let (stem, extension) = EXTENSIONS
            .iter()
            .find_map(|ext| filename.strip_suffix(&format!(".{ext}")).map(|stem| (stem, *ext)))
            .ok_or_else(|| FilenameError(filename.to_string(), "sdist", "unrecognized archive extension".to_string()))?;
        let (name, version) = stem
            .rsplit_once('-')
            .ok_or_else(|| FilenameError(filename.to_string(), "sdist", "expected `name-version`".to_string()))?;
        Ok(Self {
            name: PackageName::new(name).map_err(|e| FilenameError(filename.to_string(), "sdist", e.to_string()))?,
            version: Version::parse(version).map_err(|e| FilenameError(filename.to_string(), "sdist", e.to_string()))?,
            extension: extension.to_string(),
        })
    }
}

/// PEP 503 dist-info naming replaces runs of non-alphanumerics with `_` (distinct from the `-`
/// folding `PackageName` equality uses, which is why this isn't just `name.to_string()`).
fn dist_info_name(name: &PackageName) -> String {
    name.as_str().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_wheel() {
        let wheel: WheelFilename = "requests-2.31.0-py3-none-any.whl".parse().unwrap();
        assert_eq!(wheel.name.as_str(), "requests");
        assert_eq!(wheel.version, Version::parse("2.31.0").unwrap());
        assert!(wheel.build_tag.is_none());
    }

    #[test]
    fn parses_wheel_with_build_tag_and_compressed_tags() {
        let wheel: WheelFilename = "numpy-1.26.0-1-cp310.cp311-abi3-manylinux_2_17_x86_64.whl".parse().unwrap();
        assert_eq!(wheel.build_tag.as_deref(), Some("1"));
        assert_eq!(wheel.tags.python, vec!["cp310", "cp311"]);
    }

    #[test]
    fn parses_source_dist() {
        let sdist: SourceDistFilename = "requests-2.31.0.tar.gz".parse().unwrap();
        assert_eq!(sdist.name.as_str(), "requests");
        assert_eq!(sdist.extension, "tar.gz");
    }

    #[test]
    fn rejects_missing_extension() {
        assert!("requests-2.31.0".parse::<SourceDistFilename>().is_err());
    }
}
