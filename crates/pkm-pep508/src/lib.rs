//! PEP 508 style dependency expressions: a package name, a version specifier, a set of
//! extras, an optional environment marker, and an optional direct URL source.

mod marker;
mod parse;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use pkm_normalize::PackageName;
use pkm_version::VersionSpecifier;
use url::Url;

pub use marker::{CompareOp, MarkerEnvironment, MarkerTree, MarkerVar};

#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to parse marker expression `{input}`: {reason}")]
pub struct Pep508Error {
    pub input: String,
    pub reason: String,
}

impl Pep508Error {
    fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// `(package_name, version_spec, extras, marker_expression?, url?)`.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub name: PackageName,
    pub version_spec: VersionSpecifier,
    pub extras: BTreeSet<String>,
    pub marker: MarkerTree,
    pub url: Option<Url>,
}

impl Dependency {
    pub fn new(name: PackageName, version_spec: VersionSpecifier) -> Self {
        Self {
            name,
            version_spec,
            extras: BTreeSet::new(),
            marker: MarkerTree::True,
            url: None,
        }
    }

    pub fn with_extras(mut self, extras: impl IntoIterator<Item = String>) -> Self {
        self.extras.extend(extras);
        self
    }

    pub fn with_marker(mut self, marker: MarkerTree) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// A dependency carrying a URL bypasses version matching entirely and is routed directly
    /// to URL-handling repositories (see `pkm-resolver`'s `CompositeRepository`).
    pub fn is_url_dependency(&self) -> bool {
        self.url.is_some()
    }

    /// Whether this dependency is active in `env`; inactive dependencies are skipped during
    /// resolution.
    pub fn applies_to(&self, env: &MarkerEnvironment) -> bool {
        self.marker.evaluate(env)
    }

    pub fn parse_marker(expr: &str) -> Result<MarkerTree, Pep508Error> {
        parse::MarkerParser::new(expr).parse()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.iter().cloned().collect::<Vec<_>>().join(","))?;
        }
        if !self.version_spec.is_any() {
            write!(f, "{}", self.version_spec)?;
        }
        if let Some(url) = &self.url {
            write!(f, " @ {url}")?;
        }
        Ok(())
    }
}

impl FromStr for Dependency {
    type Err = Pep508Error;

    /// Parses the common subset of the PEP 508 grammar: `name[extra1,extra2]specifier ; marker`
    /// or `name @ url ; marker`. The project's CLI argument parser handles the rest of the
    /// surrounding grammar (whitespace-insensitivity, requirement files); this only needs to
    /// produce a [`Dependency`] from one already-isolated requirement string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (requirement, marker_expr) = match s.split_once(';') {
            Some((req, marker)) => (req.trim(), Some(marker.trim())),
            None => (s.trim(), None),
        };

        let (name_and_extras, rest) = split_name(requirement);
        let (name_part, extras) = split_extras(name_and_extras)?;
        let name = PackageName::new(name_part.trim())
            .map_err(|e| Pep508Error::new(s, format!("invalid package name: {e}")))?;

        let (version_spec, url) = if let Some(url_part) = rest.trim().strip_prefix('@') {
            let url = Url::parse(url_part.trim())
                .map_err(|e| Pep508Error::new(s, format!("invalid URL: {e}")))?;
            (VersionSpecifier::any(), Some(url))
        } else {
            let spec = if rest.trim().is_empty() {
                VersionSpecifier::any()
            } else {
                VersionSpecifier::from_str(rest.trim())
                    .map_err(|e| Pep508Error::new(s, format!("invalid version specifier: {e}")))?
            };
            (spec, None)
        };

        let marker = match marker_expr {
            Some(expr) if !expr.is_empty() => Dependency::parse_marker(expr)?,
            _ => MarkerTree::True,
        };

        let mut dep = Dependency::new(name, version_spec).with_marker(marker);
        dep.extras = extras;
        dep.url = url;
        Ok(dep)
    }
}

fn split_name(requirement: &str) -> (&str, &str) {
    let bracket_or_spec = requirement
        .find(['[', '=', '<', '>', '!', '~', '@'])
        .unwrap_or(requirement.len());
    requirement.split_at(bracket_or_spec)
}

fn split_extras(name_and_extras: &str) -> Result<(&str, BTreeSet<String>), Pep508Error> {
    if let Some(open) = name_and_extras.find('[') {
        let close = name_and_extras
            .find(']')
            .ok_or_else(|| Pep508Error::new(name_and_extras, "unterminated extras list"))?;
        let extras = name_and_extras[open + 1..close]
            .split(',')
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Ok((&name_and_extras[..open], extras))
    } else {
        Ok((name_and_extras, BTreeSet::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_dependency() {
        let dep = Dependency::from_str("requests>=2.0,<3.0").unwrap();
        assert_eq!(dep.name.as_str(), "requests");
        assert!(!dep.is_url_dependency());
    }

    #[test]
    fn parses_extras() {
        let dep = Dependency::from_str("requests[socks,security]>=2.0").unwrap();
        assert_eq!(dep.extras.len(), 2);
        assert!(dep.extras.contains("socks"));
    }

    #[test]
    fn parses_marker() {
        let dep = Dependency::from_str(r#"requests>=2.0 ; sys_platform == "linux""#).unwrap();
        let env = MarkerEnvironment::new().with(MarkerVar::SysPlatform, "linux");
        assert!(dep.applies_to(&env));
        let env = MarkerEnvironment::new().with(MarkerVar::SysPlatform, "win32");
        assert!(!dep.applies_to(&env));
    }

    #[test]
    fn parses_url_dependency() {
        let dep = Dependency::from_str("requests @ https://example.com/requests-2.0.whl").unwrap();
        assert!(dep.is_url_dependency());
    }

    #[test]
    fn inactive_marker_is_skipped() {
        let dep = Dependency::from_str(r#"pywin32>=1.0 ; sys_platform == "win32""#).unwrap();
        let env = MarkerEnvironment::new().with(MarkerVar::SysPlatform, "linux");
        assert!(!dep.applies_to(&env));
    }
}
