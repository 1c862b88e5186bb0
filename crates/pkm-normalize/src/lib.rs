//! PEP 503 package-name normalization: case-folds and collapses runs of `-`, `_`, and `.` into
//! a single `-`, so that `Foo_Bar`, `foo-bar`, and `foo.bar` all compare equal.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static SEPARATOR_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_.]+").expect("valid regex"));

#[derive(Debug, Clone, thiserror::Error)]
#[error("`{0}` is not a valid package name")]
pub struct InvalidPackageName(pub String);

/// A package name in its normalized (PEP 503) form.
///
/// Two `PackageName`s constructed from differently-styled spellings of the same name compare
/// equal, hash equal, and display identically; the original spelling is not retained.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PackageName(String);

impl PackageName {
    pub fn new(raw: &str) -> Result<Self, InvalidPackageName> {
        if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) {
            return Err(InvalidPackageName(raw.to_string()));
        }
        let normalized = SEPARATOR_RUN.replace_all(&raw.to_ascii_lowercase(), "-").into_owned();
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackageName {
    type Err = InvalidPackageName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_spellings_normalize_equal() {
        let a = PackageName::new("Foo_Bar").unwrap();
        let b = PackageName::new("foo-bar").unwrap();
        let c = PackageName::new("foo.bar").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(PackageName::new("foo--__..bar").unwrap().as_str(), "foo-bar");
    }

    #[test]
    fn rejects_empty_or_invalid() {
        assert!(PackageName::new("").is_err());
        assert!(PackageName::new("foo bar").is_err());
    }
}
