use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use smallvec::SmallVec;
use url::Url;

/// Inner pattern for a release segment, reused by the specifier grammar.
pub(crate) const VERSION_RE_INNER: &str = r"
    v?
    (?:(?P<epoch>[0-9]+)!)?
    (?P<release>[0-9]+(?:\.[0-9]+)*)
    (?P<pre>
        [-_.]?
        (?P<pre_kind>a|b|c|rc|alpha|beta|pre|preview)
        [-_.]?
        (?P<pre_n>[0-9]+)?
    )?
    (?P<post>
        (?:-(?P<post_n1>[0-9]+))
        |
        (?:[-_.]?(?:post|rev|r)[-_.]?(?P<post_n2>[0-9]+)?)
    )?
    (?P<dev>[-_.]?dev[-_.]?(?P<dev_n>[0-9]+)?)?
    (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
";

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?xi)^\s*{VERSION_RE_INNER}\s*$")).expect("valid version regex")
});

/// Error returned when parsing a [`Version`], [`VersionSpecifier`], or dependency string fails.
#[derive(Debug, Clone, thiserror::Error)]
#[error("could not parse version `{input}`: {reason}")]
pub struct ParseError {
    pub input: String,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// The `{a|b|rc}` pre-release kind, ordered `A < B < Rc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreKind {
    A,
    B,
    Rc,
}

impl PreKind {
    fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "a" | "alpha" => Self::A,
            "b" | "beta" => Self::B,
            _ => Self::Rc,
        }
    }
}

impl fmt::Display for PreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "a",
            Self::B => "b",
            Self::Rc => "rc",
        })
    }
}

/// A [`Version`] that has the full PEP 440 structure: epoch, release segments, and
/// optional pre/post/dev/local qualifiers.
#[derive(Debug, Clone, Eq, Hash)]
pub struct StandardVersion {
    epoch: u64,
    release: SmallVec<[u64; 4]>,
    pre: Option<(PreKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<String>,
}

/// Sort key ordering absent segments relative to present ones, per the PEP 440 `_cmpkey`
/// algorithm: a `dev`-only version sorts before any pre-release, but the absence of a
/// pre-release (on a version that isn't dev-only) sorts after every pre-release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Bounded<T> {
    NegInf,
    Finite(T),
    PosInf,
}

impl StandardVersion {
    fn cmp_key(
        &self,
    ) -> (
        u64,
        SmallVec<[u64; 4]>,
        Bounded<(PreKind, u64)>,
        Bounded<u64>,
        Bounded<u64>,
        &str,
    ) {
        let mut release = self.release.clone();
        while release.len() > 1 && *release.last().unwrap() == 0 {
            release.pop();
        }
        let pre = match self.pre {
            Some(p) => Bounded::Finite(p),
            None if self.post.is_none() && self.dev.is_some() => Bounded::NegInf,
            None => Bounded::PosInf,
        };
        let post = self.post.map(Bounded::Finite).unwrap_or(Bounded::NegInf);
        // Presence of a dev component sorts *before* its absence.
        let dev = self.dev.map(Bounded::Finite).unwrap_or(Bounded::PosInf);
        let local = self.local.as_deref().unwrap_or("");
        (self.epoch, release, pre, post, dev, local)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some() || (self.dev.is_some() && self.post.is_none())
    }

    pub fn is_local(&self) -> bool {
        self.local.is_some()
    }

    /// This version with the local segment stripped, used when a specifier's operator
    /// is not local-compatible (e.g. `<`, `<=`, `>`, `>=`, `~=`).
    pub fn without_local(&self) -> Self {
        Self {
            local: None,
            ..self.clone()
        }
    }
}

impl PartialEq for StandardVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_key() == other.cmp_key()
    }
}

impl PartialOrd for StandardVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StandardVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_key().cmp(&other.cmp_key())
    }
}

impl fmt::Display for StandardVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        for (i, segment) in self.release.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{segment}")?;
        }
        if let Some((kind, n)) = self.pre {
            write!(f, "{kind}{n}")?;
        }
        if let Some(post) = self.post {
            write!(f, ".post{post}")?;
        }
        if let Some(dev) = self.dev {
            write!(f, ".dev{dev}")?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{local}")?;
        }
        Ok(())
    }
}

impl FromStr for StandardVersion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = VERSION_RE
            .captures(s)
            .ok_or_else(|| ParseError::new(s, "does not match the PEP 440 version grammar"))?;

        let epoch = captures
            .name("epoch")
            .map(|m| m.as_str().parse().unwrap())
            .unwrap_or(0);

        let release = captures
            .name("release")
            .expect("release is required by the grammar")
            .as_str()
            .split('.')
            .map(|segment| segment.parse().unwrap())
            .collect();

        let pre = captures.name("pre_kind").map(|kind| {
            let n = captures
                .name("pre_n")
                .map(|m| m.as_str().parse().unwrap())
                .unwrap_or(0);
            (PreKind::from_str(kind.as_str()), n)
        });

        let post = captures.name("post").map(|_| {
            captures
                .name("post_n1")
                .or_else(|| captures.name("post_n2"))
                .map(|m| m.as_str().parse().unwrap())
                .unwrap_or(0)
        });

        let dev = captures.name("dev").map(|_| {
            captures
                .name("dev_n")
                .map(|m| m.as_str().parse().unwrap())
                .unwrap_or(0)
        });

        let local = captures
            .name("local")
            .map(|m| m.as_str().to_ascii_lowercase().replace('_', "."));

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

/// A totally ordered version value.
///
/// [`Version::Named`] values are only ever equal to an identical tag: they carry no relative
/// ordering. [`Version::Url`] values are opaque identities, equal only to themselves.
#[derive(Debug, Clone, Eq, Hash)]
pub enum Version {
    Standard(StandardVersion),
    Named(String),
    Url(Url),
}

impl Version {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        StandardVersion::from_str(s).map(Version::Standard)
    }

    pub fn named(tag: impl Into<String>) -> Self {
        Self::Named(tag.into())
    }

    pub fn url(url: Url) -> Self {
        Self::Url(url)
    }

    pub fn as_standard(&self) -> Option<&StandardVersion> {
        match self {
            Self::Standard(v) => Some(v),
            _ => None,
        }
    }

    /// Ordinal rank used only to order the three variants relative to each other: standard
    /// versions, being the common case, sort before named tags, which sort before URL pins.
    /// Variants never actually compare across kinds in practice because a dependency's
    /// candidates are drawn from a single source, but a total order is required by `Ord`.
    fn kind_rank(&self) -> u8 {
        match self {
            Self::Standard(_) => 0,
            Self::Named(_) => 1,
            Self::Url(_) => 2,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard(v) => write!(f, "{v}"),
            Self::Named(tag) => write!(f, "{tag}"),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Standard(a), Self::Standard(b)) => a == b,
            (Self::Named(a), Self::Named(b)) => a == b,
            (Self::Url(a), Self::Url(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Standard(a), Self::Standard(b)) => a.cmp(b),
            (Self::Named(a), Self::Named(b)) => a.cmp(b),
            (Self::Url(a), Self::Url(b)) => a.as_str().cmp(b.as_str()),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_release() {
        let v = Version::parse("1.0.0").unwrap();
        assert_eq!(v.to_string(), "1.0.0");
    }

    #[test]
    fn release_equality_ignores_trailing_zero_segments() {
        assert_eq!(Version::parse("1.0").unwrap(), Version::parse("1.0.0").unwrap());
    }

    #[test]
    fn dev_pre_release_post_ordering() {
        let dev = Version::parse("1.0.dev1").unwrap();
        let pre = Version::parse("1.0a1").unwrap();
        let release = Version::parse("1.0").unwrap();
        let post = Version::parse("1.0.post1").unwrap();
        assert!(dev < pre);
        assert!(pre < release);
        assert!(release < post);
    }

    #[test]
    fn pre_kind_ordering() {
        assert!(Version::parse("1.0a1").unwrap() < Version::parse("1.0b1").unwrap());
        assert!(Version::parse("1.0b1").unwrap() < Version::parse("1.0rc1").unwrap());
    }

    #[test]
    fn local_segments_compare_after_release_equality() {
        assert!(Version::parse("1.0+abc").unwrap() < Version::parse("1.0+abd").unwrap());
        assert!(Version::parse("1.0").unwrap() < Version::parse("1.0+abc").unwrap());
    }

    #[test]
    fn epoch_dominates_release() {
        assert!(Version::parse("1!0.1").unwrap() > Version::parse("9.0").unwrap());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Version::parse("not-a-version!!!").is_err());
    }
}
