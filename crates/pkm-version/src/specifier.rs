use std::fmt;
use std::ops::Bound::{self, Excluded, Included, Unbounded};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use smallvec::{smallvec, SmallVec};
use url::Url;

use crate::version::{ParseError, Version};

type Segment = (Bound<Version>, Bound<Version>);

static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?x)^\s*(?P<op>~=|==|!=|<=|>=|<|>|===)\s*(?P<version>[^,\s]+)\s*$")
        .expect("valid specifier clause regex")
});

/// A version constraint: a (possibly empty, possibly unbounded) set of [`Version`]s.
///
/// Internally represented as a canonical, sorted, non-overlapping list of segments, mirroring
/// `pubgrub`'s `Ranges` representation. The four shapes named in the data model
/// (`Any`, `SpecificVersion`, `VersionRange`, `VersionUnion`) are recovered from the segment
/// count and shape rather than stored as distinct enum variants, which keeps every algebraic
/// operation a single pass over the segment lists instead of a combinatorial match.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct VersionSpecifier {
    segments: SmallVec<[Segment; 1]>,
}

impl VersionSpecifier {
    pub fn any() -> Self {
        Self {
            segments: smallvec![(Unbounded, Unbounded)],
        }
    }

    pub fn none() -> Self {
        Self {
            segments: SmallVec::new(),
        }
    }

    pub fn exact(version: Version) -> Self {
        Self {
            segments: smallvec![(Included(version.clone()), Included(version))],
        }
    }

    pub fn range(min: Option<Version>, max: Option<Version>, include_min: bool, include_max: bool) -> Self {
        let low = match min {
            Some(v) if include_min => Included(v),
            Some(v) => Excluded(v),
            None => Unbounded,
        };
        let high = match max {
            Some(v) if include_max => Included(v),
            Some(v) => Excluded(v),
            None => Unbounded,
        };
        if invalid_bounds(&low, &high) {
            return Self::none();
        }
        Self {
            segments: smallvec![(low, high)],
        }
    }

    pub fn is_any(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == (Unbounded, Unbounded)
    }

    pub fn is_none(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the URL when this specifier denotes a single URL-bound specific version.
    pub fn specific_url(&self) -> Option<&Url> {
        if self.segments.len() != 1 {
            return None;
        }
        let (Included(lo), Included(hi)) = (&self.segments[0].0, &self.segments[0].1) else {
            return None;
        };
        if lo != hi {
            return None;
        }
        match lo {
            Version::Url(url) => Some(url),
            _ => None,
        }
    }

    pub fn allows_version(&self, version: &Version) -> bool {
        self.segments.iter().any(|(lo, hi)| contains(lo, hi, version))
    }

    pub fn intersect(&self, other: &Self) -> Self {
        let mut segments = SmallVec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.segments.len() && j < other.segments.len() {
            let (lo1, hi1) = &self.segments[i];
            let (lo2, hi2) = &other.segments[j];
            let lo = max_bound_lo(lo1, lo2);
            let hi = min_bound_hi(hi1, hi2);
            if !invalid_bounds(&lo, &hi) {
                segments.push((lo, hi));
            }
            if cmp_hi(hi1, hi2) == std::cmp::Ordering::Less {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { segments }.canonicalize()
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut segments: SmallVec<[Segment; 1]> =
            self.segments.iter().chain(other.segments.iter()).cloned().collect();
        segments.sort_by(|a, b| cmp_lo(&a.0, &b.0));
        Self { segments }.canonicalize()
    }

    /// The complement of this specifier: every version not allowed by `self`. Computed as the
    /// gaps between consecutive (sorted, disjoint) segments, plus the open gap before the first
    /// and after the last.
    pub fn inverse(&self) -> Self {
        if self.segments.is_empty() {
            return Self::any();
        }
        let mut segments = SmallVec::new();
        let mut cursor: Bound<Version> = Unbounded;
        let mut have_cursor = false;
        for (lo, hi) in &self.segments {
            let gap_lo = cursor.clone();
            let gap_hi = invert_lo_to_hi(lo);
            if have_cursor || !matches!(lo, Unbounded) {
                if !invalid_bounds(&gap_lo, &gap_hi) {
                    segments.push((gap_lo, gap_hi));
                }
            }
            match hi {
                Unbounded => {
                    // Segment runs to +infinity: no trailing gap, and no further segments
                    // can follow in a disjoint sorted list.
                    return Self { segments }.canonicalize();
                }
                bound => {
                    cursor = invert_hi_to_lo(bound);
                    have_cursor = true;
                }
            }
        }
        segments.push((cursor, Unbounded));
        Self { segments }.canonicalize()
    }

    pub fn difference(&self, other: &Self) -> Self {
        self.intersect(&other.inverse())
    }

    pub fn allows_all(&self, other: &Self) -> bool {
        self.intersect(other) == *other
    }

    pub fn allows_any(&self, other: &Self) -> bool {
        !self.intersect(other).is_none()
    }

    /// Merge adjacent/overlapping segments so the shape (and thus equality) is a function of
    /// the set of allowed versions, never of how it was constructed.
    fn canonicalize(mut self) -> Self {
        self.segments.retain(|(lo, hi)| !invalid_bounds(lo, hi));
        self.segments.sort_by(|a, b| cmp_lo(&a.0, &b.0));
        let mut merged: SmallVec<[Segment; 1]> = SmallVec::new();
        for segment in self.segments {
            match merged.last_mut() {
                Some(last) if touches_or_overlaps(&last.1, &segment.0) => {
                    if cmp_hi(&segment.1, &last.1) == std::cmp::Ordering::Greater {
                        last.1 = segment.1;
                    }
                }
                _ => merged.push(segment),
            }
        }
        Self { segments: merged }
    }
}

fn invalid_bounds(lo: &Bound<Version>, hi: &Bound<Version>) -> bool {
    match (lo, hi) {
        (Unbounded, _) | (_, Unbounded) => false,
        (Included(a), Included(b)) => a > b,
        (Included(a), Excluded(b)) | (Excluded(a), Included(b)) | (Excluded(a), Excluded(b)) => a >= b,
    }
}

fn contains(lo: &Bound<Version>, hi: &Bound<Version>, v: &Version) -> bool {
    let above_lo = match lo {
        Unbounded => true,
        Included(b) => v >= b,
        Excluded(b) => v > b,
    };
    let below_hi = match hi {
        Unbounded => true,
        Included(b) => v <= b,
        Excluded(b) => v < b,
    };
    above_lo && below_hi
}

fn cmp_lo(a: &Bound<Version>, b: &Bound<Version>) -> std::cmp::Ordering {
    use std::cmp::Ordering::*;
    match (a, b) {
        (Unbounded, Unbounded) => Equal,
        (Unbounded, _) => Less,
        (_, Unbounded) => Greater,
        (Included(x), Included(y)) => x.cmp(y),
        (Excluded(x), Excluded(y)) => x.cmp(y),
        (Included(x), Excluded(y)) => x.cmp(y).then(Less),
        (Excluded(x), Included(y)) => x.cmp(y).then(Greater),
    }
}

fn cmp_hi(a: &Bound<Version>, b: &Bound<Version>) -> std::cmp::Ordering {
    use std::cmp::Ordering::*;
    match (a, b) {
        (Unbounded, Unbounded) => Equal,
        (Unbounded, _) => Greater,
        (_, Unbounded) => Less,
        (Included(x), Included(y)) => x.cmp(y),
        (Excluded(x), Excluded(y)) => x.cmp(y),
        (Included(x), Excluded(y)) => x.cmp(y).then(Greater),
        (Excluded(x), Included(y)) => x.cmp(y).then(Less),
    }
}

fn max_bound_lo(a: &Bound<Version>, b: &Bound<Version>) -> Bound<Version> {
    if cmp_lo(a, b) == std::cmp::Ordering::Less { b.clone() } else { a.clone() }
}

fn min_bound_hi(a: &Bound<Version>, b: &Bound<Version>) -> Bound<Version> {
    if cmp_hi(a, b) == std::cmp::Ordering::Greater { b.clone() } else { a.clone() }
}

fn touches_or_overlaps(hi: &Bound<Version>, lo: &Bound<Version>) -> bool {
    match (hi, lo) {
        (Unbounded, _) | (_, Unbounded) => true,
        (Included(a), Included(b)) => a >= b,
        (Included(a), Excluded(b)) | (Excluded(a), Included(b)) => a >= b,
        (Excluded(a), Excluded(b)) => a >= b,
    }
}

fn invert_hi_to_lo(hi: &Bound<Version>) -> Bound<Version> {
    match hi {
        Unbounded => Unbounded,
        Included(v) => Excluded(v.clone()),
        Excluded(v) => Included(v.clone()),
    }
}

fn invert_lo_to_hi(lo: &Bound<Version>) -> Bound<Version> {
    match lo {
        Unbounded => Unbounded,
        Included(v) => Excluded(v.clone()),
        Excluded(v) => Included(v.clone()),
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return f.write_str("*");
        }
        if self.is_none() {
            return f.write_str("<none>");
        }
        let parts: Vec<String> = self
            .segments
            .iter()
            .map(|(lo, hi)| match (lo, hi) {
                (Included(a), Included(b)) if a == b => format!("=={a}"),
                (lo, hi) => {
                    let mut s = String::new();
                    match lo {
                        Included(v) => s.push_str(&format!(">={v}")),
                        Excluded(v) => s.push_str(&format!(">{v}")),
                        Unbounded => {}
                    }
                    match hi {
                        Included(v) => {
                            if !s.is_empty() {
                                s.push(',');
                            }
                            s.push_str(&format!("<={v}"));
                        }
                        Excluded(v) => {
                            if !s.is_empty() {
                                s.push(',');
                            }
                            s.push_str(&format!("<{v}"));
                        }
                        Unbounded => {}
                    }
                    s
                }
            })
            .collect();
        write!(f, "{}", parts.join(" || "))
    }
}

impl FromStr for VersionSpecifier {
    type Err = ParseError;

    /// Parses a comma-separated conjunction of clauses, e.g. `>=1.19,<2.0`. A bare `*` means
    /// [`VersionSpecifier::any`]. `~=1.4.2` expands to `>=1.4.2,==1.4.*`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(Self::any());
        }
        let mut spec = Self::any();
        for clause in s.split(',') {
            spec = spec.intersect(&parse_clause(clause.trim(), s)?);
        }
        Ok(spec)
    }
}

fn parse_clause(clause: &str, whole: &str) -> Result<VersionSpecifier, ParseError> {
    let captures = CLAUSE_RE
        .captures(clause)
        .ok_or_else(|| ParseError::new(whole, format!("invalid clause `{clause}`")))?;
    let op = &captures["op"];
    let raw_version = &captures["version"];

    if op == "==" && raw_version.ends_with(".*") {
        let prefix = &raw_version[..raw_version.len() - 2];
        let lo = Version::parse(prefix)?;
        let hi = Version::parse(&format!("{prefix}.99999999")).unwrap_or_else(|_| lo.clone());
        return Ok(VersionSpecifier::range(Some(lo), Some(hi), true, true));
    }
    if op == "!=" && raw_version.ends_with(".*") {
        let prefix = &raw_version[..raw_version.len() - 2];
        let lo = Version::parse(prefix)?;
        let hi = Version::parse(&format!("{prefix}.99999999")).unwrap_or_else(|_| lo.clone());
        return Ok(VersionSpecifier::range(Some(lo), Some(hi), true, true).inverse());
    }

    let version = Version::parse(raw_version)?;
    Ok(match op {
        "==" | "===" => VersionSpecifier::exact(version),
        "!=" => VersionSpecifier::exact(version).inverse(),
        "<" => VersionSpecifier::range(None, Some(version), false, false),
        "<=" => VersionSpecifier::range(None, Some(version), false, true),
        ">" => VersionSpecifier::range(Some(version), None, false, false),
        ">=" => VersionSpecifier::range(Some(version), None, true, false),
        "~=" => {
            let Some(std) = version.as_standard() else {
                return Err(ParseError::new(whole, "~= requires a standard version"));
            };
            let mut prefix: SmallVec<[u64; 4]> = std.release().into();
            prefix.pop();
            let upper = {
                let mut bumped = prefix.clone();
                if let Some(last) = bumped.last_mut() {
                    *last += 1;
                } else {
                    bumped.push(1);
                }
                let upper_str = bumped
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(".");
                Version::parse(&upper_str)?
            };
            VersionSpecifier::range(Some(version), Some(upper), true, false)
        }
        other => return Err(ParseError::new(whole, format!("unknown operator `{other}`"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn intersect_with_inverse_is_empty() {
        let spec = VersionSpecifier::from_str(">=1.0,<2.0").unwrap();
        assert!(spec.intersect(&spec.inverse()).is_none());
    }

    #[test]
    fn union_with_inverse_is_any() {
        let spec = VersionSpecifier::from_str(">=1.0,<2.0").unwrap();
        assert!(spec.union(&spec.inverse()).is_any());
    }

    #[test]
    fn allows_all_iff_intersection_is_rhs() {
        let a = VersionSpecifier::from_str(">=1.0").unwrap();
        let b = VersionSpecifier::from_str(">=1.5,<2.0").unwrap();
        assert!(a.allows_all(&b));
        assert_eq!(a.intersect(&b), b);
    }

    #[test]
    fn allows_version_matches_intersection() {
        let a = VersionSpecifier::from_str(">=1.0").unwrap();
        let b = VersionSpecifier::from_str("<2.0").unwrap();
        for candidate in ["0.5", "1.0", "1.5", "2.0", "2.5"] {
            let version = v(candidate);
            let expected = a.allows_version(&version) && b.allows_version(&version);
            assert_eq!(a.intersect(&b).allows_version(&version), expected);
        }
    }

    #[test]
    fn canonical_form_is_a_function() {
        let a = VersionSpecifier::from_str(">=1.0,<2.0").unwrap();
        let b = VersionSpecifier::range(Some(v("1.0")), Some(v("2.0")), true, false);
        assert_eq!(a, b);
    }

    #[test]
    fn compatible_release_expands_correctly() {
        let spec = VersionSpecifier::from_str("~=1.4.2").unwrap();
        assert!(spec.allows_version(&v("1.4.5")));
        assert!(!spec.allows_version(&v("1.5.0")));
    }

    #[test]
    fn specific_url_round_trips() {
        let url = Url::parse("https://example.com/pkg-1.0.whl").unwrap();
        let spec = VersionSpecifier::exact(Version::url(url.clone()));
        assert_eq!(spec.specific_url(), Some(&url));
    }

    #[test]
    fn union_merges_adjacent_ranges() {
        let a = VersionSpecifier::range(Some(v("1.0")), Some(v("2.0")), true, false);
        let b = VersionSpecifier::range(Some(v("2.0")), Some(v("3.0")), true, false);
        let merged = a.union(&b);
        assert!(merged.allows_version(&v("1.5")));
        assert!(merged.allows_version(&v("2.5")));
    }
}
