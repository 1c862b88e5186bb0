use std::fmt;

use pkm_normalize::PackageName;
use pkm_version::VersionSpecifier;

/// `(package_name, constraint, optional)`. The `optional` flag marks a term that came from an
/// optional dependency edge (an extra, or a build requirement that need not be installed):
/// an optional term with an empty constraint is trivially satisfied by anything, since "this
/// extra isn't in play" is itself a valid resolution.
#[derive(Debug, Clone)]
pub struct Term {
    pub package: PackageName,
    pub constraint: VersionSpecifier,
    pub optional: bool,
}

impl Term {
    pub fn new(package: PackageName, constraint: VersionSpecifier, optional: bool) -> Self {
        Self {
            package,
            constraint,
            optional,
        }
    }

    pub fn positive(package: PackageName, constraint: VersionSpecifier) -> Self {
        Self::new(package, constraint, false)
    }

    /// Negates this term: flips optionality and inverts the constraint.
    pub fn negate(&self) -> Self {
        Self {
            package: self.package.clone(),
            constraint: self.constraint.inverse(),
            optional: !self.optional,
        }
    }

    /// Defined only for same-package terms: intersects the two constraints. The result is
    /// optional only when both terms are.
    pub fn intersect(&self, other: &Self) -> Self {
        debug_assert_eq!(self.package, other.package, "intersect is only defined for the same package");
        Self {
            package: self.package.clone(),
            constraint: self.constraint.intersect(&other.constraint),
            optional: self.optional && other.optional,
        }
    }

    /// Whether this term holds given that the package is known to satisfy constraint `c`.
    /// An optional term with an empty constraint is satisfied by any `c` (see struct docs).
    pub fn satisfies(&self, c: &VersionSpecifier) -> bool {
        if self.optional && self.constraint.is_none() {
            return true;
        }
        self.constraint.allows_all(c)
    }

    pub fn is_empty(&self) -> bool {
        self.constraint.is_none()
    }

    /// A term imposing no restriction at all: used as the "no-op" sentinel that conflict
    /// resolution's prior-cause step omits from the derived incompatibility.
    pub fn any(package: PackageName) -> Self {
        Self::new(package, VersionSpecifier::any(), true)
    }

    pub fn is_any(&self) -> bool {
        self.constraint.is_any()
    }

    /// The term that holds whenever `self` or `other` holds; used when combining the
    /// contribution of a package across two parent incompatibilities in conflict resolution.
    pub fn union(&self, other: &Self) -> Self {
        debug_assert_eq!(self.package, other.package, "union is only defined for the same package");
        Self {
            package: self.package.clone(),
            constraint: self.constraint.union(&other.constraint),
            optional: self.optional || other.optional,
        }
    }

    /// Compares this term against the package's current accumulated constraint: `Satisfied` if
    /// every version allowed by `accumulated` also satisfies this term, `Contradicted` if no
    /// version allowed by `accumulated` ever could, `Inconclusive` otherwise (some future
    /// assignment could still go either way).
    pub fn relation(&self, accumulated: &VersionSpecifier) -> Relation {
        if self.satisfies(accumulated) {
            Relation::Satisfied
        } else if self.constraint.intersect(accumulated).is_none() {
            Relation::Contradicted
        } else {
            Relation::Inconclusive
        }
    }
}

/// How a term compares against a package's accumulated constraint (see [`Term::relation`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Satisfied,
    Contradicted,
    Inconclusive,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraint.is_none() {
            write!(f, "no versions of {}", self.package)
        } else if self.constraint.is_any() {
            write!(f, "{}", self.package)
        } else {
            write!(f, "{} {}", self.package, self.constraint)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkm_version::Version;

    fn pkg(name: &str) -> PackageName {
        PackageName::new(name).unwrap()
    }

    #[test]
    fn negate_inverts_constraint_and_optionality() {
        let t = Term::positive(pkg("a"), VersionSpecifier::exact(Version::parse("1.0").unwrap()));
        let negated = t.negate();
        assert!(negated.optional);
        assert!(!negated.constraint.allows_version(&Version::parse("1.0").unwrap()));
        assert!(negated.constraint.allows_version(&Version::parse("2.0").unwrap()));
    }

    #[test]
    fn optional_empty_term_satisfies_anything() {
        let t = Term::new(pkg("a"), VersionSpecifier::none(), true);
        assert!(t.satisfies(&VersionSpecifier::any()));
        assert!(t.satisfies(&VersionSpecifier::none()));
    }

    #[test]
    fn non_optional_empty_term_only_satisfies_empty() {
        let t = Term::new(pkg("a"), VersionSpecifier::none(), false);
        assert!(t.satisfies(&VersionSpecifier::none()));
        assert!(!t.satisfies(&VersionSpecifier::any()));
    }

    #[test]
    fn relation_is_satisfied_when_accumulated_is_a_subset() {
        let t = Term::positive(pkg("a"), VersionSpecifier::range(Some(Version::parse("1.0").unwrap()), None, true, false));
        let accumulated = VersionSpecifier::range(Some(Version::parse("2.0").unwrap()), None, true, false);
        assert_eq!(t.relation(&accumulated), Relation::Satisfied);
    }

    #[test]
    fn relation_is_contradicted_when_disjoint() {
        let t = Term::positive(pkg("a"), VersionSpecifier::range(None, Some(Version::parse("1.0").unwrap()), false, false));
        let accumulated = VersionSpecifier::range(Some(Version::parse("1.0").unwrap()), None, true, false);
        assert_eq!(t.relation(&accumulated), Relation::Contradicted);
    }

    #[test]
    fn relation_is_inconclusive_when_only_partially_overlapping() {
        let t = Term::positive(pkg("a"), VersionSpecifier::range(Some(Version::parse("1.0").unwrap()), None, true, false));
        let accumulated = VersionSpecifier::any();
        assert_eq!(t.relation(&accumulated), Relation::Inconclusive);
    }
}
