use std::fmt;

use pkm_normalize::PackageName;

use crate::term::Term;

/// Index into the solver's incompatibility arena (`State::incompatibility_store`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct IncompatibilityId(pub(crate) usize);

/// Why an incompatibility holds: a leaf fact handed to us by the repository layer, or the
/// resolution of two earlier incompatibilities during conflict resolution.
#[derive(Debug, Clone)]
pub enum Cause {
    External(String),
    Internal(IncompatibilityId, IncompatibilityId),
}

/// A conjunction of terms that can never all hold simultaneously.
///
/// Normalized: terms are grouped by package (at most one term per package), sorted by package
/// name. Two incompatibilities with the same normalized term tuple are `==` and hash equal,
/// regardless of which derivation produced them — the solver interns on this key so that
/// identical conflicts discovered via different paths collapse to one.
#[derive(Debug, Clone)]
pub struct Incompatibility {
    terms: Vec<Term>,
    pub cause: Cause,
}

impl Incompatibility {
    pub fn new(mut terms: Vec<Term>, cause: Cause) -> Self {
        terms.sort_by(|a, b| a.package.cmp(&b.package));
        let mut normalized: Vec<Term> = Vec::with_capacity(terms.len());
        for term in terms {
            match normalized.last_mut() {
                Some(last) if last.package == term.package => {
                    *last = last.intersect(&term);
                }
                _ => normalized.push(term),
            }
        }
        Self {
            terms: normalized,
            cause,
        }
    }

    pub fn external(terms: Vec<Term>, explanation: impl Into<String>) -> Self {
        Self::new(terms, Cause::External(explanation.into()))
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn get(&self, package: &PackageName) -> Option<&Term> {
        self.terms.iter().find(|t| &t.package == package)
    }

    /// The normalized key used for interning: package names and their constraint/optionality,
    /// in sorted order. Two incompatibilities forbidding the same combination always produce
    /// the same key even if derived through different resolution paths.
    pub fn key(&self) -> Vec<(String, String, bool)> {
        self.terms
            .iter()
            .map(|t| (t.package.to_string(), t.constraint.to_string(), t.optional))
            .collect()
    }

    /// A tautology — `true` under any assignment — signals either the root term (solver
    /// succeeded in deriving the negation of the impossible) or the fully-contradictory empty
    /// conjunction, both terminal states for conflict resolution.
    pub fn is_tautology(&self, root: &PackageName) -> bool {
        self.terms.is_empty() || (self.terms.len() == 1 && &self.terms[0].package == root)
    }
}

impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("version solving failed");
        }
        let rendered: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", rendered.join(" and "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkm_version::{Version, VersionSpecifier};

    fn pkg(name: &str) -> PackageName {
        PackageName::new(name).unwrap()
    }

    #[test]
    fn normalizes_and_merges_duplicate_package_terms() {
        let terms = vec![
            Term::positive(pkg("b"), VersionSpecifier::range(Some(Version::parse("1.0").unwrap()), None, true, false)),
            Term::positive(pkg("a"), VersionSpecifier::any()),
            Term::positive(pkg("b"), VersionSpecifier::range(None, Some(Version::parse("2.0").unwrap()), false, false)),
        ];
        let incompat = Incompatibility::external(terms, "test");
        assert_eq!(incompat.terms().len(), 2);
        assert_eq!(incompat.terms()[0].package, pkg("a"));
        assert_eq!(incompat.terms()[1].package, pkg("b"));
    }

    #[test]
    fn empty_incompatibility_is_tautology() {
        let incompat = Incompatibility::external(vec![], "root");
        assert!(incompat.is_tautology(&pkg("root")));
    }

    #[test]
    fn single_root_term_is_tautology() {
        let incompat = Incompatibility::external(
            vec![Term::positive(pkg("root"), VersionSpecifier::any())],
            "root",
        );
        assert!(incompat.is_tautology(&pkg("root")));
        assert!(!incompat.is_tautology(&pkg("other")));
    }
}
