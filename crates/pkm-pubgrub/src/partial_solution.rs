use indexmap::IndexMap;
use pkm_normalize::PackageName;
use pkm_version::{Version, VersionSpecifier};
use rustc_hash::FxHashMap;

use crate::assignment::Assignment;
use crate::incompatibility::{Incompatibility, IncompatibilityId};
use crate::term::{Relation as TermRelation, Term};

/// How an incompatibility's terms compare against the current partial solution: every term
/// holding (a conflict), all but one holding (a fact can be derived), or two-or-more undecided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Satisfaction {
    Full,
    AlmostFull(PackageName),
    Otherwise,
}

/// Where and how a term was satisfied: the assignment's position in the global order log, its
/// decision level, and whether it was a free decision (`cause.is_none()`) or a derivation.
#[derive(Debug, Clone)]
pub(crate) struct Satisfier {
    pub package: PackageName,
    pub order: usize,
    pub decision_level: u32,
    pub cause: Option<IncompatibilityId>,
}

/// The solver's evolving partial solution: the assignment log, indexed by package for satisfier
/// search, plus the bookkeeping needed to drive the decision loop (which packages are required
/// but undecided) and to backtrack (truncate the log to a given decision level).
#[derive(Debug, Default)]
pub struct PartialSolution {
    assignments: Vec<Assignment>,
    by_package: FxHashMap<PackageName, Vec<usize>>,
    required_since: IndexMap<PackageName, u32>,
    decisions: FxHashMap<PackageName, usize>,
    decided_versions: FxHashMap<PackageName, Version>,
    decision_level: u32,
}

impl PartialSolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decision_level(&self) -> u32 {
        self.decision_level
    }

    pub fn is_decided(&self, package: &PackageName) -> bool {
        self.decisions.contains_key(package)
    }

    pub fn decided_version(&self, package: &PackageName) -> Option<&Version> {
        self.decided_versions.get(package)
    }

    /// Packages with at least one derivation but no decision yet, oldest-required first — the
    /// order the decision step's tie-break among equally-constrained packages favors.
    pub fn undecided_required(&self) -> impl Iterator<Item = &PackageName> {
        self.required_since
            .keys()
            .filter(|p| !self.decisions.contains_key(*p))
    }

    /// The intersection of every term recorded so far for `package`; `any()` if none.
    pub fn accumulated_constraint(&self, package: &PackageName) -> VersionSpecifier {
        self.by_package
            .get(package)
            .and_then(|idx| idx.last())
            .map(|&i| self.assignments[i].accumulated_constraint.clone())
            .unwrap_or_else(VersionSpecifier::any)
    }

    fn mark_required(&mut self, package: &PackageName) {
        self.required_since
            .entry(package.clone())
            .or_insert(self.decision_level);
    }

    /// Records a free choice: `package` is decided at `version`, starting a new decision level.
    pub fn add_decision(&mut self, package: PackageName, version: Version) {
        self.decision_level += 1;
        let order = self.assignments.len();
        let constraint = VersionSpecifier::exact(version.clone());
        let term = Term::positive(package.clone(), constraint.clone());
        self.assignments.push(Assignment {
            term,
            decision_level: self.decision_level,
            order,
            cause: None,
            accumulated_constraint: constraint,
        });
        self.by_package.entry(package.clone()).or_default().push(order);
        self.mark_required(&package);
        self.decisions.insert(package.clone(), order);
        self.decided_versions.insert(package, version);
    }

    /// Records a forced fact: `term` must hold because `cause` is otherwise violated.
    pub fn add_derivation(&mut self, term: Term, cause: IncompatibilityId) {
        let package = term.package.clone();
        let previous = self.accumulated_constraint(&package);
        let accumulated = previous.intersect(&term.constraint);
        let order = self.assignments.len();
        self.assignments.push(Assignment {
            term,
            decision_level: self.decision_level,
            order,
            cause: Some(cause),
            accumulated_constraint: accumulated,
        });
        self.by_package.entry(package.clone()).or_default().push(order);
        self.mark_required(&package);
    }

    /// Tries to find an assignment whose accumulated constraint satisfies `term`. An assignment
    /// with an empty accumulated constraint only counts if `term` is optional (see
    /// [`Term::satisfies`]); otherwise the package's history is inconclusive for this term.
    fn try_find_satisfier(&self, term: &Term) -> Option<Satisfier> {
        self.try_find_satisfier_before(term, usize::MAX)
    }

    fn try_find_satisfier_before(&self, term: &Term, before_order: usize) -> Option<Satisfier> {
        let indices = self.by_package.get(&term.package)?;
        for &idx in indices {
            if idx >= before_order {
                break;
            }
            let a = &self.assignments[idx];
            if a.accumulated_constraint.is_none() && !term.optional {
                return None;
            }
            if term.satisfies(&a.accumulated_constraint) {
                return Some(Satisfier {
                    package: term.package.clone(),
                    order: a.order,
                    decision_level: a.decision_level,
                    cause: a.cause,
                });
            }
        }
        None
    }

    /// Classifies `incompat` against the current partial solution: each term is compared to the
    /// *latest* accumulated constraint for its package (not a scan over history). A single
    /// `Contradicted` term means the incompatibility can never become fully satisfied and is
    /// dead — reported as `Otherwise` so the caller skips it rather than re-deriving the same
    /// fact on every future pass. At most one `Inconclusive` term is tolerated (`AlmostFull`);
    /// two or more means the incompatibility is still genuinely undecided.
    pub fn check_satisfaction(&self, incompat: &Incompatibility) -> Satisfaction {
        let mut undecided: Option<PackageName> = None;
        for term in incompat.terms() {
            let accumulated = self.accumulated_constraint(&term.package);
            match term.relation(&accumulated) {
                TermRelation::Satisfied => {}
                TermRelation::Contradicted => return Satisfaction::Otherwise,
                TermRelation::Inconclusive => {
                    if undecided.is_some() {
                        return Satisfaction::Otherwise;
                    }
                    undecided = Some(term.package.clone());
                }
            }
        }
        match undecided {
            None => Satisfaction::Full,
            Some(p) => Satisfaction::AlmostFull(p),
        }
    }

    /// Assuming `incompat` is [`Satisfaction::Full`]: the satisfier (the assignment that made
    /// the incompatibility's conclusion inevitable, i.e. the one with the highest order among
    /// per-term satisfiers) and the previous satisfier level — the lowest decision level at
    /// which the incompatibility is still fully satisfied once the satisfier is set aside.
    pub(crate) fn satisfier_and_previous_level(&self, incompat: &Incompatibility) -> (Satisfier, u32) {
        let satisfiers: Vec<Satisfier> = incompat
            .terms()
            .iter()
            .map(|t| {
                self.try_find_satisfier(t)
                    .expect("incompatibility must be fully satisfied before calling this")
            })
            .collect();
        let satisfier_idx = satisfiers
            .iter()
            .enumerate()
            .max_by_key(|(_, s)| s.order)
            .map(|(i, _)| i)
            .expect("incompatibility has at least one term");
        let satisfier = satisfiers[satisfier_idx].clone();

        let incompat_term = incompat
            .get(&satisfier.package)
            .expect("satisfier's package must appear in the incompatibility");
        let own_contribution = self.assignments[satisfier.order].term.clone();
        let tightened = own_contribution.intersect(&incompat_term.negate());

        let mut candidate_levels: Vec<u32> = satisfiers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != satisfier_idx)
            .map(|(_, s)| s.decision_level)
            .collect();
        for term in incompat.terms() {
            if let Some(&order) = self.decisions.get(&term.package) {
                candidate_levels.push(self.assignments[order].decision_level);
            }
        }
        if let Some(refined) = self.try_find_satisfier_before(&tightened, satisfier.order) {
            candidate_levels.push(refined.decision_level);
        }
        let prev_level = candidate_levels.into_iter().max().unwrap_or(0).max(u32::from(self.decision_level > 0));

        (satisfier, prev_level)
    }

    /// Undoes every assignment made at a decision level above `level`. Incompatibilities
    /// already recorded are untouched — they persist across backtracks.
    pub fn backtrack(&mut self, level: u32) {
        self.decision_level = level;
        while let Some(last) = self.assignments.last() {
            if last.decision_level <= level {
                break;
            }
            let removed = self.assignments.pop().expect("checked by the loop condition");
            if let Some(indices) = self.by_package.get_mut(&removed.term.package) {
                indices.pop();
            }
            if removed.cause.is_none() {
                self.decisions.remove(&removed.term.package);
                self.decided_versions.remove(&removed.term.package);
            }
        }
        self.required_since
            .retain(|p, _| self.by_package.get(p).is_some_and(|v| !v.is_empty()));
    }

    /// The final answer once every required package is decided: `package -> version`.
    pub fn extract_solution(&self) -> FxHashMap<PackageName, Version> {
        self.decided_versions.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str) -> PackageName {
        PackageName::new(name).unwrap()
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn decision_is_immediately_satisfied_by_itself() {
        let mut ps = PartialSolution::new();
        ps.add_decision(pkg("a"), v("1.0"));
        let incompat = Incompatibility::external(
            vec![Term::positive(pkg("a"), VersionSpecifier::exact(v("1.0")))],
            "test",
        );
        assert_eq!(ps.check_satisfaction(&incompat), Satisfaction::Full);
    }

    #[test]
    fn single_undecided_term_is_almost_full() {
        let mut ps = PartialSolution::new();
        ps.add_decision(pkg("a"), v("1.0"));
        let incompat = Incompatibility::external(
            vec![
                Term::positive(pkg("a"), VersionSpecifier::exact(v("1.0"))),
                Term::positive(pkg("b"), VersionSpecifier::any()),
            ],
            "test",
        );
        assert_eq!(ps.check_satisfaction(&incompat), Satisfaction::AlmostFull(pkg("b")));
    }

    #[test]
    fn backtrack_undoes_assignments_above_level() {
        let mut ps = PartialSolution::new();
        ps.add_decision(pkg("a"), v("1.0"));
        let cause = IncompatibilityId(0);
        ps.add_derivation(Term::positive(pkg("b"), VersionSpecifier::any()), cause);
        ps.add_decision(pkg("c"), v("2.0"));
        assert_eq!(ps.decision_level(), 2);
        ps.backtrack(1);
        assert!(ps.is_decided(&pkg("a")));
        assert!(!ps.is_decided(&pkg("c")));
        assert_eq!(ps.decision_level(), 1);
    }

    #[test]
    fn extract_solution_reports_decided_versions() {
        let mut ps = PartialSolution::new();
        ps.add_decision(pkg("a"), v("1.0"));
        let solution = ps.extract_solution();
        assert_eq!(solution.get(&pkg("a")), Some(&v("1.0")));
    }
}
