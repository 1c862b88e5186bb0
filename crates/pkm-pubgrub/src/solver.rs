use pkm_normalize::PackageName;
use pkm_version::{Version, VersionSpecifier};
use rustc_hash::FxHashMap;

use crate::incompatibility::{Cause, Incompatibility, IncompatibilityId};
use crate::package_version::VersionChain;
use crate::partial_solution::{PartialSolution, Satisfaction};
use crate::report;
use crate::term::Term;

/// Feeds the solver candidate versions and dependency edges for a package. Implementations are
/// responsible for marker filtering, extras resolution, and repository composition (`pkm-resolver`);
/// the solver only ever asks "what versions" and "what does this version depend on".
///
/// A given `(package, constraint)` query must return the same ordered list every time within one
/// solve — implementations should cache the first answer.
pub trait DependencyProvider {
    type Err: std::error::Error + Send + Sync + 'static;

    /// All versions of `package` available from the backing repositories, ordered with the
    /// most-preferred candidate first (e.g. a lock-hinted version, then descending version
    /// order). The solver filters this list by the currently accumulated constraint itself.
    fn candidates(&mut self, package: &PackageName) -> Result<Vec<Version>, Self::Err>;

    /// The dependency edges declared by this exact `(package, version)`, already environment- and
    /// extras-filtered for the resolution target.
    fn dependencies(
        &mut self,
        package: &PackageName,
        version: &Version,
    ) -> Result<Vec<(PackageName, VersionSpecifier)>, Self::Err>;
}

/// Raised when the solver derives a tautological incompatibility: either the empty conjunction
/// or one containing only the root package's term. Carries the explanation tree rendered by
/// [`report`](crate::report::report).
#[derive(Debug, thiserror::Error)]
#[error("no solution satisfies the given requirements:\n\n{explanation}")]
pub struct UnsolvableProblem {
    pub explanation: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SolveError<E> {
    #[error(transparent)]
    Provider(E),
    #[error(transparent)]
    Unsolvable(#[from] UnsolvableProblem),
}

/// Single-threaded, deterministic PubGrub solver.
pub struct Solver<DP: DependencyProvider> {
    provider: DP,
    root: PackageName,
    solution: PartialSolution,
    store: Vec<Incompatibility>,
    by_package: FxHashMap<PackageName, Vec<IncompatibilityId>>,
    chains: FxHashMap<PackageName, VersionChain>,
    merged_dependencies: FxHashMap<(PackageName, PackageName), Vec<IncompatibilityId>>,
    candidate_cache: FxHashMap<PackageName, Vec<Version>>,
}

impl<DP: DependencyProvider> Solver<DP> {
    pub fn new(provider: DP, root: PackageName) -> Self {
        Self {
            provider,
            root,
            solution: PartialSolution::new(),
            store: Vec::new(),
            by_package: FxHashMap::default(),
            chains: FxHashMap::default(),
            merged_dependencies: FxHashMap::default(),
            candidate_cache: FxHashMap::default(),
        }
    }

    /// Runs the main loop to completion: seeds the root requirements, alternates unit
    /// propagation and decision-making, and returns the decision map or an [`UnsolvableProblem`].
    pub fn solve(
        mut self,
        root_requirements: Vec<(PackageName, VersionSpecifier)>,
    ) -> Result<FxHashMap<PackageName, Version>, SolveError<DP::Err>> {
        let mut worklist: Vec<PackageName> = Vec::new();
        for (name, constraint) in root_requirements {
            let incompat = Incompatibility::external(
                vec![Term::new(name.clone(), constraint.inverse(), false)],
                format!("{} is a root requirement", self.root),
            );
            let id = self.intern(incompat);
            self.index(id);
            if !worklist.contains(&name) {
                worklist.push(name);
            }
        }

        loop {
            for package in std::mem::take(&mut worklist) {
                self.unit_propagate(package, &mut worklist)?;
            }
            if !worklist.is_empty() {
                continue;
            }
            match self.decide(&mut worklist).map_err(SolveError::Provider)? {
                true => continue,
                false => break,
            }
        }

        Ok(self.solution.extract_solution())
    }

    fn intern(&mut self, incompat: Incompatibility) -> IncompatibilityId {
        let id = IncompatibilityId(self.store.len());
        self.store.push(incompat);
        id
    }

    fn index(&mut self, id: IncompatibilityId) {
        let packages: Vec<PackageName> = self.store[id.0].terms().iter().map(|t| t.package.clone()).collect();
        for package in packages {
            self.by_package.entry(package).or_default().push(id);
        }
    }

    /// Unit propagation: scans every incompatibility touching `package` (most-recently-added
    /// first), deriving forced facts or triggering conflict resolution on the first conflict
    /// found.
    fn unit_propagate(
        &mut self,
        package: PackageName,
        worklist: &mut Vec<PackageName>,
    ) -> Result<(), SolveError<DP::Err>> {
        let mut queue = vec![package];
        while let Some(current) = queue.pop() {
            let ids = self.by_package.get(&current).cloned().unwrap_or_default();
            let mut conflict: Option<IncompatibilityId> = None;
            for &id in ids.iter().rev() {
                match self.solution.check_satisfaction(&self.store[id.0]) {
                    Satisfaction::Full => {
                        conflict = Some(id);
                        break;
                    }
                    Satisfaction::AlmostFull(almost) => {
                        let term = self.store[id.0]
                            .get(&almost)
                            .expect("AlmostFull names a term present in the incompatibility")
                            .negate();
                        self.solution.add_derivation(term, id);
                        if !queue.contains(&almost) {
                            queue.push(almost);
                        }
                    }
                    Satisfaction::Otherwise => {}
                }
            }
            if let Some(id) = conflict {
                let (almost, cause_id) = self.resolve_conflict(id)?;
                let term = self.store[cause_id.0]
                    .get(&almost)
                    .expect("resolve_conflict's returned package must appear in its own returned incompatibility")
                    .negate();
                self.solution.add_derivation(term, cause_id);
                queue.clear();
                queue.push(almost);
            }
        }
        worklist.clear();
        Ok(())
    }

    /// Walks the derivation chain backward from a fully-satisfied incompatibility, deriving
    /// prior causes until either a tautology surfaces ([`UnsolvableProblem`]) or a decision-level
    /// mismatch is found, at which point it backtracks, registers the learned incompatibility (if
    /// one was actually derived) in the per-package index so future propagation can find it, and
    /// returns the package whose term it leaves almost-full together with the incompatibility to
    /// derive that term's negation from.
    fn resolve_conflict(
        &mut self,
        mut incompat_id: IncompatibilityId,
    ) -> Result<(PackageName, IncompatibilityId), SolveError<DP::Err>> {
        let mut learned_new_incompat = false;
        loop {
            if self.store[incompat_id.0].is_tautology(&self.root) {
                let explanation = report::report(&self.store, incompat_id);
                return Err(SolveError::Unsolvable(UnsolvableProblem { explanation }));
            }

            let (satisfier, prev_level) = self
                .solution
                .satisfier_and_previous_level(&self.store[incompat_id.0]);

            if satisfier.cause.is_none() || satisfier.decision_level > prev_level {
                self.solution.backtrack(prev_level);
                if learned_new_incompat {
                    self.index(incompat_id);
                }
                return Ok((satisfier.package, incompat_id));
            }

            let satisfier_cause_id = satisfier.cause.expect("checked above: satisfier has a cause");
            let learned = self.derive_prior_cause(incompat_id, satisfier_cause_id, &satisfier.package);
            incompat_id = self.intern(learned);
            learned_new_incompat = true;
        }
    }

    /// `incompat ⊕ satisfier.cause`, excluding the satisfier's own package, widened by the
    /// unsatisfied remainder of the satisfier's contribution when it only partially covers the
    /// conflicting term.
    fn derive_prior_cause(
        &self,
        incompat_id: IncompatibilityId,
        satisfier_cause_id: IncompatibilityId,
        satisfier_package: &PackageName,
    ) -> Incompatibility {
        let incompat = &self.store[incompat_id.0];
        let satisfier_cause = &self.store[satisfier_cause_id.0];

        let mut terms: Vec<Term> = incompat
            .terms()
            .iter()
            .filter(|t| &t.package != satisfier_package)
            .cloned()
            .collect();
        terms.extend(
            satisfier_cause
                .terms()
                .iter()
                .filter(|t| &t.package != satisfier_package)
                .cloned(),
        );

        if let (Some(conflict_term), Some(satisfier_term)) =
            (incompat.get(satisfier_package), satisfier_cause.get(satisfier_package))
        {
            if !satisfier_term.satisfies(&conflict_term.constraint) || terms.is_empty() {
                let remainder = satisfier_term.constraint.difference(&conflict_term.constraint);
                terms.push(Term::new(
                    satisfier_package.clone(),
                    remainder.inverse(),
                    satisfier_term.optional && conflict_term.optional,
                ));
            }
        }

        Incompatibility::new(terms, Cause::Internal(incompat_id, satisfier_cause_id))
    }

    /// Minimum-remaining-values decision step: among undecided required
    /// packages, picks the one with the fewest candidates under its current accumulated
    /// constraint, ties broken by insertion order (`undecided_required`'s iteration order).
    /// Returns `Ok(true)` if progress was made (a decision committed, or a "no versions" conflict
    /// was registered for the next propagation pass to handle) and `Ok(false)` once every
    /// required package is decided.
    fn decide(&mut self, worklist: &mut Vec<PackageName>) -> Result<bool, DP::Err> {
        let undecided: Vec<PackageName> = self.solution.undecided_required().cloned().collect();
        if undecided.is_empty() {
            return Ok(false);
        }

        let mut chosen: Option<(PackageName, Vec<Version>)> = None;
        for package in undecided {
            let constraint = self.solution.accumulated_constraint(&package);
            let candidates = self.matching_candidates(&package, &constraint)?;
            let better = chosen
                .as_ref()
                .map(|(_, existing)| candidates.len() < existing.len())
                .unwrap_or(true);
            if better {
                chosen = Some((package, candidates));
            }
        }
        let (package, candidates) = chosen.expect("undecided list was non-empty");

        if candidates.is_empty() {
            let constraint = self.solution.accumulated_constraint(&package);
            let incompat = Incompatibility::external(
                vec![Term::positive(package.clone(), constraint)],
                format!("no versions of {package} match the required constraints"),
            );
            let id = self.intern(incompat);
            self.index(id);
            worklist.push(package);
            return Ok(true);
        }

        self.commit_best_candidate(&package, &candidates)?;
        worklist.push(package);
        Ok(true)
    }

    /// Tries each candidate in priority order, speculatively checking whether deciding it would
    /// immediately satisfy an incompatibility it just registered; if so the decision is rolled
    /// back and the next candidate is tried instead of committing a version known-bad before
    /// propagation even runs. If every candidate conflicts immediately, the first is committed
    /// anyway so propagation produces a proper
    /// conflict-resolution trace rather than looping forever.
    fn commit_best_candidate(&mut self, package: &PackageName, candidates: &[Version]) -> Result<(), DP::Err> {
        let base_level = self.solution.decision_level();
        for candidate in candidates {
            let deps = self.provider.dependencies(package, candidate)?;
            let touched = self.register_dependencies(package, candidate, deps);
            self.solution.add_decision(package.clone(), candidate.clone());
            let conflicts = touched
                .iter()
                .any(|id| matches!(self.solution.check_satisfaction(&self.store[id.0]), Satisfaction::Full));
            if conflicts {
                self.solution.backtrack(base_level);
                continue;
            }
            return Ok(());
        }
        self.solution.add_decision(package.clone(), candidates[0].clone());
        Ok(())
    }

    fn matching_candidates(&mut self, package: &PackageName, constraint: &VersionSpecifier) -> Result<Vec<Version>, DP::Err> {
        if !self.candidate_cache.contains_key(package) {
            let all = self.provider.candidates(package)?;
            self.chains.insert(package.clone(), VersionChain::new(all.clone()));
            self.candidate_cache.insert(package.clone(), all);
        }
        Ok(self.candidate_cache[package]
            .iter()
            .filter(|v| constraint.allows_version(v))
            .cloned()
            .collect())
    }

    /// Registers the dependency incompatibilities for `(package, version)`, merging into an
    /// existing incompatibility over the same `(package, dependency)` pair when one already
    /// carries an identical dependency constraint.
    fn register_dependencies(
        &mut self,
        package: &PackageName,
        version: &Version,
        deps: Vec<(PackageName, VersionSpecifier)>,
    ) -> Vec<IncompatibilityId> {
        let chain = self
            .chains
            .entry(package.clone())
            .or_insert_with(|| VersionChain::new(vec![version.clone()]));
        let index = chain.index_of(version).unwrap_or(0);
        let generalized = chain.generalized_constraint(index);

        deps.into_iter()
            .map(|(dep, dep_constraint)| self.merge_or_create(package, &generalized, &dep, &dep_constraint))
            .collect()
    }

    fn merge_or_create(
        &mut self,
        package: &PackageName,
        generalized: &VersionSpecifier,
        dep: &PackageName,
        dep_constraint: &VersionSpecifier,
    ) -> IncompatibilityId {
        let key = (package.clone(), dep.clone());
        if let Some(ids) = self.merged_dependencies.get(&key) {
            for &existing_id in ids {
                let existing = &self.store[existing_id.0];
                if let (Some(p_term), Some(d_term)) = (existing.get(package), existing.get(dep)) {
                    if &d_term.constraint.inverse() == dep_constraint {
                        let widened = p_term.constraint.union(generalized);
                        let incompat = Incompatibility::external(
                            vec![
                                Term::positive(package.clone(), widened),
                                Term::new(dep.clone(), dep_constraint.inverse(), false),
                            ],
                            format!("{package} depends on {dep} {dep_constraint}"),
                        );
                        let new_id = self.intern(incompat);
                        self.index(new_id);
                        if let Some(list) = self.merged_dependencies.get_mut(&key) {
                            for slot in list.iter_mut() {
                                if *slot == existing_id {
                                    *slot = new_id;
                                }
                            }
                        }
                        return new_id;
                    }
                }
            }
        }

        let incompat = Incompatibility::external(
            vec![
                Term::positive(package.clone(), generalized.clone()),
                Term::new(dep.clone(), dep_constraint.inverse(), false),
            ],
            format!("{package} depends on {dep} {dep_constraint}"),
        );
        let id = self.intern(incompat);
        self.index(id);
        self.merged_dependencies.entry(key).or_default().push(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkm_version::Version;
    use std::collections::HashMap;

    fn pkg(name: &str) -> PackageName {
        PackageName::new(name).unwrap()
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn spec(s: &str) -> VersionSpecifier {
        s.parse().unwrap()
    }

    #[derive(Debug, thiserror::Error)]
    #[error("no such error")]
    struct Never;

    /// An in-memory repository stand-in: `name -> [(version, [(dep_name, dep_spec)])]`, ordered
    /// highest version first, matching the "descending version order" default priority.
    struct FakeRepo(HashMap<PackageName, Vec<(Version, Vec<(PackageName, VersionSpecifier)>)>>);

    impl DependencyProvider for FakeRepo {
        type Err = Never;

        fn candidates(&mut self, package: &PackageName) -> Result<Vec<Version>, Never> {
            Ok(self
                .0
                .get(package)
                .map(|versions| versions.iter().map(|(v, _)| v.clone()).collect())
                .unwrap_or_default())
        }

        fn dependencies(&mut self, package: &PackageName, version: &Version) -> Result<Vec<(PackageName, VersionSpecifier)>, Never> {
            Ok(self
                .0
                .get(package)
                .and_then(|versions| versions.iter().find(|(v, _)| v == version))
                .map(|(_, deps)| deps.clone())
                .unwrap_or_default())
        }
    }

    /// Root depends on `A >=1, B >=1`; `A 1.0` depends on `B <2`; repo has `B 1.0` and
    /// `B 2.0`. Expected `{A: 1.0, B: 1.0}`.
    #[test]
    fn scenario_simple_dependency_narrows_choice() {
        let repo = FakeRepo(HashMap::from([
            (pkg("a"), vec![(v("1.0"), vec![(pkg("b"), spec("<2"))])]),
            (pkg("b"), vec![(v("2.0"), vec![]), (v("1.0"), vec![])]),
        ]));
        let solver = Solver::new(repo, pkg("root"));
        let solution = solver
            .solve(vec![(pkg("a"), spec(">=1")), (pkg("b"), spec(">=1"))])
            .unwrap();
        assert_eq!(solution.get(&pkg("a")), Some(&v("1.0")));
        assert_eq!(solution.get(&pkg("b")), Some(&v("1.0")));
    }

    /// The solver must backtrack off of `A 2.0` once it learns its `B` requirement is
    /// unsatisfiable, settling on `A 1.0`.
    #[test]
    fn scenario_backtracks_off_bad_version() {
        let repo = FakeRepo(HashMap::from([
            (
                pkg("a"),
                vec![
                    (v("2.0"), vec![(pkg("b"), spec("<1"))]),
                    (v("1.0"), vec![(pkg("b"), spec(">=1"))]),
                ],
            ),
            (pkg("b"), vec![(v("1.0"), vec![]), (v("0.9"), vec![])]),
        ]));
        let solver = Solver::new(repo, pkg("root"));
        let solution = solver.solve(vec![(pkg("a"), spec("*"))]).unwrap();
        assert_eq!(solution.get(&pkg("a")), Some(&v("1.0")));
        assert_eq!(solution.get(&pkg("b")), Some(&v("1.0")));
    }

    /// Contradictory root requirements are unsolvable.
    #[test]
    fn scenario_contradictory_root_is_unsolvable() {
        let repo = FakeRepo(HashMap::from([(pkg("a"), vec![(v("1.0"), vec![]), (v("2.0"), vec![])])]));
        let solver = Solver::new(repo, pkg("root"));
        let err = solver.solve(vec![(pkg("a"), spec(">=2")), (pkg("a"), spec("<2"))]).unwrap_err();
        match err {
            SolveError::Unsolvable(problem) => assert!(!problem.explanation.is_empty()),
            SolveError::Provider(_) => panic!("expected an unsolvable problem"),
        }
    }

    /// Every version of `A` depends on an unsatisfiable `B`, so the solver should fail even
    /// though `A` has several candidates.
    #[test]
    fn scenario_no_version_satisfies_shared_dependency() {
        let repo = FakeRepo(HashMap::from([
            (
                pkg("a"),
                vec![
                    (v("3.0"), vec![(pkg("b"), spec("<1"))]),
                    (v("2.0"), vec![(pkg("b"), spec("<1"))]),
                    (v("1.0"), vec![(pkg("b"), spec("<1"))]),
                ],
            ),
            (pkg("b"), vec![(v("1.0"), vec![])]),
        ]));
        let solver = Solver::new(repo, pkg("root"));
        assert!(solver.solve(vec![(pkg("a"), spec("*"))]).is_err());
    }
}
