use rustc_hash::FxHashMap;

use crate::incompatibility::{Cause, Incompatibility, IncompatibilityId};

/// Renders the derivation chain that led to a root incompatibility as human-readable prose, in
/// the numbered-line style pioneered by Dart's pub: each derived incompatibility is explained
/// once, given a `(n)` reference the first time it is reused, and later steps refer back to it
/// instead of re-explaining it.
pub fn report(store: &[Incompatibility], root: IncompatibilityId) -> String {
    let mut reporter = Reporter {
        store,
        shared_with_ref: FxHashMap::default(),
        ref_count: 0,
        lines: Vec::new(),
    };
    let refcounts = reporter.count_references(root);
    reporter.build(root, &refcounts);
    reporter.lines.join("\n")
}

struct Reporter<'a> {
    store: &'a [Incompatibility],
    shared_with_ref: FxHashMap<usize, usize>,
    ref_count: usize,
    lines: Vec<String>,
}

impl<'a> Reporter<'a> {
    /// How many times each internally-derived incompatibility is reached while walking the
    /// derivation DAG from `root`. An id reached more than once earns a line reference so later
    /// visits can point back to it instead of repeating the explanation.
    fn count_references(&self, root: IncompatibilityId) -> FxHashMap<usize, usize> {
        let mut counts = FxHashMap::default();
        self.count_recursive(root, &mut counts);
        counts
    }

    fn count_recursive(&self, id: IncompatibilityId, counts: &mut FxHashMap<usize, usize>) {
        *counts.entry(id.0).or_insert(0) += 1;
        if let Cause::Internal(a, b) = self.store[id.0].cause {
            if counts.get(&a.0).copied().unwrap_or(0) == 0 {
                self.count_recursive(a, counts);
            } else {
                *counts.entry(a.0).or_insert(0) += 1;
            }
            if counts.get(&b.0).copied().unwrap_or(0) == 0 {
                self.count_recursive(b, counts);
            } else {
                *counts.entry(b.0).or_insert(0) += 1;
            }
        }
    }

    fn is_shared(&self, refcounts: &FxHashMap<usize, usize>, id: IncompatibilityId) -> bool {
        matches!(self.store[id.0].cause, Cause::Internal(..)) && refcounts.get(&id.0).copied().unwrap_or(0) > 1
    }

    fn line_ref_of(&self, id: IncompatibilityId) -> Option<usize> {
        self.shared_with_ref.get(&id.0).copied()
    }

    fn add_line_ref(&mut self) {
        self.ref_count += 1;
        if let Some(line) = self.lines.last_mut() {
            *line = format!("{line} ({})", self.ref_count);
        }
    }

    fn external_text(&self, id: IncompatibilityId) -> &str {
        match &self.store[id.0].cause {
            Cause::External(text) => text.as_str(),
            Cause::Internal(..) => unreachable!("external_text called on an internally-derived incompatibility"),
        }
    }

    fn conclusion(&self, id: IncompatibilityId) -> String {
        format_terms(&self.store[id.0])
    }

    /// Explains `id`, recursing into its causes as needed, and assigns it a line reference if
    /// it is visited more than once in the derivation DAG.
    fn build(&mut self, id: IncompatibilityId, refcounts: &FxHashMap<usize, usize>) {
        self.build_helper(id, refcounts);
        if self.is_shared(refcounts, id) && self.line_ref_of(id).is_none() {
            self.add_line_ref();
            self.shared_with_ref.insert(id.0, self.ref_count);
        }
    }

    fn build_helper(&mut self, id: IncompatibilityId, refcounts: &FxHashMap<usize, usize>) {
        let Cause::Internal(a, b) = self.store[id.0].cause else {
            unreachable!("build_helper called on an externally-caused incompatibility");
        };
        let a_external = matches!(self.store[a.0].cause, Cause::External(_));
        let b_external = matches!(self.store[b.0].cause, Cause::External(_));
        let conclusion = self.conclusion(id);

        match (a_external, b_external) {
            (true, true) => {
                let line = format!("Because {} and {}, {conclusion}.", self.external_text(a), self.external_text(b));
                self.lines.push(line);
            }
            (false, true) | (true, false) => {
                let (derived, external) = if a_external { (b, a) } else { (a, b) };
                self.report_one_each(derived, external, &conclusion, refcounts);
            }
            (false, false) => match (self.line_ref_of(a), self.line_ref_of(b)) {
                (Some(ref_a), Some(ref_b)) => {
                    let line = format!(
                        "Because {} ({ref_a}) and {} ({ref_b}), {conclusion}.",
                        self.conclusion(a),
                        self.conclusion(b)
                    );
                    self.lines.push(line);
                }
                (Some(ref_a), None) => {
                    self.build(b, refcounts);
                    self.lines.push(format!("And because {} ({ref_a}), {conclusion}.", self.conclusion(a)));
                }
                (None, Some(ref_b)) => {
                    self.build(a, refcounts);
                    self.lines.push(format!("And because {} ({ref_b}), {conclusion}.", self.conclusion(b)));
                }
                (None, None) => {
                    self.build(a, refcounts);
                    if self.is_shared(refcounts, a) {
                        self.lines.push(String::new());
                        self.build_helper(id, refcounts);
                    } else {
                        self.add_line_ref();
                        let ref_a = self.ref_count;
                        self.lines.push(String::new());
                        self.build(b, refcounts);
                        self.lines.push(format!("And because {} ({ref_a}), {conclusion}.", self.conclusion(a)));
                    }
                }
            },
        }
    }

    fn report_one_each(
        &mut self,
        derived: IncompatibilityId,
        external: IncompatibilityId,
        conclusion: &str,
        refcounts: &FxHashMap<usize, usize>,
    ) {
        if let Some(ref_id) = self.line_ref_of(derived) {
            let line = format!(
                "Because {} ({ref_id}) and {}, {conclusion}.",
                self.conclusion(derived),
                self.external_text(external)
            );
            self.lines.push(line);
        } else {
            self.build(derived, refcounts);
            let line = format!("And because {}, {conclusion}.", self.external_text(external));
            self.lines.push(line);
        }
    }
}

/// The "Z" clause of a "Because X, Z" explanation line: a sentence describing what the
/// incompatibility's terms together rule out.
fn format_terms(incompat: &Incompatibility) -> String {
    match incompat.terms() {
        [] => "version solving failed".to_string(),
        [only] => format!("{only} is forbidden"),
        terms => {
            let rendered: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
            format!("{} are incompatible", rendered.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;
    use pkm_normalize::PackageName;
    use pkm_version::VersionSpecifier;

    fn pkg(name: &str) -> PackageName {
        PackageName::new(name).unwrap()
    }

    #[test]
    fn combines_two_external_causes_into_one_line() {
        let mut store = Vec::new();
        let a = Incompatibility::external(
            vec![Term::positive(pkg("a"), VersionSpecifier::any())],
            "we are solving dependencies of a 1.0",
        );
        store.push(a);
        let b = Incompatibility::external(
            vec![Term::positive(pkg("b"), VersionSpecifier::any())],
            "a 1.0 depends on b <1.0",
        );
        store.push(b);
        let root = Incompatibility::new(
            vec![Term::positive(pkg("c"), VersionSpecifier::none())],
            Cause::Internal(IncompatibilityId(0), IncompatibilityId(1)),
        );
        store.push(root);
        let text = report(&store, IncompatibilityId(2));
        assert!(text.starts_with("Because"));
        assert!(text.contains("and"));
    }
}
