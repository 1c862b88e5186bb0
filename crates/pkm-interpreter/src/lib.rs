//! Interpreter discovery: scans `PATH` for executables that look like a python
//! interpreter, queries each one for its version and marker environment, and picks the highest
//! version satisfying a given `python` dependency constraint.

mod discover;
mod info;
mod query;

use pkm_version::VersionSpecifier;

pub use discover::{looks_like_python, scan_path};
pub use info::{Interpreter, InterpreterInfo, MarkerEnvironmentFields};
pub use query::{query_interpreter, QueryError};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no local interpreter satisfies `{0}`")]
    NoneSatisfying(VersionSpecifier),
}

/// Scans `PATH` and queries every candidate, skipping (and logging) any that fail to run or
/// return unparseable metadata rather than failing discovery outright — a stale alias or a
/// non-CPython shim on `PATH` shouldn't stop the zoo from finding a working interpreter.
pub fn discover_interpreters() -> Vec<Interpreter> {
    scan_path()
        .into_iter()
        .filter_map(|path| match query_interpreter(&path) {
            Ok(info) => Some(Interpreter { path, info }),
            Err(err) => {
                tracing::debug!(%err, "skipping unqueryable interpreter candidate");
                None
            }
        })
        .collect()
}

/// Picks the highest-versioned discovered interpreter whose version satisfies `spec`.
/// Ties (identical version from two `PATH` entries) keep the first one found, i.e. the one
/// earliest on `PATH`.
pub fn find_satisfying(interpreters: &[Interpreter], spec: &VersionSpecifier) -> Option<Interpreter> {
    interpreters
        .iter()
        .filter(|interp| spec.allows_version(&interp.version()))
        .max_by(|a, b| a.version().cmp(&b.version()))
        .cloned()
}

/// Candidate interpreters in descending version order, for the application-env trial-solve loop:
/// the caller tries each in turn until one produces a solvable plan.
pub fn candidates_descending(interpreters: &[Interpreter], spec: &VersionSpecifier) -> Vec<Interpreter> {
    let mut matching: Vec<Interpreter> = interpreters
        .iter()
        .filter(|interp| spec.allows_version(&interp.version()))
        .cloned()
        .collect();
    matching.sort_by(|a, b| b.version().cmp(&a.version()));
    matching
}
