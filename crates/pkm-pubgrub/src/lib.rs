//! Conflict-driven clause-learning version solver (PubGrub) with human-readable explanations.
//!
//! [`Solver`] drives the main loop over a caller-supplied [`DependencyProvider`]: unit
//! propagation derives forced facts from registered [`Incompatibility`] constraints, and when
//! none remain, a minimum-remaining-values decision picks the next package/version to try. On
//! success it returns `{package -> version}`; on failure, [`UnsolvableProblem`] carries a
//! rendered explanation tree built by [`report::report`].

mod assignment;
mod incompatibility;
mod package_version;
mod partial_solution;
pub mod report;
mod solver;
mod term;

pub use assignment::Assignment;
pub use incompatibility::{Cause, Incompatibility, IncompatibilityId};
pub use package_version::VersionChain;
pub use partial_solution::{PartialSolution, Satisfaction};
pub use solver::{DependencyProvider, SolveError, Solver, UnsolvableProblem};
pub use term::Term;
