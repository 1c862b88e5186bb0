use pkm_version::VersionSpecifier;

use crate::incompatibility::IncompatibilityId;
use crate::term::Term;

/// A term installed into the partial solution.
///
/// `cause` is `None` for a decision (a free choice) and `Some` for a derivation (forced by an
/// incompatibility). `accumulated_constraint` is the intersection of this term's constraint
/// with the previous accumulated constraint recorded for the same package — i.e. "everything
/// we believe about this package's allowed versions as of this point in the log".
#[derive(Debug, Clone)]
pub struct Assignment {
    pub term: Term,
    pub decision_level: u32,
    pub order: usize,
    pub cause: Option<IncompatibilityId>,
    pub accumulated_constraint: VersionSpecifier,
}

impl Assignment {
    pub fn is_decision(&self) -> bool {
        self.cause.is_none()
    }
}
