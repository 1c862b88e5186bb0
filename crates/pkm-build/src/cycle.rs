use std::cell::RefCell;
use std::collections::HashSet;

use pkm_distribution::PackageDescriptor;

use crate::error::BuildError;

thread_local! {
    /// Per-thread rather than a single process-global set, so unrelated concurrent builds on
    /// different threads never see each other's in-flight descriptors.
    static BUILDING: RefCell<HashSet<PackageDescriptor>> = RefCell::new(HashSet::new());
}

/// An RAII guard marking `descriptor` as currently building on this thread. Dropping it (on
/// success, error, or panic unwind) frees the slot, including on cancellation.
#[must_use]
pub struct CycleGuard {
    descriptor: PackageDescriptor,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        BUILDING.with(|set| {
            set.borrow_mut().remove(&self.descriptor);
        });
    }
}

/// Marks `descriptor` as entering a build on the current thread. Fails with
/// [`BuildError::Cycle`] if it's already being built here — e.g. package `a`'s build requirements
/// pull in a source distribution of `a` itself, whether directly or through a longer dependency
/// chain.
pub fn enter(descriptor: &PackageDescriptor) -> Result<CycleGuard, BuildError> {
    let already_building = BUILDING.with(|set| !set.borrow_mut().insert(descriptor.clone()));
    if already_building {
        return Err(BuildError::Cycle(descriptor.clone()));
    }
    Ok(CycleGuard { descriptor: descriptor.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkm_normalize::PackageName;
    use pkm_version::Version;
    use std::str::FromStr;

    fn descriptor(name: &str) -> PackageDescriptor {
        PackageDescriptor::new(PackageName::new(name).unwrap(), Version::from_str("1.0.0").unwrap())
    }

    #[test]
    fn reentry_on_same_thread_is_a_cycle() {
        let _guard = enter(&descriptor("a")).unwrap();
        assert!(enter(&descriptor("a")).is_err());
    }

    #[test]
    fn releasing_the_guard_frees_the_slot() {
        {
            let _guard = enter(&descriptor("a")).unwrap();
        }
        assert!(enter(&descriptor("a")).is_ok());
    }

    #[test]
    fn different_packages_do_not_conflict() {
        let _a = enter(&descriptor("a")).unwrap();
        assert!(enter(&descriptor("b")).is_ok());
    }
}
