//! PEP 440 style version parsing, ordering, and specifier algebra.
//!
//! [`Version`] is a totally ordered value (standard release versions, free-form named tags,
//! and opaque URL pins). [`VersionSpecifier`] is the constraint algebra over it: intersection,
//! union, inversion, and difference, always kept in canonical form so that equivalent
//! specifiers compare equal regardless of how they were built.

mod specifier;
mod version;

pub use specifier::VersionSpecifier;
pub use version::{ParseError, PreKind, StandardVersion, Version};

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn release_strategy() -> impl Strategy<Value = Vec<u64>> {
        prop::collection::vec(0u64..5, 1..4)
    }

    fn version_strategy() -> impl Strategy<Value = Version> {
        release_strategy().prop_map(|release| {
            let s = release
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(".");
            Version::parse(&s).unwrap()
        })
    }

    fn specifier_strategy() -> impl Strategy<Value = VersionSpecifier> {
        (version_strategy(), version_strategy()).prop_map(|(a, b)| {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            VersionSpecifier::range(Some(lo), Some(hi), true, false)
        })
    }

    proptest! {
        #[test]
        fn intersect_inverse_is_empty(a in specifier_strategy()) {
            prop_assert!(a.intersect(&a.inverse()).is_none());
        }

        #[test]
        fn union_inverse_is_any(a in specifier_strategy()) {
            prop_assert!(a.union(&a.inverse()).is_any());
        }

        #[test]
        fn allows_all_iff_intersection_equals_rhs(a in specifier_strategy(), b in specifier_strategy()) {
            prop_assert_eq!(a.allows_all(&b), a.intersect(&b) == b);
        }

        #[test]
        fn allows_version_distributes_over_intersect(
            a in specifier_strategy(),
            b in specifier_strategy(),
            v in version_strategy(),
        ) {
            let expected = a.allows_version(&v) && b.allows_version(&v);
            prop_assert_eq!(a.intersect(&b).allows_version(&v), expected);
        }

        #[test]
        fn canonical_form_is_a_function(a in specifier_strategy()) {
            let rebuilt = a.union(&VersionSpecifier::none());
            prop_assert_eq!(a, rebuilt);
        }
    }
}
