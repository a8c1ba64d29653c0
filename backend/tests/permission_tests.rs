//! Worker permission model tests
//!
//! Covers the dotted-key wire format, the section/subsection catalogue,
//! and the cascade rule: revoking a section clears its child grants.

use proptest::prelude::*;

use shared::models::{Capability, PermissionSet, Section, Subsection};

const SECTIONS: [Section; 8] = [
    Section::Dashboard,
    Section::Items,
    Section::Vendors,
    Section::Customers,
    Section::Brokers,
    Section::Commissioners,
    Section::Balance,
    Section::Users,
];

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn every_section_key_round_trips() {
        for section in SECTIONS {
            let cap = Capability::section(section);
            assert_eq!(Capability::parse(&cap.key()).unwrap(), cap);
        }
    }

    #[test]
    fn every_child_key_round_trips() {
        for section in SECTIONS {
            for sub in section.subsections() {
                let cap = Capability::child(section, *sub);
                let key = cap.key();
                assert!(key.contains('.'));
                assert_eq!(Capability::parse(&key).unwrap(), cap);
            }
        }
    }

    #[test]
    fn subsection_catalogue_matches_the_app_layout() {
        assert_eq!(Section::Items.subsections(), &[Subsection::Transfers]);
        assert!(Section::Vendors.subsections().contains(&Subsection::Payables));
        assert!(Section::Customers.subsections().contains(&Subsection::Receivables));
        assert!(Section::Brokers.subsections().contains(&Subsection::Payments));
        assert!(Section::Dashboard.subsections().is_empty());
        assert!(Section::Balance.subsections().is_empty());
        assert!(Section::Users.subsections().is_empty());
    }

    #[test]
    fn foreign_subsections_are_rejected() {
        assert!(Capability::parse("vendors.receivables").is_err());
        assert!(Capability::parse("customers.payables").is_err());
        assert!(Capability::parse("items.invoices").is_err());
        assert!(Capability::parse("dashboard.transfers").is_err());
    }

    #[test]
    fn revoking_a_section_clears_its_children_only() {
        let mut set = PermissionSet::new();
        set.grant(Capability::section(Section::Vendors));
        set.grant(Capability::child(Section::Vendors, Subsection::Invoices));
        set.grant(Capability::child(Section::Vendors, Subsection::Payments));
        set.grant(Capability::section(Section::Customers));
        set.grant(Capability::child(Section::Customers, Subsection::Invoices));

        set.revoke(Capability::section(Section::Vendors));

        assert!(!set.allows(Capability::section(Section::Vendors)));
        assert!(!set.allows(Capability::child(Section::Vendors, Subsection::Invoices)));
        assert!(!set.allows(Capability::child(Section::Vendors, Subsection::Payments)));
        assert!(set.allows(Capability::section(Section::Customers)));
        assert!(set.allows(Capability::child(Section::Customers, Subsection::Invoices)));
    }

    #[test]
    fn granting_is_idempotent() {
        let mut set = PermissionSet::new();
        set.grant(Capability::section(Section::Items));
        set.grant(Capability::section(Section::Items));
        assert_eq!(set.keys(), vec!["items".to_string()]);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn capability_strategy() -> impl Strategy<Value = Capability> {
        (0usize..SECTIONS.len()).prop_flat_map(|i| {
            let section = SECTIONS[i];
            let subs = section.subsections();
            if subs.is_empty() {
                Just(Capability::section(section)).boxed()
            } else {
                let subs = subs.to_vec();
                prop_oneof![
                    Just(Capability::section(section)),
                    (0..subs.len()).prop_map(move |j| Capability::child(section, subs[j])),
                ]
                .boxed()
            }
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Storing a set as dotted keys and reloading it is lossless
        #[test]
        fn keys_round_trip(
            caps in proptest::collection::vec(capability_strategy(), 0..20),
        ) {
            let mut set = PermissionSet::new();
            for cap in caps {
                set.grant(cap);
            }
            let rebuilt = PermissionSet::from_keys(set.keys()).unwrap();
            prop_assert_eq!(rebuilt, set);
        }

        /// After revoking a section, no capability under that section
        /// remains
        #[test]
        fn revoke_cascade_is_complete(
            caps in proptest::collection::vec(capability_strategy(), 0..20),
            victim in 0usize..SECTIONS.len(),
        ) {
            let mut set = PermissionSet::new();
            for cap in caps {
                set.grant(cap);
            }
            let victim = SECTIONS[victim];

            set.revoke(Capability::section(victim));

            for cap in set.iter() {
                prop_assert!(cap.section != victim);
            }
        }

        /// Grant then revoke of the same capability restores the set
        /// when the capability is a child
        #[test]
        fn child_grant_revoke_round_trips(
            caps in proptest::collection::vec(capability_strategy(), 0..20),
        ) {
            let mut set = PermissionSet::new();
            for cap in caps {
                set.grant(cap);
            }

            let extra = Capability::child(Section::Vendors, Subsection::Payables);
            if !set.allows(extra) {
                let before = set.clone();
                set.grant(extra);
                set.revoke(extra);
                prop_assert_eq!(set, before);
            }
        }
    }
}
