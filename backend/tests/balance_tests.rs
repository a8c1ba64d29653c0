//! Cash-balance ledger tests

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{total_balance, BalanceEntry, BalanceEntryType};
use shared::validation;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn entry(amount: &str, entry_type: BalanceEntryType) -> BalanceEntry {
    BalanceEntry {
        id: Uuid::new_v4(),
        amount: dec(amount),
        entry_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        remarks: "opening float".to_string(),
        entry_type,
        created_by: Uuid::new_v4(),
        created_at: Utc::now(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn additions_and_subtractions_net_out() {
        let entries = vec![
            entry("5000", BalanceEntryType::Addition),
            entry("1200", BalanceEntryType::Subtraction),
            entry("300", BalanceEntryType::Addition),
            entry("800", BalanceEntryType::Subtraction),
        ];

        assert_eq!(total_balance(&entries), dec("3300"));
    }

    #[test]
    fn empty_ledger_is_zero() {
        assert_eq!(total_balance(&[]), Decimal::ZERO);
    }

    #[test]
    fn balance_may_go_negative() {
        // the ledger records reality; it does not forbid drawing down
        // below zero
        let entries = vec![
            entry("100", BalanceEntryType::Addition),
            entry("250", BalanceEntryType::Subtraction),
        ];
        assert_eq!(total_balance(&entries), dec("-150"));
    }

    #[test]
    fn blank_remarks_are_rejected() {
        assert!(validation::validate_remarks("bought packing rope").is_ok());
        assert!(validation::validate_remarks("").is_err());
        assert!(validation::validate_remarks("   ").is_err());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn entry_strategy() -> impl Strategy<Value = BalanceEntry> {
        (1i64..=1_000_000i64, any::<bool>()).prop_map(|(amount, add)| {
            entry(
                &amount.to_string(),
                if add {
                    BalanceEntryType::Addition
                } else {
                    BalanceEntryType::Subtraction
                },
            )
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The total is order-independent
        #[test]
        fn total_is_order_independent(
            mut entries in proptest::collection::vec(entry_strategy(), 0..20),
        ) {
            let forward = total_balance(&entries);
            entries.reverse();
            prop_assert_eq!(total_balance(&entries), forward);
        }

        /// Appending an addition raises the total by exactly its
        /// amount; a subtraction lowers it
        #[test]
        fn appending_moves_total_by_amount(
            entries in proptest::collection::vec(entry_strategy(), 0..20),
            amount in 1i64..=1_000_000i64,
        ) {
            let base = total_balance(&entries);

            let mut with_add = entries.clone();
            with_add.push(entry(&amount.to_string(), BalanceEntryType::Addition));
            prop_assert_eq!(total_balance(&with_add), base + Decimal::from(amount));

            let mut with_sub = entries;
            with_sub.push(entry(&amount.to_string(), BalanceEntryType::Subtraction));
            prop_assert_eq!(total_balance(&with_sub), base - Decimal::from(amount));
        }
    }
}
