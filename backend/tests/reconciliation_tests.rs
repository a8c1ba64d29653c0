//! Invoice reconciliation tests
//!
//! Covers the net-delta diffing of invoice line items against stock:
//! create applies the full movement, an unchanged edit applies nothing,
//! a changed edit applies exactly the difference, and delete reverses
//! the whole movement. Also covers the money derivations that feed the
//! invoice totals.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{LineItem, PartyKind};
use shared::money;
use shared::stock::{stock_movements, StockBucket, StockDelta};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn line(
    item_id: Option<Uuid>,
    quantity: &str,
    net: &str,
    gross: &str,
    storage_type: Option<StockBucket>,
) -> LineItem {
    LineItem {
        item_id,
        item_name: "mango crate".to_string(),
        quantity: dec(quantity),
        gross_weight: dec(gross),
        net_weight: dec(net),
        packaging_cost: dec("10"),
        unit_price: dec("85"),
        total_price: dec("0"),
        storage_type,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn vendor_create_moves_stock_in() {
        let item = Uuid::new_v4();
        let new = vec![line(Some(item), "10", "100", "110", None)];

        let movements = stock_movements(PartyKind::Vendor, &[], &new);

        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].item_id, item);
        // no storage type given: vendor purchases default to the shop
        assert_eq!(movements[0].bucket, StockBucket::Shop);
        assert_eq!(movements[0].delta.quantity, dec("10"));
        assert_eq!(movements[0].delta.net_weight, dec("100"));
    }

    #[test]
    fn vendor_storage_type_routes_to_cold() {
        let item = Uuid::new_v4();
        let new = vec![line(Some(item), "10", "100", "110", Some(StockBucket::Cold))];

        let movements = stock_movements(PartyKind::Vendor, &[], &new);

        assert_eq!(movements[0].bucket, StockBucket::Cold);
    }

    #[test]
    fn customer_create_moves_shop_stock_out() {
        let item = Uuid::new_v4();
        let new = vec![line(Some(item), "4", "40", "44", None)];

        let movements = stock_movements(PartyKind::Customer, &[], &new);

        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].bucket, StockBucket::Shop);
        assert_eq!(movements[0].delta.quantity, dec("-4"));
    }

    #[test]
    fn broker_and_commissioner_move_nothing() {
        let item = Uuid::new_v4();
        let new = vec![line(Some(item), "4", "40", "44", None)];

        assert!(stock_movements(PartyKind::Broker, &[], &new).is_empty());
        assert!(stock_movements(PartyKind::Commissioner, &[], &new).is_empty());
    }

    #[test]
    fn free_text_lines_never_move_stock() {
        let new = vec![line(None, "4", "40", "44", None)];
        assert!(stock_movements(PartyKind::Vendor, &[], &new).is_empty());
    }

    #[test]
    fn unchanged_edit_moves_nothing() {
        let item = Uuid::new_v4();
        let lines = vec![
            line(Some(item), "10", "100", "110", None),
            line(Some(Uuid::new_v4()), "3", "30", "33", Some(StockBucket::Cold)),
        ];

        let movements = stock_movements(PartyKind::Vendor, &lines, &lines.clone());
        assert!(movements.is_empty());
    }

    #[test]
    fn edit_applies_only_the_difference() {
        let item = Uuid::new_v4();
        let original = vec![line(Some(item), "10", "100", "110", None)];
        let new = vec![line(Some(item), "12", "95", "110", None)];

        let movements = stock_movements(PartyKind::Vendor, &original, &new);

        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].delta.quantity, dec("2"));
        assert_eq!(movements[0].delta.net_weight, dec("-5"));
        assert_eq!(movements[0].delta.gross_weight, dec("0"));
    }

    #[test]
    fn moving_a_line_between_buckets_reverses_and_reapplies() {
        let item = Uuid::new_v4();
        let original = vec![line(Some(item), "10", "100", "110", Some(StockBucket::Shop))];
        let new = vec![line(Some(item), "10", "100", "110", Some(StockBucket::Cold))];

        let mut movements = stock_movements(PartyKind::Vendor, &original, &new);
        movements.sort_by_key(|m| m.bucket);

        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].bucket, StockBucket::Shop);
        assert_eq!(movements[0].delta.quantity, dec("-10"));
        assert_eq!(movements[1].bucket, StockBucket::Cold);
        assert_eq!(movements[1].delta.quantity, dec("10"));
    }

    #[test]
    fn delete_reverses_the_full_movement() {
        let item = Uuid::new_v4();
        let original = vec![line(Some(item), "10", "100", "110", None)];

        let movements = stock_movements(PartyKind::Customer, &original, &[]);

        // the sale removed stock; deleting the invoice puts it back
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].delta.quantity, dec("10"));
    }

    #[test]
    fn split_lines_for_one_item_are_netted() {
        let item = Uuid::new_v4();
        let original = vec![line(Some(item), "10", "100", "110", None)];
        let new = vec![
            line(Some(item), "6", "60", "66", None),
            line(Some(item), "4", "40", "44", None),
        ];

        let movements = stock_movements(PartyKind::Vendor, &original, &new);
        assert!(movements.is_empty());
    }

    #[test]
    fn line_total_combines_packaging_and_weight_pricing() {
        // 10 crates x 10 packaging + 100 kg x 85 = 100 + 8500
        let total = money::line_total(dec("10"), dec("10"), dec("100"), dec("85"));
        assert_eq!(total, dec("8600"));
    }

    #[test]
    fn line_total_rounds_to_whole_units() {
        let total = money::line_total(dec("3"), dec("10.25"), dec("7.5"), dec("33.33"));
        // 30.75 + 249.975 = 280.725, rounds half away from zero
        assert_eq!(total, dec("281"));
    }

    #[test]
    fn invoice_total_adds_labour_and_transport() {
        let subtotal = money::subtotal([dec("8600"), dec("1400")]);
        assert_eq!(subtotal, dec("10000"));
        assert_eq!(money::invoice_total(subtotal, dec("350")), dec("10350"));
    }

    #[test]
    fn commission_is_rounded_per_invoice() {
        assert_eq!(money::commission_amount(dec("5000"), dec("2.5")), dec("125"));
        assert_eq!(money::commission_amount(dec("333"), dec("1")), dec("3"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=100_000i64).prop_map(|n| Decimal::new(n, 3))
    }

    fn bucket_strategy() -> impl Strategy<Value = Option<StockBucket>> {
        prop_oneof![
            Just(None),
            Just(Some(StockBucket::Shop)),
            Just(Some(StockBucket::Cold)),
        ]
    }

    fn lines_strategy() -> impl Strategy<Value = Vec<LineItem>> {
        proptest::collection::vec(
            (
                0usize..4,
                amount_strategy(),
                amount_strategy(),
                amount_strategy(),
                bucket_strategy(),
            ),
            0..6,
        )
        .prop_map(|raw| {
            // a small pool of item ids so edits hit the same items
            let pool: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
            raw
                .into_iter()
                .map(|(idx, q, n, g, storage)| {
                    let mut l = line(Some(pool[idx]), "0", "0", "0", storage);
                    l.quantity = q;
                    l.net_weight = n;
                    l.gross_weight = g;
                    l
                })
                .collect()
        })
    }

    fn kind_strategy() -> impl Strategy<Value = PartyKind> {
        prop_oneof![
            Just(PartyKind::Vendor),
            Just(PartyKind::Customer),
            Just(PartyKind::Broker),
            Just(PartyKind::Commissioner),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Re-submitting an invoice unchanged is always a no-op
        #[test]
        fn identical_edit_is_a_no_op(
            kind in kind_strategy(),
            lines in lines_strategy(),
        ) {
            let movements = stock_movements(kind, &lines, &lines.clone());
            prop_assert!(movements.is_empty());
        }

        /// Create followed by delete cancels exactly
        #[test]
        fn create_then_delete_cancels(
            kind in kind_strategy(),
            lines in lines_strategy(),
        ) {
            let create = stock_movements(kind, &[], &lines);
            let delete = stock_movements(kind, &lines, &[]);

            let mut net: std::collections::BTreeMap<(Uuid, StockBucket), StockDelta> =
                std::collections::BTreeMap::new();
            for m in create.into_iter().chain(delete) {
                *net.entry((m.item_id, m.bucket)).or_default() += m.delta;
            }
            for delta in net.values() {
                prop_assert!(delta.is_zero());
            }
        }

        /// Editing A to B produces the same net effect as deleting A
        /// and creating B
        #[test]
        fn edit_equals_delete_plus_create(
            kind in kind_strategy(),
            (a, b) in (lines_strategy(), lines_strategy()),
        ) {
            let mut direct: std::collections::BTreeMap<(Uuid, StockBucket), StockDelta> =
                std::collections::BTreeMap::new();
            for m in stock_movements(kind, &a, &b) {
                *direct.entry((m.item_id, m.bucket)).or_default() += m.delta;
            }

            let mut two_step: std::collections::BTreeMap<(Uuid, StockBucket), StockDelta> =
                std::collections::BTreeMap::new();
            for m in stock_movements(kind, &a, &[])
                .into_iter()
                .chain(stock_movements(kind, &[], &b))
            {
                *two_step.entry((m.item_id, m.bucket)).or_default() += m.delta;
            }

            direct.retain(|_, d| !d.is_zero());
            two_step.retain(|_, d| !d.is_zero());
            prop_assert_eq!(direct, two_step);
        }

        /// Broker and commissioner invoices never yield movements
        #[test]
        fn financial_kinds_never_move_stock(
            (a, b) in (lines_strategy(), lines_strategy()),
        ) {
            prop_assert!(stock_movements(PartyKind::Broker, &a, &b).is_empty());
            prop_assert!(stock_movements(PartyKind::Commissioner, &a, &b).is_empty());
        }

        /// Line totals are always whole currency units and non-negative
        /// for non-negative inputs
        #[test]
        fn line_totals_are_whole_and_non_negative(
            q in amount_strategy(),
            pack in amount_strategy(),
            net in amount_strategy(),
            price in amount_strategy(),
        ) {
            let total = money::line_total(q, pack, net, price);
            prop_assert!(total >= Decimal::ZERO);
            prop_assert_eq!(total.fract(), Decimal::ZERO);
        }
    }
}
