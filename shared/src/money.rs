//! Money arithmetic for invoices and commissions
//!
//! Rounding policy: every monetary amount is rounded to whole currency
//! units (0 decimal places, midpoint away from zero) at the point it is
//! computed. The same policy applies on create, edit, and read-back, so
//! a stored total never disagrees with a recomputed one.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round an amount to whole currency units
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Total for a single invoice line:
/// `round(quantity × packaging_cost + net_weight × unit_price)`
pub fn line_total(
    quantity: Decimal,
    packaging_cost: Decimal,
    net_weight: Decimal,
    unit_price: Decimal,
) -> Decimal {
    round_currency(quantity * packaging_cost + net_weight * unit_price)
}

/// Commission owed on an invoice total: `round(total × pct / 100)`
pub fn commission_amount(total: Decimal, percentage: Decimal) -> Decimal {
    round_currency(total * percentage / Decimal::from(100))
}

/// Sum of already-rounded line totals
pub fn subtotal<I>(line_totals: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    line_totals.into_iter().sum()
}

/// Invoice total: subtotal plus labour/transport cost
pub fn invoice_total(subtotal: Decimal, labour_transport_cost: Decimal) -> Decimal {
    round_currency(subtotal + labour_transport_cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn rounds_to_whole_units() {
        assert_eq!(round_currency(dec("10.4")), dec("10"));
        assert_eq!(round_currency(dec("10.5")), dec("11"));
        assert_eq!(round_currency(dec("10.6")), dec("11"));
    }

    #[test]
    fn line_total_combines_packaging_and_weight_price() {
        // 10 bags × 50 packaging + 95.5 kg × 210/kg = 500 + 20055 = 20555
        let total = line_total(dec("10"), dec("50"), dec("95.5"), dec("210"));
        assert_eq!(total, dec("20555"));
    }

    #[test]
    fn line_total_is_rounded_once() {
        // 3 × 0.4 + 1.2 × 1.1 = 1.2 + 1.32 = 2.52 -> 3
        let total = line_total(dec("3"), dec("0.4"), dec("1.2"), dec("1.1"));
        assert_eq!(total, dec("3"));
    }

    #[test]
    fn broker_commission_on_five_thousand() {
        assert_eq!(commission_amount(dec("5000"), dec("2.5")), dec("125"));
    }

    #[test]
    fn commission_rounds_midpoint_away() {
        // 1001 × 2.5% = 25.025 -> 25; 990 × 2.5% = 24.75 -> 25
        assert_eq!(commission_amount(dec("1001"), dec("2.5")), dec("25"));
        assert_eq!(commission_amount(dec("990"), dec("2.5")), dec("25"));
    }

    #[test]
    fn total_adds_labour_cost() {
        assert_eq!(invoice_total(dec("20555"), dec("445")), dec("21000"));
    }
}
