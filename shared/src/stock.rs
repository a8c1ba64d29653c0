//! Stock-level arithmetic and invoice reconciliation deltas
//!
//! An item keeps six independent counters: quantity, net weight, and
//! gross weight in each of two buckets (shop and cold storage). Every
//! counter must stay non-negative at all times. Invoice create/edit/
//! delete is reconciled against inventory by computing the *net* signed
//! delta between the previously persisted line items and the incoming
//! ones, so re-submitting an unchanged invoice moves no stock and an
//! edit never double-counts the original movement.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{LineItem, PartyKind};

/// Physical stock location
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockBucket {
    Shop,
    Cold,
}

impl StockBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockBucket::Shop => "shop",
            StockBucket::Cold => "cold",
        }
    }
}

impl std::fmt::Display for StockBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three measures tracked per bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockField {
    Quantity,
    NetWeight,
    GrossWeight,
}

impl StockField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockField::Quantity => "quantity",
            StockField::NetWeight => "net_weight",
            StockField::GrossWeight => "gross_weight",
        }
    }
}

impl std::fmt::Display for StockField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed change to the three measures of one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDelta {
    pub quantity: Decimal,
    pub net_weight: Decimal,
    pub gross_weight: Decimal,
}

impl StockDelta {
    pub fn new(quantity: Decimal, net_weight: Decimal, gross_weight: Decimal) -> Self {
        Self {
            quantity,
            net_weight,
            gross_weight,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.quantity.is_zero() && self.net_weight.is_zero() && self.gross_weight.is_zero()
    }

    pub fn negated(&self) -> Self {
        Self {
            quantity: -self.quantity,
            net_weight: -self.net_weight,
            gross_weight: -self.gross_weight,
        }
    }
}

impl std::ops::Add for StockDelta {
    type Output = StockDelta;

    fn add(self, rhs: StockDelta) -> StockDelta {
        StockDelta {
            quantity: self.quantity + rhs.quantity,
            net_weight: self.net_weight + rhs.net_weight,
            gross_weight: self.gross_weight + rhs.gross_weight,
        }
    }
}

impl std::ops::AddAssign for StockDelta {
    fn add_assign(&mut self, rhs: StockDelta) {
        self.quantity += rhs.quantity;
        self.net_weight += rhs.net_weight;
        self.gross_weight += rhs.gross_weight;
    }
}

/// Current counters of one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketLevels {
    pub quantity: Decimal,
    pub net_weight: Decimal,
    pub gross_weight: Decimal,
}

impl BucketLevels {
    /// Apply a signed delta; all three fields succeed or none do.
    /// The first field that would go negative is reported.
    pub fn apply(&self, delta: &StockDelta) -> Result<BucketLevels, (StockField, Decimal)> {
        let next = BucketLevels {
            quantity: self.quantity + delta.quantity,
            net_weight: self.net_weight + delta.net_weight,
            gross_weight: self.gross_weight + delta.gross_weight,
        };
        if next.quantity < Decimal::ZERO {
            return Err((StockField::Quantity, -next.quantity));
        }
        if next.net_weight < Decimal::ZERO {
            return Err((StockField::NetWeight, -next.net_weight));
        }
        if next.gross_weight < Decimal::ZERO {
            return Err((StockField::GrossWeight, -next.gross_weight));
        }
        Ok(next)
    }
}

/// Counters of both buckets for one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub shop: BucketLevels,
    pub cold: BucketLevels,
}

/// A failed delta: which bucket/field fell short, and by how much
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[error("{field} in {bucket} storage would fall {shortfall} short")]
pub struct StockShortfall {
    pub bucket: StockBucket,
    pub field: StockField,
    pub shortfall: Decimal,
}

impl StockLevels {
    pub fn bucket(&self, bucket: StockBucket) -> &BucketLevels {
        match bucket {
            StockBucket::Shop => &self.shop,
            StockBucket::Cold => &self.cold,
        }
    }

    /// Apply a delta to one bucket, leaving the other untouched
    pub fn apply(
        &self,
        bucket: StockBucket,
        delta: &StockDelta,
    ) -> Result<StockLevels, StockShortfall> {
        let next = self.bucket(bucket).apply(delta).map_err(|(field, shortfall)| {
            StockShortfall {
                bucket,
                field,
                shortfall,
            }
        })?;
        let mut levels = *self;
        match bucket {
            StockBucket::Shop => levels.shop = next,
            StockBucket::Cold => levels.cold = next,
        }
        Ok(levels)
    }

    /// Move `amounts` out of `from` and into `to` as one operation.
    /// Fails without effect if the debit side would go negative.
    pub fn transfer(
        &self,
        from: StockBucket,
        to: StockBucket,
        amounts: &StockDelta,
    ) -> Result<StockLevels, StockShortfall> {
        self.apply(from, &amounts.negated())?.apply(to, amounts)
    }
}

/// A net stock movement produced by reconciling an invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockMovement {
    pub item_id: Uuid,
    pub bucket: StockBucket,
    pub delta: StockDelta,
}

/// Stock direction of an invoice kind: vendor purchases stock in (+1),
/// customer sales stock out (-1). Broker and commissioner invoices are
/// financial records only.
pub fn movement_sign(kind: PartyKind) -> Option<i8> {
    match kind {
        PartyKind::Vendor => Some(1),
        PartyKind::Customer => Some(-1),
        PartyKind::Broker | PartyKind::Commissioner => None,
    }
}

fn line_bucket(kind: PartyKind, line: &LineItem) -> StockBucket {
    match kind {
        // Vendor purchases may land in either bucket; shop by default
        PartyKind::Vendor => line.storage_type.unwrap_or(StockBucket::Shop),
        // Sales always leave the shop
        _ => StockBucket::Shop,
    }
}

/// Net inventory movements for an invoice mutation.
///
/// `original` is the persisted line-item list before the mutation (empty
/// for create), `new` the incoming list (empty for delete). Each new
/// line contributes its full amounts with the kind's sign in its bucket;
/// each original line contributes the negation. Summing by (item, bucket)
/// yields exactly the difference the edit introduces:
/// identical lists cancel to nothing, and replacing A with A' nets to
/// `A' − A` rather than a full reversal plus re-application.
///
/// Lines without an item reference (free-text lines) never move stock.
pub fn stock_movements(
    kind: PartyKind,
    original: &[LineItem],
    new: &[LineItem],
) -> Vec<StockMovement> {
    let Some(sign) = movement_sign(kind) else {
        return Vec::new();
    };

    let mut net: BTreeMap<(Uuid, StockBucket), StockDelta> = BTreeMap::new();
    for (lines, flip) in [(new, false), (original, true)] {
        for line in lines {
            let Some(item_id) = line.item_id else {
                continue;
            };
            let mut delta = line.stock_delta();
            if sign < 0 {
                delta = delta.negated();
            }
            if flip {
                delta = delta.negated();
            }
            *net.entry((item_id, line_bucket(kind, line))).or_default() += delta;
        }
    }

    net.into_iter()
        .filter(|(_, delta)| !delta.is_zero())
        .map(|((item_id, bucket), delta)| StockMovement {
            item_id,
            bucket,
            delta,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn levels(shop_qty: &str, cold_qty: &str) -> StockLevels {
        StockLevels {
            shop: BucketLevels {
                quantity: dec(shop_qty),
                net_weight: dec(shop_qty),
                gross_weight: dec(shop_qty),
            },
            cold: BucketLevels {
                quantity: dec(cold_qty),
                net_weight: dec(cold_qty),
                gross_weight: dec(cold_qty),
            },
        }
    }

    fn uniform(qty: &str) -> StockDelta {
        StockDelta::new(dec(qty), dec(qty), dec(qty))
    }

    #[test]
    fn apply_positive_delta_adds() {
        let next = levels("10", "0").apply(StockBucket::Shop, &uniform("5")).unwrap();
        assert_eq!(next.shop.quantity, dec("15"));
        assert_eq!(next.cold.quantity, dec("0"));
    }

    #[test]
    fn apply_rejects_negative_result_atomically() {
        let start = levels("10", "0");
        // net weight would go negative even though quantity would not
        let delta = StockDelta::new(dec("-5"), dec("-12"), dec("-5"));
        let err = start.apply(StockBucket::Shop, &delta).unwrap_err();
        assert_eq!(err.bucket, StockBucket::Shop);
        assert_eq!(err.field, StockField::NetWeight);
        assert_eq!(err.shortfall, dec("2"));
    }

    #[test]
    fn transfer_moves_between_buckets() {
        let next = levels("5", "0")
            .transfer(StockBucket::Shop, StockBucket::Cold, &uniform("3"))
            .unwrap();
        assert_eq!(next.shop.quantity, dec("2"));
        assert_eq!(next.cold.quantity, dec("3"));
    }

    #[test]
    fn transfer_more_than_available_fails_without_effect() {
        let start = levels("5", "0");
        let err = start
            .transfer(StockBucket::Shop, StockBucket::Cold, &uniform("6"))
            .unwrap_err();
        assert_eq!(err.bucket, StockBucket::Shop);
        assert_eq!(err.shortfall, dec("1"));
        // caller keeps the original value on failure
        assert_eq!(start.shop.quantity, dec("5"));
        assert_eq!(start.cold.quantity, dec("0"));
    }
}
