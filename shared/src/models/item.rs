//! Stock items tracked in shop and cold storage

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stock::{BucketLevels, StockLevels};

/// A stock item. Six counters, all non-negative at all times:
/// quantity, net weight, and gross weight in each bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    /// Stable, human-referenced number (invoices quote it, reports sort by it)
    pub item_number: i64,
    pub item_name: String,
    pub shop_quantity: Decimal,
    pub shop_net_weight: Decimal,
    pub shop_gross_weight: Decimal,
    pub cold_quantity: Decimal,
    pub cold_net_weight: Decimal,
    pub cold_gross_weight: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn levels(&self) -> StockLevels {
        StockLevels {
            shop: BucketLevels {
                quantity: self.shop_quantity,
                net_weight: self.shop_net_weight,
                gross_weight: self.shop_gross_weight,
            },
            cold: BucketLevels {
                quantity: self.cold_quantity,
                net_weight: self.cold_net_weight,
                gross_weight: self.cold_gross_weight,
            },
        }
    }
}
