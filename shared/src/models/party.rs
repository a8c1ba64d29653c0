//! Counterparties: vendors, customers, brokers, commissioners

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four kinds of counterparty the business trades with. Invoices
/// carry the same kind as the party they are issued against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Vendor,
    Customer,
    Broker,
    Commissioner,
}

impl PartyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyKind::Vendor => "vendor",
            PartyKind::Customer => "customer",
            PartyKind::Broker => "broker",
            PartyKind::Commissioner => "commissioner",
        }
    }

    pub const ALL: [PartyKind; 4] = [
        PartyKind::Vendor,
        PartyKind::Customer,
        PartyKind::Broker,
        PartyKind::Commissioner,
    ];
}

impl std::fmt::Display for PartyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PartyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vendor" => Ok(PartyKind::Vendor),
            "customer" => Ok(PartyKind::Customer),
            "broker" => Ok(PartyKind::Broker),
            "commissioner" => Ok(PartyKind::Commissioner),
            other => Err(format!("unknown party kind: {other}")),
        }
    }
}

/// A counterparty record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub id: Uuid,
    pub kind: PartyKind,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
