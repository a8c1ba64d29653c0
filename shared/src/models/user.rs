//! User accounts and the worker permission model
//!
//! Permissions are an enumerated set of (section, optional subsection)
//! capabilities rather than free-form string keys, so a typo in a
//! permission name fails at compile time. The wire and storage form is
//! the dotted key (`"vendors"`, `"vendors.payments"`).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role. Admin implicitly holds every capability; the
/// permission set is only consulted for workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Worker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Worker => "worker",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "worker" => Ok(Role::Worker),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Top-level application sections a worker can be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Dashboard,
    Items,
    Vendors,
    Customers,
    Brokers,
    Commissioners,
    Balance,
    Users,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Items => "items",
            Section::Vendors => "vendors",
            Section::Customers => "customers",
            Section::Brokers => "brokers",
            Section::Commissioners => "commissioners",
            Section::Balance => "balance",
            Section::Users => "users",
        }
    }

    /// Child capabilities that exist under this section
    pub fn subsections(&self) -> &'static [Subsection] {
        match self {
            Section::Items => &[Subsection::Transfers],
            Section::Vendors => {
                &[Subsection::Invoices, Subsection::Payments, Subsection::Payables]
            }
            Section::Customers => &[
                Subsection::Invoices,
                Subsection::Payments,
                Subsection::Receivables,
            ],
            Section::Brokers | Section::Commissioners => {
                &[Subsection::Invoices, Subsection::Payments]
            }
            Section::Dashboard | Section::Balance | Section::Users => &[],
        }
    }
}

impl std::str::FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(Section::Dashboard),
            "items" => Ok(Section::Items),
            "vendors" => Ok(Section::Vendors),
            "customers" => Ok(Section::Customers),
            "brokers" => Ok(Section::Brokers),
            "commissioners" => Ok(Section::Commissioners),
            "balance" => Ok(Section::Balance),
            "users" => Ok(Section::Users),
            other => Err(format!("unknown section: {other}")),
        }
    }
}

/// Child capabilities within a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsection {
    Invoices,
    Payments,
    Payables,
    Receivables,
    Transfers,
}

impl Subsection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subsection::Invoices => "invoices",
            Subsection::Payments => "payments",
            Subsection::Payables => "payables",
            Subsection::Receivables => "receivables",
            Subsection::Transfers => "transfers",
        }
    }
}

impl std::str::FromStr for Subsection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoices" => Ok(Subsection::Invoices),
            "payments" => Ok(Subsection::Payments),
            "payables" => Ok(Subsection::Payables),
            "receivables" => Ok(Subsection::Receivables),
            "transfers" => Ok(Subsection::Transfers),
            other => Err(format!("unknown subsection: {other}")),
        }
    }
}

/// A single grantable capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub section: Section,
    pub subsection: Option<Subsection>,
}

impl Capability {
    pub fn section(section: Section) -> Self {
        Self {
            section,
            subsection: None,
        }
    }

    pub fn child(section: Section, subsection: Subsection) -> Self {
        Self {
            section,
            subsection: Some(subsection),
        }
    }

    /// Dotted storage/wire key, e.g. `vendors` or `vendors.payments`
    pub fn key(&self) -> String {
        match self.subsection {
            Some(sub) => format!("{}.{}", self.section.as_str(), sub.as_str()),
            None => self.section.as_str().to_string(),
        }
    }

    /// Parse a dotted key, rejecting subsections that do not exist
    /// under the named section
    pub fn parse(key: &str) -> Result<Self, String> {
        let (section_str, sub_str) = match key.split_once('.') {
            Some((s, c)) => (s, Some(c)),
            None => (key, None),
        };
        let section: Section = section_str.parse()?;
        let subsection = match sub_str {
            Some(c) => {
                let sub: Subsection = c.parse()?;
                if !section.subsections().contains(&sub) {
                    return Err(format!(
                        "subsection {} does not belong to section {}",
                        sub.as_str(),
                        section.as_str()
                    ));
                }
                Some(sub)
            }
            None => None,
        };
        Ok(Self {
            section,
            subsection,
        })
    }
}

/// A worker's granted capabilities.
///
/// Section and child grants are independent booleans: granting a child
/// never implies the section, but revoking a section cascades to clear
/// all of its children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    grants: BTreeSet<Capability>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, capability: Capability) {
        self.grants.insert(capability);
    }

    /// Revoke a capability. Revoking a section grant also clears every
    /// child grant under that section.
    pub fn revoke(&mut self, capability: Capability) {
        self.grants.remove(&capability);
        if capability.subsection.is_none() {
            self.grants
                .retain(|c| c.section != capability.section || c.subsection.is_none());
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.grants.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.grants.iter()
    }

    /// Dotted keys, sorted, for storage and JWT claims
    pub fn keys(&self) -> Vec<String> {
        self.grants.iter().map(Capability::key).collect()
    }

    /// Rebuild from stored keys; unknown keys are rejected
    pub fn from_keys<I, S>(keys: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for key in keys {
            set.grant(Capability::parse(key.as_ref())?);
        }
        Ok(set)
    }
}

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub role: Role,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
