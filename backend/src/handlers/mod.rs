//! HTTP handlers for the Tradebook API

pub mod auth;
pub mod balance;
pub mod health;
pub mod invoice;
pub mod item;
pub mod party;
pub mod report;
pub mod user;

pub use auth::*;
pub use balance::*;
pub use health::*;
pub use invoice::*;
pub use item::*;
pub use party::*;
pub use report::*;
pub use user::*;

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use shared::models::{PartyKind, Section, Subsection};
use shared::types::Pagination;

/// Common pagination query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(20),
        }
    }
}

/// The application section a counterparty kind belongs to
pub(crate) fn party_section(kind: PartyKind) -> Section {
    match kind {
        PartyKind::Vendor => Section::Vendors,
        PartyKind::Customer => Section::Customers,
        PartyKind::Broker => Section::Brokers,
        PartyKind::Commissioner => Section::Commissioners,
    }
}

/// Gate on a section, optionally satisfied by a child capability.
/// Admins always pass.
pub(crate) fn require_access(
    user: &AuthUser,
    section: Section,
    subsection: Option<Subsection>,
) -> AppResult<()> {
    let allowed = user.can_access(section)
        || subsection.is_some_and(|sub| user.can_access_child(section, sub));
    if allowed {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}
