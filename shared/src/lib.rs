//! Shared types and domain logic for the Tradebook back-office
//!
//! This crate contains the pure computational core: money arithmetic,
//! stock-delta reconciliation, invoice status derivation, and the
//! permission model. It performs no I/O and holds no connections, so
//! everything here is directly unit- and property-testable.

pub mod models;
pub mod money;
pub mod stock;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
