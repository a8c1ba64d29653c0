//! Domain models for the Tradebook back-office

mod balance;
mod invoice;
mod item;
mod party;
mod payment;
mod user;

pub use balance::*;
pub use invoice::*;
pub use item::*;
pub use party::*;
pub use payment::*;
pub use user::*;
