//! Business logic services for the Tradebook server

pub mod auth;
pub mod balance;
pub mod invoice;
pub mod item;
pub mod party;
pub mod payment;
pub mod report;
pub mod user;

pub use auth::AuthService;
pub use balance::BalanceService;
pub use invoice::InvoiceService;
pub use item::ItemService;
pub use party::PartyService;
pub use payment::PaymentService;
pub use report::ReportService;
pub use user::UserService;
