//! Durable storage for services and transactions.
//!
//! Both stores hold a `PgPool` clone and issue plain `sqlx` queries; the
//! settlement engine opens its own database transaction and borrows the
//! row-lock primitive from `services`.

pub mod schema;
mod services;
mod transactions;

pub use services::ServiceStore;
pub use transactions::{DEFAULT_PAGE_SIZE, TransactionStore};

pub(crate) use services::lock_service_for_update;
