//! Foodgram backend
//!
//! A recipe-sharing service over PostgreSQL. Every request runs in one unit of
//! work: a transaction shared by the repositories serving it, with
//! transaction-aware observers notified once it commits or rolls back.

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod store;
pub mod transaction_aware;
pub mod unit_of_work;

pub use error::{StoreError, StoreResult};
pub use executor::Executor;
pub use store::Store;
pub use transaction_aware::TransactionAware;
pub use unit_of_work::{PostgresUnitOfWork, PostgresUnitOfWorkSession, UnitOfWork, UnitOfWorkSession};
