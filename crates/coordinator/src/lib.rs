//! Transaction coordination for xaproxy
//!
//! This crate provides:
//! - TransactionManager / Transaction: JTA-style manager surface
//! - LocalTransactionManager: in-memory reference manager, one transaction per thread
//! - ManagedCoordinator: adapts any manager into `xaproxy_core::TransactionCoordinator`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod error;
pub mod local;
pub mod manager;
pub mod transaction;

pub use adapter::ManagedCoordinator;
pub use error::{Result, TransactionError};
pub use local::{LocalTransaction, FORMAT_ID};
pub use manager::{LocalTransactionManager, ManagerStats};
pub use transaction::{RegistrationResult, Transaction, TransactionManager};
