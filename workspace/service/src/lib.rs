//! Service layer: one function per use case, sitting between the HTTP
//! handlers and the SeaORM entities. Multi-step mutations (debt plus
//! its installment batch, a transfer's two legs) run inside a single
//! database transaction so a failure midway leaves no partial state.

pub mod auth;
pub mod debts;
pub mod error;
pub mod schedule;
pub mod transactions;
pub mod users;
pub mod wallets;

pub use error::{ServiceError, ServiceResult};
