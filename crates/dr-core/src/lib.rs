//! `dr-core`: disaster-recovery orchestration for a managed database.
//!
//! The [`Orchestrator`] drives four procedures (health check, failover,
//! failback, DR test) against a primary instance and its cross-region
//! replica. Every piece of infrastructure it touches sits behind a trait in
//! [`collaborators`], so the procedures run the same against the HTTP
//! gateway in [`gateway`] or against in-memory fakes in tests.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod orchestrator;
pub mod report;
pub mod types;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use config::DrConfig;
pub use error::{DrError, Result};
pub use orchestrator::{Collaborators, Orchestrator};
pub use report::{InvocationResponse, ProcedureResult};
pub use types::{Action, ActionRequest, Severity, Step};
