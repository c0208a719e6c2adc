//! Application layer - Use cases and orchestration.
//!
//! Services here depend on the [`BackendClient`](crate::domain::ports::BackendClient)
//! port rather than on a concrete store.

pub mod services;

pub use services::{CommandOutcome, CommandResponse, CommandService, DataStore, PollConfig};
