pub mod entities;
pub mod errors;
pub mod filter;
pub mod ports;
pub mod serialization;

pub use entities::*;
pub use errors::{DomainError, Result};
pub use filter::{DeleteSelector, FilterParams};
