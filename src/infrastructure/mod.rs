pub mod backend;
pub mod config;

pub use backend::{create_backend, InMemoryBackend, QdrantBackend};
pub use config::{AppConfig, ConfigError, DatastoreProvider};
