mod in_memory;
mod qdrant;

use std::sync::Arc;

pub use in_memory::InMemoryBackend;
pub use qdrant::QdrantBackend;

use crate::domain::{ports::BackendClient, DomainError};
use crate::infrastructure::config::{DatastoreConfig, DatastoreProvider};

/// Builds the backend selected by configuration.
pub async fn create_backend(
    config: &DatastoreConfig,
) -> Result<Arc<dyn BackendClient>, DomainError> {
    match config.provider {
        DatastoreProvider::Memory => {
            tracing::info!("using in-memory datastore");
            Ok(Arc::new(InMemoryBackend::new()))
        }
        DatastoreProvider::Qdrant => {
            let qdrant = &config.qdrant;
            let backend =
                QdrantBackend::new(&qdrant.url, &qdrant.collection_prefix, qdrant.dimension)
                    .await?;
            tracing::info!(url = %qdrant.url, "using qdrant datastore");
            Ok(Arc::new(backend))
        }
    }
}
