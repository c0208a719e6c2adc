use std::sync::Arc;

use crate::application::{CommandService, DataStore};
use crate::domain::ports::BackendClient;
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub datastore: Arc<DataStore>,
    pub commands: Arc<CommandService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(backend: Arc<dyn BackendClient>, config: AppConfig) -> Self {
        let datastore = Arc::new(DataStore::new(backend));
        let commands = Arc::new(CommandService::with_config(
            datastore.clone(),
            config.commands.poll_config(),
        ));
        Self {
            datastore,
            commands,
            config: Arc::new(config),
        }
    }
}
