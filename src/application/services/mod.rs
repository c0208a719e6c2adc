mod command;
mod datastore;

pub use command::{CommandOutcome, CommandResponse, CommandService, PollConfig};
pub use datastore::DataStore;
