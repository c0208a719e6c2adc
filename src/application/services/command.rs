use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::instrument;

use crate::application::services::DataStore;
use crate::domain::{Command, CommandStatus, CommandWithContent, DomainError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

pub const ABANDONED_MESSAGE: &str =
    "Command was abandoned due to timeout. Check Obsidian connection";
const CANCELLED_MESSAGE: &str = "Command wait was cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// How a wait on a command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed,
    /// The executor reported `ERROR` with the recorded message.
    Failed(Option<String>),
    /// No terminal status before the deadline, or someone else gave up.
    Abandoned,
    Cancelled,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Completed => None,
            Self::Failed(errors) => Some(
                errors
                    .clone()
                    .unwrap_or_else(|| "Command failed".to_string()),
            ),
            Self::Abandoned => Some(ABANDONED_MESSAGE.to_string()),
            Self::Cancelled => Some(CANCELLED_MESSAGE.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResponse {
    pub id: String,
    pub errors: Option<String>,
}

/// Creates commands and waits for an external executor to finish them.
pub struct CommandService {
    datastore: Arc<DataStore>,
    config: PollConfig,
}

impl CommandService {
    pub fn new(datastore: Arc<DataStore>) -> Self {
        Self::with_config(datastore, PollConfig::default())
    }

    pub fn with_config(datastore: Arc<DataStore>, config: PollConfig) -> Self {
        Self { datastore, config }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Creates the command and blocks until it is terminal or abandoned.
    #[instrument(skip(self, command), fields(command_type = ?command.command_type))]
    pub async fn submit(&self, command: CommandWithContent) -> Result<CommandResponse, DomainError> {
        let id = self.datastore.create_command(command).await?;
        let outcome = self.await_completion(&id).await?;

        Ok(CommandResponse {
            errors: outcome.error_message(),
            id,
        })
    }

    async fn fetch(&self, command_id: &str) -> Result<Command, DomainError> {
        self.datastore
            .get_command(command_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("command {command_id}")))
    }

    pub async fn await_completion(&self, command_id: &str) -> Result<CommandOutcome, DomainError> {
        self.await_completion_until(command_id, std::future::pending())
            .await
    }

    /// Polls the command until it reaches a terminal status, the deadline
    /// passes, or `cancel` resolves.
    ///
    /// On deadline the command is re-read and, if still not terminal, moved
    /// to `ABANDONED`; this is the only write the loop performs. The backend
    /// has no conditional update, so a terminal status written between that
    /// re-read and the write is still overwritten. Cancellation leaves the
    /// command untouched.
    #[instrument(skip(self, cancel))]
    pub async fn await_completion_until<F>(
        &self,
        command_id: &str,
        cancel: F,
    ) -> Result<CommandOutcome, DomainError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        let started = Instant::now();

        loop {
            tracing::debug!(command_id, "polling command status");
            let command = self.fetch(command_id).await?;
            if let Some(outcome) = terminal_outcome(&command) {
                return Ok(outcome);
            }

            if started.elapsed() > self.config.timeout {
                let latest = self.fetch(command_id).await?;
                if let Some(outcome) = terminal_outcome(&latest) {
                    return Ok(outcome);
                }
                tracing::warn!(
                    command_id,
                    timeout_secs = self.config.timeout.as_secs(),
                    "command timed out, abandoning"
                );
                self.datastore.update_command(&latest.abandoned()).await?;
                return Ok(CommandOutcome::Abandoned);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = &mut cancel => {
                    tracing::info!(command_id, "command wait cancelled");
                    return Ok(CommandOutcome::Cancelled);
                }
            }
        }
    }
}

fn terminal_outcome(command: &Command) -> Option<CommandOutcome> {
    match command.status {
        CommandStatus::Completed => Some(CommandOutcome::Completed),
        CommandStatus::Error => Some(CommandOutcome::Failed(command.errors.clone())),
        CommandStatus::Abandoned => Some(CommandOutcome::Abandoned),
        CommandStatus::New | CommandStatus::Processing => None,
    }
}
