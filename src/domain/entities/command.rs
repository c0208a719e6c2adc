use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DocumentMetadata;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandStatus {
    #[default]
    New,
    Processing,
    Completed,
    Abandoned,
    Error,
}

impl CommandStatus {
    /// Terminal statuses are never overwritten by the lifecycle manager.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned | Self::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    CreateNote,
    ModifyNote,
    DeleteNote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandContent {
    pub text: String,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: CommandStatus,
    #[serde(default)]
    pub errors: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Command {
    /// Columns of the bare command row, excluding the content payload.
    pub const COLUMNS: &'static [&'static str] =
        &["id", "status", "errors", "created_at", "updated_at"];

    pub fn abandoned(mut self) -> Self {
        self.status = CommandStatus::Abandoned;
        self.updated_at = Some(Utc::now());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandWithContent {
    #[serde(flatten)]
    pub command: Command,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    pub content: CommandContent,
}

impl CommandWithContent {
    pub fn new(command_type: CommandType, content: CommandContent) -> Self {
        Self {
            command: Command::default(),
            command_type,
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!CommandStatus::New.is_terminal());
        assert!(!CommandStatus::Processing.is_terminal());
        assert!(CommandStatus::Completed.is_terminal());
        assert!(CommandStatus::Abandoned.is_terminal());
        assert!(CommandStatus::Error.is_terminal());
    }

    #[test]
    fn test_command_with_content_wire_format() {
        let json = r#"{
            "type": "CREATE_NOTE",
            "content": {"text": "buy milk", "metadata": {"source": "CHAT"}}
        }"#;
        let command: CommandWithContent = serde_json::from_str(json).unwrap();

        assert_eq!(command.command_type, CommandType::CreateNote);
        assert_eq!(command.command.status, CommandStatus::New);
        assert!(command.command.id.is_none());
        assert_eq!(command.content.text, "buy milk");
    }

    #[test]
    fn test_abandoned_keeps_id() {
        let command = Command {
            id: Some("C1".to_string()),
            ..Default::default()
        }
        .abandoned();

        assert_eq!(command.id.as_deref(), Some("C1"));
        assert_eq!(command.status, CommandStatus::Abandoned);
        assert!(command.updated_at.is_some());
    }
}
