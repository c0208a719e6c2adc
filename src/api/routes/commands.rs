use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::{error::ApiError, state::AppState};
use crate::application::CommandResponse;
use crate::domain::CommandWithContent;

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: CommandWithContent,
}

/// Creates the command and holds the response until it settles.
pub async fn create_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    tracing::info!(command_type = ?request.command.command_type, "received command");
    let response = state.commands.submit(request.command).await?;
    Ok(Json(response))
}
