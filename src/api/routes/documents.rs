use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::{error::ApiError, state::AppState};
use crate::domain::{DocumentMetadataFilter, DocumentWithChunks, QueryResult, QueryWithEmbedding};

#[derive(Debug, Deserialize)]
pub struct UpsertRequest {
    pub documents: Vec<DocumentWithChunks>,
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub queries: Vec<QueryWithEmbedding>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub results: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    #[serde(default)]
    pub filter: Option<DocumentMetadataFilter>,
    #[serde(default)]
    pub delete_all: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

pub async fn upsert(
    State(state): State<AppState>,
    Json(request): Json<UpsertRequest>,
) -> Result<Json<UpsertResponse>, ApiError> {
    let ids = state.datastore.upsert_documents(request.documents).await?;
    Ok(Json(UpsertResponse { ids }))
}

pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Json<QueryResponse> {
    let results = state.datastore.query(request.queries).await;
    Json(QueryResponse { results })
}

pub async fn delete(
    State(state): State<AppState>,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let delete_all = request.delete_all.unwrap_or(false);
    let has_ids = request.ids.as_ref().is_some_and(|ids| !ids.is_empty());
    if !(delete_all || has_ids || request.filter.is_some()) {
        return Err(ApiError::BadRequest(
            "One of ids, filter, or delete_all is required".to_string(),
        ));
    }

    let success = state
        .datastore
        .delete(request.ids, request.filter, delete_all)
        .await;
    Ok(Json(DeleteResponse { success }))
}
