use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::ports::{BackendClient, MatchParams, RemoteProcedure, Table};
use crate::domain::serialization::{normalize_timestamp, to_record, Record};
use crate::domain::{
    Command, CommandStatus, CommandWithContent, DeleteSelector, DocumentChunk,
    DocumentChunkMetadata, DocumentChunkWithScore, DocumentMetadataFilter, DocumentWithChunks,
    DomainError, FilterParams, QueryResult, QueryWithEmbedding, Source, DEFAULT_TOP_K,
};

/// Column the bulk delete modes key on.
const DOCUMENT_ID_COLUMN: &str = "document_id";
const MATCH_ALL: &str = "%";

/// Backend-agnostic chunk and command storage.
pub struct DataStore {
    backend: Arc<dyn BackendClient>,
}

#[derive(Debug, Serialize)]
struct ChunkRecord<'a> {
    id: &'a str,
    content: &'a str,
    embedding: Option<&'a [f32]>,
    document_id: &'a str,
    source: Option<Source>,
    source_id: Option<&'a str>,
    url: Option<&'a str>,
    author: Option<&'a str>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatchedRow {
    id: Option<String>,
    #[serde(default)]
    content: String,
    similarity: f64,
    #[serde(default)]
    source: Option<Source>,
    #[serde(default)]
    source_id: Option<String>,
    #[serde(default)]
    document_id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    author: Option<String>,
}

impl From<MatchedRow> for DocumentChunkWithScore {
    fn from(row: MatchedRow) -> Self {
        Self {
            chunk: DocumentChunk {
                id: row.id,
                text: row.content,
                metadata: DocumentChunkMetadata {
                    source: row.source,
                    source_id: row.source_id,
                    url: row.url,
                    created_at: row.created_at,
                    author: row.author,
                    document_id: row.document_id,
                },
                embedding: None,
            },
            score: row.similarity,
        }
    }
}

impl DataStore {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    /// Prepares whole documents (ids, chunk ownership) and stores their chunks.
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub async fn upsert_documents(
        &self,
        documents: Vec<DocumentWithChunks>,
    ) -> Result<Vec<String>, DomainError> {
        let mut chunks: BTreeMap<String, Vec<DocumentChunk>> = BTreeMap::new();
        for document in documents {
            let (document_id, document_chunks) = document.into_chunks();
            chunks.entry(document_id).or_default().extend(document_chunks);
        }
        self.upsert(chunks).await
    }

    /// Writes every chunk of every document, one backend upsert per chunk.
    ///
    /// The first failing write aborts the operation; chunks written before it
    /// stay written.
    #[instrument(skip(self, chunks), fields(documents = chunks.len()))]
    pub async fn upsert(
        &self,
        chunks: BTreeMap<String, Vec<DocumentChunk>>,
    ) -> Result<Vec<String>, DomainError> {
        for (document_id, document_chunks) in &chunks {
            for chunk in document_chunks {
                let record = Self::chunk_record(document_id, chunk)?;
                self.backend.upsert(Table::Documents, record).await?;
            }
            tracing::debug!(
                document_id = %document_id,
                chunks = document_chunks.len(),
                "document upserted"
            );
        }

        Ok(chunks.into_keys().collect())
    }

    fn chunk_record(document_id: &str, chunk: &DocumentChunk) -> Result<Record, DomainError> {
        let id = chunk
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DomainError::validation("chunk id is required"))?;
        let metadata = &chunk.metadata;

        to_record(&ChunkRecord {
            id,
            content: &chunk.text,
            embedding: chunk.embedding.as_deref(),
            document_id,
            source: metadata.source,
            source_id: metadata.source_id.as_deref(),
            url: metadata.url.as_deref(),
            author: metadata.author.as_deref(),
            created_at: metadata
                .created_at
                .as_deref()
                .map(normalize_timestamp)
                .transpose()?,
        })
    }

    /// Runs every query independently. A failing query yields an empty
    /// result at its position; the others are unaffected.
    #[instrument(skip(self, queries), fields(count = queries.len()))]
    pub async fn query(&self, queries: Vec<QueryWithEmbedding>) -> Vec<QueryResult> {
        join_all(queries.into_iter().map(|query| async move {
            match self.query_one(&query).await {
                Ok(results) => QueryResult {
                    query: query.query.query,
                    results,
                },
                Err(e) => {
                    tracing::error!(error = %e, query = %query.query.query, "query failed");
                    QueryResult::empty(query.query.query)
                }
            }
        }))
        .await
    }

    async fn query_one(
        &self,
        query: &QueryWithEmbedding,
    ) -> Result<Vec<DocumentChunkWithScore>, DomainError> {
        let filter = match &query.query.filter {
            Some(filter) => FilterParams::from_filter(filter)?,
            None => FilterParams::default(),
        };
        let top_k = query.query.top_k.unwrap_or(DEFAULT_TOP_K);
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let params = MatchParams {
            embedding: query.embedding.clone(),
            match_count: Some(top_k),
            filter,
        };
        tracing::debug!(match_count = ?params.match_count, filter = ?params.filter, "matching");

        let rows = self
            .backend
            .rpc(&RemoteProcedure::MatchPageSections(params))
            .await?;

        let mut results = rows
            .into_iter()
            .map(|row| {
                serde_json::from_value::<MatchedRow>(serde_json::Value::Object(row))
                    .map(DocumentChunkWithScore::from)
            })
            .collect::<Result<Vec<_>, _>>()?;

        results.truncate(top_k);
        Ok(results)
    }

    /// Deletes in exactly one mode, chosen with precedence
    /// `delete_all` > `ids` > `filter`. Failures are reported as `false`.
    #[instrument(skip(self, ids, filter))]
    pub async fn delete(
        &self,
        ids: Option<Vec<String>>,
        filter: Option<DocumentMetadataFilter>,
        delete_all: bool,
    ) -> bool {
        let Some(selector) = DeleteSelector::resolve(ids, filter, delete_all) else {
            return true;
        };

        match self.delete_selected(&selector).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, selector = ?selector, "delete failed");
                false
            }
        }
    }

    async fn delete_selected(&self, selector: &DeleteSelector) -> Result<(), DomainError> {
        match selector {
            DeleteSelector::All => {
                self.backend
                    .delete_like(Table::Documents, DOCUMENT_ID_COLUMN, MATCH_ALL)
                    .await
            }
            DeleteSelector::Ids(ids) => {
                self.backend
                    .delete_in(Table::Documents, DOCUMENT_ID_COLUMN, ids)
                    .await
            }
            DeleteSelector::Filter(filter) => {
                let params = FilterParams::from_filter(filter)?;
                self.backend
                    .delete_by_filters(Table::Documents, &params)
                    .await
            }
        }
    }

    /// Stores a new command with a fresh id and `NEW` status.
    #[instrument(skip(self, command), fields(command_type = ?command.command_type))]
    pub async fn create_command(
        &self,
        mut command: CommandWithContent,
    ) -> Result<String, DomainError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        command.command = Command {
            id: Some(id.clone()),
            status: CommandStatus::New,
            errors: None,
            created_at: Some(now),
            updated_at: Some(now),
        };

        self.backend
            .upsert(Table::Commands, to_record(&command)?)
            .await?;
        tracing::info!(command_id = %id, "command created");
        Ok(id)
    }

    /// Fetches the bare command fields, leaving the content behind.
    #[instrument(skip(self))]
    pub async fn get_command(&self, command_id: &str) -> Result<Option<Command>, DomainError> {
        let rows = self
            .backend
            .get_by_id(Table::Commands, command_id, Some(Command::COLUMNS))
            .await?;

        rows.into_iter()
            .next()
            .map(|row| serde_json::from_value(serde_json::Value::Object(row)))
            .transpose()
            .map_err(Into::into)
    }

    #[instrument(skip(self, command), fields(command_id = ?command.id, status = ?command.status))]
    pub async fn update_command(&self, command: &Command) -> Result<bool, DomainError> {
        if command.id.is_none() {
            return Err(DomainError::validation("command id is required for update"));
        }
        self.backend
            .update(Table::Commands, to_record(command)?)
            .await?;
        Ok(true)
    }
}
