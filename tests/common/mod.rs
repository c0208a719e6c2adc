#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use notes_retrieval::application::{CommandService, DataStore, PollConfig};
use notes_retrieval::domain::ports::{BackendClient, RemoteProcedure, Table};
use notes_retrieval::domain::serialization::Record;
use notes_retrieval::domain::{
    CommandContent, CommandStatus, CommandType, CommandWithContent, DocumentChunk,
    DocumentChunkMetadata, DocumentMetadata, DomainError, FilterParams,
};
use notes_retrieval::infrastructure::InMemoryBackend;

/// In-memory backend with failure injection and scripted command statuses.
#[derive(Default)]
pub struct ScriptedBackend {
    pub inner: InMemoryBackend,
    /// Queries whose first embedding component equals this value fail.
    pub failing_marker: Mutex<Option<f32>>,
    pub fail_deletes: Mutex<bool>,
    /// Statuses reported by successive command reads; the last one repeats.
    pub statuses: Mutex<VecDeque<(CommandStatus, Option<String>)>>,
    pub command_reads: AtomicUsize,
    pub updates: AtomicUsize,
    pub upserts: AtomicUsize,
    pub delete_calls: Mutex<Vec<&'static str>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_queries_marked(&self, marker: f32) {
        *self.failing_marker.lock().unwrap() = Some(marker);
    }

    pub fn fail_deletes(&self) {
        *self.fail_deletes.lock().unwrap() = true;
    }

    pub fn script(&self, statuses: &[(CommandStatus, Option<&str>)]) {
        *self.statuses.lock().unwrap() = statuses
            .iter()
            .map(|(s, e)| (*s, e.map(str::to_string)))
            .collect();
    }

    fn next_status(&self) -> Option<(CommandStatus, Option<String>)> {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        }
    }

    fn check_delete(&self, kind: &'static str) -> Result<(), DomainError> {
        self.delete_calls.lock().unwrap().push(kind);
        if *self.fail_deletes.lock().unwrap() {
            return Err(DomainError::backend("scripted", "delete refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendClient for ScriptedBackend {
    async fn upsert(&self, table: Table, record: Record) -> Result<(), DomainError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(table, record).await
    }

    async fn update(&self, table: Table, record: Record) -> Result<(), DomainError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(table, record).await
    }

    async fn rpc(&self, procedure: &RemoteProcedure) -> Result<Vec<Record>, DomainError> {
        let RemoteProcedure::MatchPageSections(params) = procedure;
        let marker = *self.failing_marker.lock().unwrap();
        if marker.is_some() && params.embedding.first().copied() == marker {
            return Err(DomainError::backend("scripted", "connection reset"));
        }
        self.inner.rpc(procedure).await
    }

    async fn delete_like(&self, table: Table, column: &str, pattern: &str) -> Result<(), DomainError> {
        self.check_delete("like")?;
        self.inner.delete_like(table, column, pattern).await
    }

    async fn delete_in(&self, table: Table, column: &str, ids: &[String]) -> Result<(), DomainError> {
        self.check_delete("in")?;
        self.inner.delete_in(table, column, ids).await
    }

    async fn delete_by_filters(&self, table: Table, filter: &FilterParams) -> Result<(), DomainError> {
        self.check_delete("filter")?;
        self.inner.delete_by_filters(table, filter).await
    }

    async fn get_by_id(
        &self,
        table: Table,
        id: &str,
        columns: Option<&[&str]>,
    ) -> Result<Vec<Record>, DomainError> {
        let mut rows = self.inner.get_by_id(table, id, columns).await?;
        if table == Table::Commands {
            self.command_reads.fetch_add(1, Ordering::SeqCst);
            if let (Some(row), Some((status, errors))) = (rows.first_mut(), self.next_status()) {
                // A stored terminal status wins over the script.
                let stored = row.get("status").and_then(Value::as_str);
                if !matches!(stored, Some("ABANDONED")) {
                    row.insert("status".into(), serde_json::to_value(status).unwrap());
                    if let Some(errors) = errors {
                        row.insert("errors".into(), json!(errors));
                    }
                }
            }
        }
        Ok(rows)
    }
}

pub fn datastore(backend: Arc<ScriptedBackend>) -> Arc<DataStore> {
    Arc::new(DataStore::new(backend))
}

pub fn command_service(backend: Arc<ScriptedBackend>) -> CommandService {
    CommandService::with_config(datastore(backend), PollConfig::default())
}

pub fn chunk(id: &str, text: &str, embedding: Vec<f32>) -> DocumentChunk {
    DocumentChunk::new(text)
        .with_id(id)
        .with_embedding(embedding)
}

pub fn dated_chunk(id: &str, created_at: &str, embedding: Vec<f32>) -> DocumentChunk {
    chunk(id, id, embedding).with_metadata(DocumentChunkMetadata {
        created_at: Some(created_at.to_string()),
        ..Default::default()
    })
}

pub fn note_command(text: &str) -> CommandWithContent {
    CommandWithContent::new(
        CommandType::CreateNote,
        CommandContent {
            text: text.to_string(),
            metadata: DocumentMetadata::default(),
        },
    )
}

/// Stores a bare `NEW` command row with a caller-chosen id.
pub async fn seed_command(backend: &ScriptedBackend, id: &str) {
    let row = json!({"id": id, "status": "NEW", "type": "CREATE_NOTE", "content": {"text": "x"}});
    let Value::Object(record) = row else {
        unreachable!()
    };
    backend.inner.upsert(Table::Commands, record).await.unwrap();
}
