use async_trait::async_trait;
use serde::Serialize;

use crate::domain::serialization::Record;
use crate::domain::{errors::DomainError, FilterParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Documents,
    Commands,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Commands => "commands",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of the `match_page_sections` similarity procedure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchParams {
    #[serde(rename = "in_embedding")]
    pub embedding: Vec<f32>,
    #[serde(rename = "in_match_count", skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
    #[serde(flatten)]
    pub filter: FilterParams,
}

/// Backend-side functions callable through [`BackendClient::rpc`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteProcedure {
    /// Returns rows of the documents table with an added `similarity`
    /// column, most similar first.
    MatchPageSections(MatchParams),
}

impl RemoteProcedure {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MatchPageSections(_) => "match_page_sections",
        }
    }
}

/// Capabilities a concrete storage backend provides.
///
/// Records handed to `upsert` and `update` are already normalized: scalar
/// enums, string timestamps, no null-valued keys.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Writes or replaces the record keyed by its `id` field.
    async fn upsert(&self, table: Table, record: Record) -> Result<(), DomainError>;

    /// Merges the record into the existing row with the same `id`. A missing
    /// row is not an error.
    async fn update(&self, table: Table, record: Record) -> Result<(), DomainError>;

    async fn rpc(&self, procedure: &RemoteProcedure) -> Result<Vec<Record>, DomainError>;

    /// Deletes rows whose `column` matches a SQL `LIKE` pattern.
    async fn delete_like(&self, table: Table, column: &str, pattern: &str)
        -> Result<(), DomainError>;

    async fn delete_in(&self, table: Table, column: &str, ids: &[String])
        -> Result<(), DomainError>;

    async fn delete_by_filters(&self, table: Table, filter: &FilterParams)
        -> Result<(), DomainError>;

    /// Fetches the row with the given id, projected to `columns` when given.
    async fn get_by_id(
        &self,
        table: Table,
        id: &str,
        columns: Option<&[&str]>,
    ) -> Result<Vec<Record>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Source;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_match_params_wire_form() {
        let params = MatchParams {
            embedding: vec![0.5, 1.0],
            match_count: Some(2),
            filter: FilterParams {
                document_id: Some("doc".to_string()),
                source: Some(Source::File),
                end_date: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
                ..Default::default()
            },
        };

        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "in_embedding": [0.5, 1.0],
                "in_match_count": 2,
                "in_document_id": "doc",
                "in_source": "FILE",
                "in_end_date": "2024-06-01T00:00:00Z"
            })
        );
    }

    #[test]
    fn test_match_params_omit_absent_fields() {
        let params = MatchParams {
            embedding: vec![1.0],
            match_count: None,
            filter: FilterParams::default(),
        };

        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"in_embedding": [1.0]})
        );
        assert_eq!(
            RemoteProcedure::MatchPageSections(params).name(),
            "match_page_sections"
        );
    }
}
