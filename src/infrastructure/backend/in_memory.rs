use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::domain::filter::RowView;
use crate::domain::ports::{BackendClient, MatchParams, RemoteProcedure, Table};
use crate::domain::serialization::Record;
use crate::domain::{DomainError, Embedding, FilterParams, DEFAULT_TOP_K};

type Rows = BTreeMap<String, Record>;

/// Process-local backend. Rows are keyed by their `id` column.
pub struct InMemoryBackend {
    tables: RwLock<HashMap<Table, Rows>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Number of rows currently stored in `table`.
    pub fn len(&self, table: Table) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(&table).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, table: Table) -> bool {
        self.len(table) == 0
    }

    fn record_id(record: &Record) -> Result<String, DomainError> {
        record
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DomainError::validation("record has no string id"))
    }

    fn with_rows<T>(&self, table: Table, f: impl FnOnce(&mut Rows) -> T) -> Result<T, DomainError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(f(tables.entry(table).or_default()))
    }

    fn match_page_sections(&self, params: &MatchParams) -> Result<Vec<Record>, DomainError> {
        let tables = self
            .tables
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let Some(rows) = tables.get(&Table::Documents) else {
            return Ok(Vec::new());
        };
        let query = Embedding::new(params.embedding.clone());

        let mut scored: Vec<(f64, &Record)> = rows
            .values()
            .filter(|row| params.filter.matches(&row_view(row)))
            .filter_map(|row| {
                let embedding = embedding_of(row)?;
                Some((query.cosine_similarity(&embedding), row))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(params.match_count.unwrap_or(DEFAULT_TOP_K))
            .map(|(similarity, row)| {
                let mut out = row.clone();
                out.remove("embedding");
                out.insert("similarity".to_string(), Value::from(similarity));
                out
            })
            .collect())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn column<'a>(row: &'a Record, name: &str) -> Option<&'a str> {
    row.get(name).and_then(Value::as_str)
}

fn row_view(row: &Record) -> RowView<'_> {
    RowView {
        document_id: column(row, "document_id"),
        source: column(row, "source"),
        source_id: column(row, "source_id"),
        author: column(row, "author"),
        created_at: column(row, "created_at"),
    }
}

fn embedding_of(row: &Record) -> Option<Vec<f32>> {
    row.get("embedding")?
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// SQL `LIKE` matching: `%` is any run of characters, `_` exactly one.
pub(crate) fn like_matches(pattern: &str, value: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let v: Vec<char> = value.chars().collect();
    // dp[j]: pattern prefix of length i matches value prefix of length j
    let mut dp = vec![false; v.len() + 1];
    dp[0] = true;

    for &pc in &p {
        let mut next = vec![false; v.len() + 1];
        if pc == '%' {
            let mut seen = false;
            for j in 0..=v.len() {
                seen |= dp[j];
                next[j] = seen;
            }
        } else {
            for j in 1..=v.len() {
                next[j] = dp[j - 1] && (pc == '_' || pc == v[j - 1]);
            }
        }
        dp = next;
    }

    dp[v.len()]
}

#[async_trait]
impl BackendClient for InMemoryBackend {
    async fn upsert(&self, table: Table, record: Record) -> Result<(), DomainError> {
        let id = Self::record_id(&record)?;
        self.with_rows(table, |rows| {
            rows.insert(id, record);
        })
    }

    async fn update(&self, table: Table, record: Record) -> Result<(), DomainError> {
        let id = Self::record_id(&record)?;
        self.with_rows(table, |rows| {
            if let Some(existing) = rows.get_mut(&id) {
                existing.extend(record);
            }
        })
    }

    async fn rpc(&self, procedure: &RemoteProcedure) -> Result<Vec<Record>, DomainError> {
        match procedure {
            RemoteProcedure::MatchPageSections(params) => self.match_page_sections(params),
        }
    }

    async fn delete_like(
        &self,
        table: Table,
        column_name: &str,
        pattern: &str,
    ) -> Result<(), DomainError> {
        self.with_rows(table, |rows| {
            rows.retain(|_, row| !column(row, column_name).is_some_and(|v| like_matches(pattern, v)));
        })
    }

    async fn delete_in(
        &self,
        table: Table,
        column_name: &str,
        ids: &[String],
    ) -> Result<(), DomainError> {
        self.with_rows(table, |rows| {
            rows.retain(|_, row| {
                !column(row, column_name).is_some_and(|v| ids.iter().any(|id| id == v))
            });
        })
    }

    async fn delete_by_filters(
        &self,
        table: Table,
        filter: &FilterParams,
    ) -> Result<(), DomainError> {
        self.with_rows(table, |rows| {
            rows.retain(|_, row| !filter.matches(&row_view(row)));
        })
    }

    async fn get_by_id(
        &self,
        table: Table,
        id: &str,
        columns: Option<&[&str]>,
    ) -> Result<Vec<Record>, DomainError> {
        let tables = self
            .tables
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let Some(row) = tables.get(&table).and_then(|rows| rows.get(id)) else {
            return Ok(Vec::new());
        };

        let projected = match columns {
            Some(columns) => row
                .iter()
                .filter(|(k, _)| columns.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => row.clone(),
        };
        Ok(vec![projected])
    }
}
