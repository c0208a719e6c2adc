use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, GetPointsBuilder,
    PointId, PointStruct, PointsIdsList, Range, SearchPointsBuilder, SetPayloadPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::ports::{BackendClient, MatchParams, RemoteProcedure, Table};
use crate::domain::serialization::{parse_timestamp, Record};
use crate::domain::{DomainError, FilterParams, DEFAULT_TOP_K};

const BACKEND: &str = "qdrant";
/// Numeric mirror of `created_at` used for range filtering.
const CREATED_AT_TS: &str = "created_at_ts";
/// Commands carry no embedding; their collection stores a fixed one-dim vector.
const PLACEHOLDER_VECTOR: [f32; 1] = [1.0];

/// Qdrant-backed store with one collection per table.
///
/// Qdrant only accepts UUID or integer point ids, so string ids are mapped
/// to a UUID (v5 of the id unless it already is one) and the original id is
/// kept in the payload.
pub struct QdrantBackend {
    client: Qdrant,
    collection_prefix: String,
    dimension: usize,
}

impl QdrantBackend {
    pub async fn new(
        url: &str,
        collection_prefix: &str,
        dimension: usize,
    ) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url).build().map_err(map_err)?;

        let backend = Self {
            client,
            collection_prefix: collection_prefix.to_string(),
            dimension,
        };

        backend
            .ensure_collection(Table::Documents, backend.dimension)
            .await?;
        backend
            .ensure_collection(Table::Commands, PLACEHOLDER_VECTOR.len())
            .await?;

        Ok(backend)
    }

    fn collection(&self, table: Table) -> String {
        format!("{}_{}", self.collection_prefix, table.as_str())
    }

    async fn ensure_collection(&self, table: Table, dimension: usize) -> Result<(), DomainError> {
        let name = self.collection(table);
        let collections = self.client.list_collections().await.map_err(map_err)?;

        let exists = collections.collections.iter().any(|c| c.name == name);

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&name).vectors_config(VectorParamsBuilder::new(
                        dimension as u64,
                        Distance::Cosine,
                    )),
                )
                .await
                .map_err(map_err)?;
            tracing::info!(collection = %name, dimension, "created qdrant collection");
        }

        Ok(())
    }

    fn point_id(id: &str) -> PointId {
        let uuid = Uuid::parse_str(id)
            .unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()));
        PointId::from(uuid.to_string())
    }

    fn record_id(record: &Record) -> Result<String, DomainError> {
        record
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DomainError::validation("record has no string id"))
    }

    fn vector_of(table: Table, record: &mut Record) -> Result<Vec<f32>, DomainError> {
        if table == Table::Commands {
            return Ok(PLACEHOLDER_VECTOR.to_vec());
        }

        record
            .remove("embedding")
            .and_then(|v| {
                v.as_array()?
                    .iter()
                    .map(|x| x.as_f64().map(|f| f as f32))
                    .collect::<Option<Vec<f32>>>()
            })
            .ok_or_else(|| DomainError::validation("chunk has no embedding"))
    }

    fn to_payload(record: Record) -> Result<Payload, DomainError> {
        Payload::try_from(Value::Object(record))
            .map_err(|_| DomainError::internal("Failed to create payload"))
    }

    fn conditions(filter: &FilterParams) -> Vec<Condition> {
        let mut conditions = Vec::new();

        let keywords = [
            ("document_id", filter.document_id.clone()),
            ("source", filter.source.map(|s| s.as_str().to_string())),
            ("source_id", filter.source_id.clone()),
            ("author", filter.author.clone()),
        ];
        for (field, value) in keywords {
            if let Some(value) = value {
                conditions.push(Condition::matches(field, value));
            }
        }

        if filter.start_date.is_some() || filter.end_date.is_some() {
            conditions.push(Condition::range(
                CREATED_AT_TS,
                Range {
                    gte: filter.start_date.map(|ts| ts.timestamp() as f64),
                    lte: filter.end_date.map(|ts| ts.timestamp() as f64),
                    ..Default::default()
                },
            ));
        }

        conditions
    }

    async fn search(&self, params: &MatchParams) -> Result<Vec<Record>, DomainError> {
        let limit = params.match_count.unwrap_or(DEFAULT_TOP_K) as u64;
        let mut request = SearchPointsBuilder::new(
            self.collection(Table::Documents),
            params.embedding.clone(),
            limit,
        )
        .with_payload(true);

        let conditions = Self::conditions(&params.filter);
        if !conditions.is_empty() {
            request = request.filter(Filter::must(conditions));
        }

        let response = self.client.search_points(request).await.map_err(map_err)?;

        Ok(response
            .result
            .into_iter()
            .map(|point| {
                let mut row = payload_to_record(point.payload);
                row.remove(CREATED_AT_TS);
                row.insert("similarity".to_string(), Value::from(f64::from(point.score)));
                row
            })
            .collect())
    }

    async fn delete_matching(&self, table: Table, filter: Filter) -> Result<(), DomainError> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(self.collection(table))
                    .points(filter)
                    .wait(true),
            )
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn fetch(&self, table: Table, id: &str) -> Result<Option<Record>, DomainError> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(self.collection(table), vec![Self::point_id(id)])
                    .with_payload(true),
            )
            .await
            .map_err(map_err)?;

        Ok(response
            .result
            .into_iter()
            .next()
            .map(|point| payload_to_record(point.payload)))
    }
}

fn map_err(e: QdrantError) -> DomainError {
    DomainError::backend(BACKEND, e.to_string())
}

fn payload_to_record(payload: HashMap<String, QdrantValue>) -> Record {
    payload
        .into_iter()
        .map(|(k, v)| (k, qdrant_to_json(v)))
        .collect()
}

fn qdrant_to_json(value: QdrantValue) -> Value {
    match value.kind {
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::from(i),
        Some(Kind::DoubleValue(d)) => Value::from(d),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(qdrant_to_json).collect())
        }
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_to_json(v)))
                .collect(),
        ),
        Some(Kind::NullValue(_)) | None => Value::Null,
    }
}

#[async_trait]
impl BackendClient for QdrantBackend {
    async fn upsert(&self, table: Table, mut record: Record) -> Result<(), DomainError> {
        let id = Self::record_id(&record)?;
        let vector = Self::vector_of(table, &mut record)?;

        if let Some(created_at) = record.get("created_at").and_then(Value::as_str) {
            let ts = parse_timestamp(created_at)?.timestamp();
            record.insert(CREATED_AT_TS.to_string(), Value::from(ts));
        }

        let point = PointStruct::new(Self::point_id(&id), vector, Self::to_payload(record)?);

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection(table), vec![point]).wait(true))
            .await
            .map_err(map_err)?;

        Ok(())
    }

    async fn update(&self, table: Table, record: Record) -> Result<(), DomainError> {
        let id = Self::record_id(&record)?;
        if self.fetch(table, &id).await?.is_none() {
            tracing::debug!(table = %table, id = %id, "update skipped, no such row");
            return Ok(());
        }

        self.client
            .set_payload(
                SetPayloadPointsBuilder::new(self.collection(table), Self::to_payload(record)?)
                    .points_selector(PointsIdsList {
                        ids: vec![Self::point_id(&id)],
                    })
                    .wait(true),
            )
            .await
            .map_err(map_err)?;

        Ok(())
    }

    async fn rpc(&self, procedure: &RemoteProcedure) -> Result<Vec<Record>, DomainError> {
        match procedure {
            RemoteProcedure::MatchPageSections(params) => self.search(params).await,
        }
    }

    async fn delete_like(
        &self,
        table: Table,
        column: &str,
        pattern: &str,
    ) -> Result<(), DomainError> {
        let filter = if pattern.chars().all(|c| c == '%') && !pattern.is_empty() {
            Filter::must_not([Condition::is_empty(column)])
        } else if !pattern.contains(['%', '_']) {
            Filter::must([Condition::matches(column, pattern.to_string())])
        } else {
            return Err(DomainError::backend(
                BACKEND,
                format!("unsupported LIKE pattern: {pattern}"),
            ));
        };

        self.delete_matching(table, filter).await
    }

    async fn delete_in(&self, table: Table, column: &str, ids: &[String]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.delete_matching(table, Filter::must([Condition::matches(column, ids.to_vec())]))
            .await
    }

    async fn delete_by_filters(
        &self,
        table: Table,
        filter: &FilterParams,
    ) -> Result<(), DomainError> {
        let conditions = Self::conditions(filter);
        if conditions.is_empty() {
            return self.delete_like(table, "id", "%").await;
        }
        self.delete_matching(table, Filter::must(conditions)).await
    }

    async fn get_by_id(
        &self,
        table: Table,
        id: &str,
        columns: Option<&[&str]>,
    ) -> Result<Vec<Record>, DomainError> {
        let Some(mut row) = self.fetch(table, id).await? else {
            return Ok(Vec::new());
        };

        row.remove(CREATED_AT_TS);
        if let Some(columns) = columns {
            row.retain(|k, _| columns.contains(&k.as_str()));
        }
        Ok(vec![row])
    }
}
