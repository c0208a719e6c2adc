//! Translation of metadata filters into backend predicates.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::domain::serialization::{canonical_timestamp, parse_timestamp};
use crate::domain::{DocumentMetadataFilter, Result, Source};

/// Predicates of a [`DocumentMetadataFilter`] that are actually present.
///
/// Every populated field constrains the result; absent fields are never
/// serialized. The serialized names are the parameter names of the
/// similarity procedure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterParams {
    #[serde(rename = "in_document_id", skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(rename = "in_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(rename = "in_source_id", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(rename = "in_author", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(
        rename = "in_start_date",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_timestamp"
    )]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(
        rename = "in_end_date",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_timestamp"
    )]
    pub end_date: Option<DateTime<Utc>>,
}

impl FilterParams {
    pub fn from_filter(filter: &DocumentMetadataFilter) -> Result<Self> {
        Ok(Self {
            document_id: present(&filter.document_id),
            source: filter.source,
            source_id: present(&filter.source_id),
            author: present(&filter.author),
            start_date: present(&filter.start_date)
                .map(|date| parse_timestamp(&date))
                .transpose()?,
            end_date: present(&filter.end_date)
                .map(|date| parse_timestamp(&date))
                .transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Whether a row with the given column values satisfies every predicate.
    ///
    /// `created_at` is compared inclusively against the date range; a row
    /// without a parseable `created_at` fails any range predicate.
    pub fn matches(&self, row: &RowView<'_>) -> bool {
        fn eq(expected: &Option<String>, actual: Option<&str>) -> bool {
            expected.as_deref().map_or(true, |e| actual == Some(e))
        }

        if !eq(&self.document_id, row.document_id)
            || !eq(&self.source_id, row.source_id)
            || !eq(&self.author, row.author)
        {
            return false;
        }
        if let Some(source) = self.source {
            if row.source != Some(source.as_str()) {
                return false;
            }
        }
        if self.start_date.is_none() && self.end_date.is_none() {
            return true;
        }

        let Some(created_at) = row.created_at.and_then(|c| parse_timestamp(c).ok()) else {
            return false;
        };
        self.start_date.map_or(true, |start| created_at >= start)
            && self.end_date.map_or(true, |end| created_at <= end)
    }
}

/// Borrowed view over the filterable columns of a stored chunk row.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowView<'a> {
    pub document_id: Option<&'a str>,
    pub source: Option<&'a str>,
    pub source_id: Option<&'a str>,
    pub author: Option<&'a str>,
    pub created_at: Option<&'a str>,
}

/// The single mode a delete call runs in.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteSelector {
    All,
    Ids(Vec<String>),
    Filter(DocumentMetadataFilter),
}

impl DeleteSelector {
    /// Picks one mode with precedence delete-all, then ids, then filter.
    /// Returns `None` when nothing usable was supplied.
    pub fn resolve(
        ids: Option<Vec<String>>,
        filter: Option<DocumentMetadataFilter>,
        delete_all: bool,
    ) -> Option<Self> {
        if delete_all {
            return Some(Self::All);
        }
        match ids {
            Some(ids) if !ids.is_empty() => Some(Self::Ids(ids)),
            _ => filter.map(Self::Filter),
        }
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

fn serialize_timestamp<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(ts) => serializer.serialize_str(&canonical_timestamp(ts)),
        None => serializer.serialize_none(),
    }
}
