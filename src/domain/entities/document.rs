use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    Email,
    File,
    Chat,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::File => "FILE",
            Self::Chat => "CHAT",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Free-form date string; normalized when written to a backend.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunkMetadata {
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
}

impl DocumentChunkMetadata {
    /// Fills every unset field from the owning document's metadata.
    pub fn inherit(mut self, parent: &DocumentMetadata) -> Self {
        self.source = self.source.or(parent.source);
        self.source_id = self.source_id.or_else(|| parent.source_id.clone());
        self.url = self.url.or_else(|| parent.url.clone());
        self.created_at = self.created_at.or_else(|| parent.created_at.clone());
        self.author = self.author.or_else(|| parent.author.clone());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub metadata: DocumentChunkMetadata,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            metadata: DocumentChunkMetadata::default(),
            embedding: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: DocumentChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunkWithScore {
    #[serde(flatten)]
    pub chunk: DocumentChunk,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub metadata: Option<DocumentMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentWithChunks {
    #[serde(flatten)]
    pub document: Document,
    pub chunks: Vec<DocumentChunk>,
}

impl DocumentWithChunks {
    /// Assigns the document id and chunk ids where absent and stamps every
    /// chunk with its owning document.
    ///
    /// Returns the document id together with its prepared chunks.
    pub fn into_chunks(self) -> (String, Vec<DocumentChunk>) {
        let document_id = self
            .document
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let parent = self.document.metadata.unwrap_or_default();

        let chunks = self
            .chunks
            .into_iter()
            .enumerate()
            .map(|(index, mut chunk)| {
                if chunk.id.as_deref().map_or(true, str::is_empty) {
                    chunk.id = Some(format!("{document_id}_{index}"));
                }
                chunk.metadata = chunk.metadata.inherit(&parent);
                chunk.metadata.document_id = Some(document_id.clone());
                chunk
            })
            .collect();

        (document_id, chunks)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadataFilter {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub query: String,
    #[serde(default)]
    pub filter: Option<DocumentMetadataFilter>,
    #[serde(default = "default_top_k")]
    pub top_k: Option<usize>,
}

fn default_top_k() -> Option<usize> {
    Some(DEFAULT_TOP_K)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryWithEmbedding {
    #[serde(flatten)]
    pub query: Query,
    pub embedding: Vec<f32>,
}

impl QueryWithEmbedding {
    pub fn new(query: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            query: Query {
                query: query.into(),
                filter: None,
                top_k: Some(DEFAULT_TOP_K),
            },
            embedding,
        }
    }

    pub fn with_filter(mut self, filter: DocumentMetadataFilter) -> Self {
        self.query.filter = Some(filter);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.query.top_k = Some(top_k);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub results: Vec<DocumentChunkWithScore>,
}

impl QueryResult {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_chunks_assigns_ids() {
        let doc = DocumentWithChunks {
            document: Document {
                id: Some("doc-1".to_string()),
                text: "body".to_string(),
                metadata: Some(DocumentMetadata {
                    author: Some("ada".to_string()),
                    ..Default::default()
                }),
            },
            chunks: vec![
                DocumentChunk::new("first"),
                DocumentChunk::new("second").with_id("keep-me"),
            ],
        };

        let (document_id, chunks) = doc.into_chunks();

        assert_eq!(document_id, "doc-1");
        assert_eq!(chunks[0].id.as_deref(), Some("doc-1_0"));
        assert_eq!(chunks[1].id.as_deref(), Some("keep-me"));
        assert!(chunks
            .iter()
            .all(|c| c.metadata.document_id.as_deref() == Some("doc-1")));
        assert_eq!(chunks[0].metadata.author.as_deref(), Some("ada"));
    }

    #[test]
    fn test_into_chunks_generates_document_id() {
        let doc = DocumentWithChunks {
            document: Document {
                id: None,
                text: "body".to_string(),
                metadata: None,
            },
            chunks: vec![DocumentChunk::new("only")],
        };

        let (document_id, chunks) = doc.into_chunks();

        assert!(Uuid::parse_str(&document_id).is_ok());
        assert_eq!(chunks[0].id, Some(format!("{document_id}_0")));
    }

    #[test]
    fn test_query_defaults_top_k() {
        let query: Query = serde_json::from_str(r#"{"query": "notes"}"#).unwrap();
        assert_eq!(query.top_k, Some(DEFAULT_TOP_K));
        assert!(query.filter.is_none());
    }

    #[test]
    fn test_source_serializes_upper_case() {
        let json = serde_json::to_string(&Source::Email).unwrap();
        assert_eq!(json, "\"EMAIL\"");
        assert_eq!(Source::Chat.as_str(), "CHAT");
    }
}
