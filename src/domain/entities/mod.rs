mod command;
mod document;
mod embedding;

pub use command::{Command, CommandContent, CommandStatus, CommandType, CommandWithContent};
pub use document::{
    Document, DocumentChunk, DocumentChunkMetadata, DocumentChunkWithScore, DocumentMetadata,
    DocumentMetadataFilter, DocumentWithChunks, Query, QueryResult, QueryWithEmbedding, Source,
    DEFAULT_TOP_K,
};
pub use embedding::Embedding;
