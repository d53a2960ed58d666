//! Splitting documents into the units handed to a provider.

use crate::types::{Document, DocumentChunk};

/// Turns a stored document into an ordered list of chunks.
pub trait DocumentChunker: Send + Sync {
    fn chunk(&self, document: &Document) -> Vec<DocumentChunk>;
}

/// Treats the whole document as a single chunk carrying the document's metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeDocumentChunker;

impl DocumentChunker for WholeDocumentChunker {
    fn chunk(&self, document: &Document) -> Vec<DocumentChunk> {
        vec![DocumentChunk {
            content: document.content.clone(),
            metadata: document.metadata.clone(),
        }]
    }
}
