//! Long-horizon memory record.
//!
//! A memory record is a digest of a day's conversation together with its
//! embedding vector. The store holding them is append-only and queried by
//! cosine similarity.

use serde::{Deserialize, Serialize};

/// A single `(summary text, embedding)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// The digest text injected into the system prompt on recall
    pub text: String,

    /// Fixed-length embedding; all records in a store share the dimension
    pub embedding: Vec<f32>,
}

impl MemoryRecord {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }

    /// Embedding dimensionality.
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}
