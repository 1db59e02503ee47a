//! Append-only vector memory persisted as a single JSON array.
//!
//! Storage location: `~/.archie/memory-vectors.json`
//!
//! Records are loaded into memory on creation and the whole array is
//! rewritten on every mutation. Embedding goes through the [`Provider`]
//! seam so tests can supply deterministic vectors.

use archie_core::error::MemoryError;
use archie_core::memory::MemoryRecord;
use archie_core::provider::{EmbeddingRequest, Provider};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::snapshot::{self, Snapshot};
use crate::vector::rank_by_similarity;

pub struct VectorStore {
    path: PathBuf,
    provider: Arc<dyn Provider>,
    model: String,
    records: RwLock<Vec<MemoryRecord>>,
    /// The file on disk failed to parse and has not been moved aside yet.
    corrupt_on_disk: AtomicBool,
}

impl VectorStore {
    /// Open the store at `path`, loading any records already there.
    ///
    /// A missing or unreadable file starts empty. A corrupt file is kept and
    /// renamed to `.corrupt` before the first write replaces it. Records whose
    /// dimension differs from the first one are dropped with a warning.
    pub fn new(path: PathBuf, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        let (records, corrupt) = match snapshot::read::<MemoryRecord>(&path) {
            Ok(Snapshot::Loaded(records)) => (Self::same_dimension(records), false),
            Ok(Snapshot::Missing) => (Vec::new(), false),
            Ok(Snapshot::Corrupt(reason)) => {
                warn!(path = %path.display(), error = %reason, "Corrupted vector memory, starting empty");
                (Vec::new(), true)
            }
            Err(e) => {
                warn!(error = %e, "Vector memory unreadable, starting empty");
                (Vec::new(), false)
            }
        };
        debug!(path = %path.display(), count = records.len(), "Vector memory loaded");
        Self {
            path,
            provider,
            model: model.into(),
            records: RwLock::new(records),
            corrupt_on_disk: AtomicBool::new(corrupt),
        }
    }

    fn same_dimension(records: Vec<MemoryRecord>) -> Vec<MemoryRecord> {
        let Some(expected) = records.first().map(MemoryRecord::dimension) else {
            return records;
        };
        let before = records.len();
        let records: Vec<_> = records
            .into_iter()
            .filter(|r| r.dimension() == expected)
            .collect();
        if records.len() < before {
            warn!(
                dropped = before - records.len(),
                dimension = expected,
                "Dropped memory records with mismatched embedding dimension"
            );
        }
        records
    }

    /// Callers hold the records write lock.
    async fn flush(&self, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        if self.corrupt_on_disk.load(Ordering::Acquire) {
            let moved = snapshot::preserve_corrupt(&self.path)
                .map_err(|e| MemoryError::Storage(e.to_string()))?;
            warn!(preserved = %moved.display(), "Corrupted vector memory moved aside");
            self.corrupt_on_disk.store(false, Ordering::Release);
        }
        snapshot::write(&self.path, records).map_err(|e| MemoryError::Storage(e.to_string()))
    }

    /// Embed `text` with the configured embedding model.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let vector = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                input: text.to_string(),
            })
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;
        if vector.is_empty() {
            return Err(MemoryError::Embedding("empty embedding vector".into()));
        }
        Ok(vector)
    }

    /// Embed `text` and append it, persisting the whole store.
    ///
    /// On a failed write the in-memory store is left as it was.
    pub async fn try_append(&self, text: &str) -> Result<(), MemoryError> {
        let embedding = self.embed(text).await?;

        let mut records = self.records.write().await;
        if let Some(expected) = records.first().map(MemoryRecord::dimension)
            && expected != embedding.len()
        {
            return Err(MemoryError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }

        records.push(MemoryRecord::new(text, embedding));
        if let Err(e) = self.flush(&records).await {
            records.pop();
            return Err(e);
        }
        debug!(count = records.len(), "Memory appended");
        Ok(())
    }

    /// Best-effort append: failures are logged and the store is unchanged.
    pub async fn append(&self, text: &str) -> bool {
        match self.try_append(text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Memory append skipped");
                false
            }
        }
    }

    /// Texts of the `top_k` records most similar to `prompt`, best first.
    ///
    /// Returns an empty list when the store is empty or embedding fails.
    pub async fn query(&self, prompt: &str, top_k: usize) -> Vec<String> {
        let records = self.records.read().await;
        if records.is_empty() || top_k == 0 {
            return Vec::new();
        }
        drop(records);

        let query = match self.embed(prompt).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Memory recall skipped");
                return Vec::new();
            }
        };

        let records = self.records.read().await;
        rank_by_similarity(&records, &query, top_k)
            .into_iter()
            .map(|(_, r)| r.text.clone())
            .collect()
    }

    /// Like [`VectorStore::query`] but keeps the similarity scores.
    pub async fn search(&self, prompt: &str, top_k: usize) -> Result<Vec<(f32, String)>, MemoryError> {
        let query = self.embed(prompt).await?;
        let records = self.records.read().await;
        Ok(rank_by_similarity(&records, &query, top_k)
            .into_iter()
            .map(|(score, r)| (score, r.text.clone()))
            .collect())
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of all records in insertion order.
    pub async fn records(&self) -> Vec<MemoryRecord> {
        self.records.read().await.clone()
    }

    /// Drop every record. Irreversible.
    pub async fn clear(&self) -> Result<(), MemoryError> {
        let mut records = self.records.write().await;
        self.flush(&[]).await?;
        records.clear();
        Ok(())
    }
}
