use crate::storage::DocumentEntry;
use crate::storage::artifact_store::ArtifactStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Result of verifying the active generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum IndexHealth {
    /// Manifest present and both artifacts verified
    Healthy,
    /// No index has been built
    Missing,
    /// Artifacts exist but cannot be served
    Unavailable(String),
}

/// Snapshot of the index directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    /// Directory holding the manifest and generations
    pub index_dir: String,
    /// Whether `manifest.json` exists and parses
    pub manifest_present: bool,
    pub generation_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub chunk_count: Option<usize>,
    pub dimension: Option<usize>,
    pub chunk_size: Option<usize>,
    pub embedding_model: Option<String>,
    /// Chunks contributed by each document in the active generation
    pub documents: Vec<DocumentEntry>,
    pub health: IndexHealth,
}

impl IndexStatus {
    /// Reads the manifest and fully verifies the generation it names.
    pub fn collect(store: &ArtifactStore) -> Self {
        let mut status = Self {
            index_dir: store.root().display().to_string(),
            manifest_present: false,
            generation_id: None,
            created_at: None,
            chunk_count: None,
            dimension: None,
            chunk_size: None,
            embedding_model: None,
            documents: Vec::new(),
            health: IndexHealth::Missing,
        };

        let manifest = match store.read_manifest() {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return status,
            Err(e) => {
                status.health = IndexHealth::Unavailable(e.to_string());
                return status;
            }
        };

        status.manifest_present = true;
        status.generation_id = Some(manifest.generation_id.clone());
        status.created_at = Some(manifest.created_at);
        status.chunk_count = Some(manifest.chunk_count);
        status.dimension = Some(manifest.dimension);
        status.chunk_size = Some(manifest.chunk_size);
        status.embedding_model = Some(manifest.embedding_model.clone());
        status.documents = manifest.documents.clone();

        status.health = match store.load_generation(manifest) {
            Ok(_) => IndexHealth::Healthy,
            Err(e) => IndexHealth::Unavailable(e.to_string()),
        };
        status
    }

    /// Async wrapper around [`collect`](Self::collect).
    pub async fn collect_async(store: ArtifactStore) -> Self {
        let index_dir = store.root().display().to_string();
        match tokio::task::spawn_blocking(move || Self::collect(&store)).await {
            Ok(status) => status,
            Err(e) => Self {
                index_dir,
                manifest_present: false,
                generation_id: None,
                created_at: None,
                chunk_count: None,
                dimension: None,
                chunk_size: None,
                embedding_model: None,
                documents: Vec::new(),
                health: IndexHealth::Unavailable(format!("status task failed: {e}")),
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.health == IndexHealth::Healthy
    }

    /// Human readable multi-line summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Index directory: {}", self.index_dir);
        match &self.health {
            IndexHealth::Healthy => {
                let _ = writeln!(out, "Health: healthy");
            }
            IndexHealth::Missing => {
                let _ = writeln!(out, "Health: no index built yet");
                return out;
            }
            IndexHealth::Unavailable(reason) => {
                let _ = writeln!(out, "Health: unavailable ({reason})");
            }
        }
        if let Some(id) = &self.generation_id {
            let _ = writeln!(out, "Generation: {id}");
        }
        if let Some(created_at) = &self.created_at {
            let _ = writeln!(out, "Built: {}", created_at.to_rfc3339());
        }
        if let (Some(chunks), Some(dimension)) = (self.chunk_count, self.dimension) {
            let _ = writeln!(out, "Chunks: {chunks} (dimension {dimension})");
        }
        if let Some(model) = &self.embedding_model {
            let _ = writeln!(out, "Embedding model: {model}");
        }
        if !self.documents.is_empty() {
            let _ = writeln!(out, "Documents:");
            for doc in &self.documents {
                let _ = writeln!(out, "  {} ({} chunks)", doc.id, doc.chunks);
            }
        }
        out
    }
}
