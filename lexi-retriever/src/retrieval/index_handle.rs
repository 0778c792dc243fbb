//! Shared access to the active index.

use crate::error::{Result, UnavailableReason};
use crate::storage::{LoadedIndex, Manifest};
use crate::storage::artifact_store::ArtifactStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Holds the index that queries run against.
///
/// A query calls [`snapshot`](Self::snapshot) once and keeps the returned
/// `Arc` until it is done. Swapping in a new generation replaces the pointer
/// without touching the old `LoadedIndex`, so a query never sees vectors from
/// one generation paired with texts from another.
#[derive(Debug)]
pub struct IndexHandle {
    store: Option<ArtifactStore>,
    current: RwLock<Option<Arc<LoadedIndex>>>,
    loads: AtomicUsize,
}

impl IndexHandle {
    /// A handle backed by the index directory of `store`. Nothing is read
    /// until the first snapshot.
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store: Some(store),
            current: RwLock::new(None),
            loads: AtomicUsize::new(0),
        }
    }

    /// A handle serving `index` with no backing store.
    pub fn in_memory(index: LoadedIndex) -> Self {
        Self {
            store: None,
            current: RwLock::new(Some(Arc::new(index))),
            loads: AtomicUsize::new(0),
        }
    }

    /// Number of times a generation has been read from disk.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn store(&self) -> Option<&ArtifactStore> {
        self.store.as_ref()
    }

    /// The current index, loading or reloading it when the manifest names a
    /// different generation than the one held.
    pub async fn snapshot(&self) -> Result<Arc<LoadedIndex>> {
        let Some(store) = self.store.clone() else {
            return self
                .current
                .read()
                .await
                .clone()
                .ok_or_else(|| UnavailableReason::NotFound.into());
        };

        let manifest = {
            let store = store.clone();
            tokio::task::spawn_blocking(move || store.read_manifest()).await??
        };
        let Some(manifest) = manifest else {
            tracing::error!(
                "No index manifest under {}; build the index first",
                store.root().display()
            );
            return Err(UnavailableReason::NotFound.into());
        };

        if let Some(current) = self.current.read().await.as_ref() {
            if current.generation_id() == Some(manifest.generation_id.as_str()) {
                return Ok(Arc::clone(current));
            }
        }

        self.load_latest(store, manifest).await
    }

    /// Loads the generation the manifest names now. `seen` is the manifest
    /// read before taking the lock; a newer generation may have been
    /// activated, and `seen` pruned, while waiting for it.
    async fn load_latest(&self, store: ArtifactStore, seen: Manifest) -> Result<Arc<LoadedIndex>> {
        let mut slot = self.current.write().await;
        if let Some(current) = slot.as_ref() {
            if current.generation_id() == Some(seen.generation_id.as_str()) {
                return Ok(Arc::clone(current));
            }
        }

        let manifest = {
            let store = store.clone();
            tokio::task::spawn_blocking(move || store.read_manifest()).await??
        }
        .ok_or(UnavailableReason::NotFound)?;
        if manifest.generation_id != seen.generation_id {
            tracing::debug!(
                "Manifest moved from {} to {} while waiting to load",
                seen.generation_id,
                manifest.generation_id
            );
            if let Some(current) = slot.as_ref() {
                if current.generation_id() == Some(manifest.generation_id.as_str()) {
                    return Ok(Arc::clone(current));
                }
            }
        }

        let generation = manifest.generation_id.clone();
        let loaded = tokio::task::spawn_blocking(move || store.load_generation(manifest))
            .await?
            .inspect_err(|e| tracing::error!("Index generation {} unavailable: {}", generation, e))?;

        self.loads.fetch_add(1, Ordering::Relaxed);
        let loaded = Arc::new(loaded);
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Replaces the served index with `index`.
    pub async fn install(&self, index: LoadedIndex) -> Arc<LoadedIndex> {
        let index = Arc::new(index);
        *self.current.write().await = Some(Arc::clone(&index));
        tracing::info!(
            "Installed index generation {} ({} chunks)",
            index.generation_id().unwrap_or("in-memory"),
            index.len()
        );
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrieverError;
    use crate::retrieval::index_builder::BuiltIndex;
    use crate::retrieval::vector_index::FlatIndex;
    use tempfile::tempdir;

    fn built(texts: &[&str]) -> BuiltIndex {
        let mut index = FlatIndex::new(1);
        for (i, _) in texts.iter().enumerate() {
            index.add(&[i as f32]).unwrap();
        }
        BuiltIndex {
            index,
            mapping: texts.iter().map(|t| t.to_string()).collect(),
            documents: vec![],
        }
    }

    #[tokio::test]
    async fn test_missing_index_is_unavailable() {
        let dir = tempdir().unwrap();
        let handle = IndexHandle::new(ArtifactStore::new(dir.path()));

        let err = handle.snapshot().await.unwrap_err();
        assert!(matches!(
            err,
            RetrieverError::IndexUnavailable {
                reason: UnavailableReason::NotFound
            }
        ));
        assert_eq!(handle.load_count(), 0);
    }

    #[tokio::test]
    async fn test_loads_once_and_reloads_on_new_generation() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.persist(built(&["first"]), 300, "hash").unwrap();

        let handle = IndexHandle::new(store.clone());
        let a = handle.snapshot().await.unwrap();
        let b = handle.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(handle.load_count(), 1);

        store.persist(built(&["first", "second"]), 300, "hash").unwrap();
        let c = handle.snapshot().await.unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(handle.load_count(), 2);

        // The old snapshot is untouched by the swap.
        assert_eq!(a.mapping(), ["first"]);
    }

    #[tokio::test]
    async fn test_in_memory_handle() {
        let handle = IndexHandle::in_memory(LoadedIndex::empty(4));
        assert!(handle.snapshot().await.unwrap().is_empty());

        let installed = handle
            .install(LoadedIndex::new(FlatIndex::from_flat(1, vec![0.5]).unwrap(), vec!["x".into()]).unwrap())
            .await;
        let snap = handle.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&installed, &snap));
        assert_eq!(handle.load_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_manifest_read_loads_latest_generation() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.persist(built(&["one"]), 300, "hash").unwrap();
        let stale = store.read_manifest().unwrap().unwrap();
        store.persist(built(&["one", "two"]), 300, "hash").unwrap();
        store.persist(built(&["one", "two", "three"]), 300, "hash").unwrap();
        assert!(!store.generation_dir(&stale.generation_id).exists());

        let handle = IndexHandle::new(store.clone());
        let loaded = handle.load_latest(store.clone(), stale.clone()).await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(handle.load_count(), 1);

        // A second late reader keeps the newer generation already held.
        let again = handle.load_latest(store, stale).await.unwrap();
        assert!(Arc::ptr_eq(&loaded, &again));
        assert_eq!(handle.load_count(), 1);
    }
}
