use super::{
    GENERATIONS_DIR, LoadedIndex, MANIFEST_FILE, MAPPING_FILE, Manifest, VECTORS_FILE, vector_file,
};
use crate::error::{Result, RetrieverError, UnavailableReason};
use crate::retrieval::index_builder::BuiltIndex;
use chrono::Utc;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Generations kept on disk: the active one plus its predecessor, which
/// in-flight readers may still be using.
const RETAINED_GENERATIONS: usize = 2;

fn checksum(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Reads and writes index generations under one index directory.
///
/// All methods do blocking file IO; async callers run them on the blocking pool.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn generation_dir(&self, generation_id: &str) -> PathBuf {
        self.root.join(GENERATIONS_DIR).join(generation_id)
    }

    /// The active manifest, or `None` when nothing has been built yet.
    pub fn read_manifest(&self) -> Result<Option<Manifest>> {
        let bytes = match fs::read(self.manifest_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let manifest = serde_json::from_slice(&bytes)
            .map_err(|e| RetrieverError::corrupt(format!("manifest: {e}")))?;
        Ok(Some(manifest))
    }

    /// Writes `built` as a new generation and makes it the active one.
    pub fn persist(&self, built: BuiltIndex, chunk_size: usize, embedding_model: &str) -> Result<LoadedIndex> {
        let generations = self.root.join(GENERATIONS_DIR);
        fs::create_dir_all(&generations)?;

        let vectors = vector_file::encode(&built.index);
        let mapping = serde_json::to_vec(&built.mapping)?;
        let vectors_checksum = checksum(&vectors);
        let mapping_checksum = checksum(&mapping);

        let created_at = Utc::now();
        let sequence = self
            .generation_sequences()?
            .into_iter()
            .map(|(seq, _)| seq)
            .max()
            .unwrap_or(0)
            + 1;
        let generation_id = format!("{sequence:08}-{}", &vectors_checksum[..12]);

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&generations)?;
        fs::write(staging.path().join(VECTORS_FILE), &vectors)?;
        fs::write(staging.path().join(MAPPING_FILE), &mapping)?;

        let final_dir = self.generation_dir(&generation_id);
        if final_dir.exists() {
            tracing::debug!("Generation {} already on disk", generation_id);
        } else {
            fs::rename(staging.path(), &final_dir)?;
        }

        let manifest = Manifest {
            generation_id: generation_id.clone(),
            sequence,
            created_at,
            chunk_count: built.mapping.len(),
            dimension: built.index.dimension(),
            chunk_size,
            embedding_model: embedding_model.to_string(),
            vectors_checksum,
            mapping_checksum,
            documents: built.documents,
        };
        self.write_manifest(&manifest)?;
        tracing::info!(
            "Activated generation {} ({} chunks, dimension {})",
            generation_id,
            manifest.chunk_count,
            manifest.dimension
        );

        if let Err(e) = self.prune(&generation_id) {
            tracing::warn!("Failed to prune old generations: {}", e);
        }

        Ok(LoadedIndex::new(built.index, built.mapping)?.with_manifest(manifest))
    }

    fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&serde_json::to_vec_pretty(manifest)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.manifest_path()).map_err(|e| e.error)?;
        Ok(())
    }

    /// Generation directories on disk with their sequence numbers, oldest first.
    fn generation_sequences(&self) -> Result<Vec<(u64, String)>> {
        let generations = self.root.join(GENERATIONS_DIR);
        let entries = match fs::read_dir(&generations) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found: Vec<(u64, String)> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| {
                let (seq, _) = name.split_once('-')?;
                Some((seq.parse().ok()?, name))
            })
            .collect();
        found.sort();
        Ok(found)
    }

    /// Removes all but the newest retained generations. `active` is never
    /// removed.
    pub fn prune(&self, active: &str) -> Result<usize> {
        let found = self.generation_sequences()?;
        let stale = found.len().saturating_sub(RETAINED_GENERATIONS);

        let mut removed = 0;
        for (_, id) in &found[..stale] {
            if id == active {
                continue;
            }
            fs::remove_dir_all(self.generation_dir(id))?;
            tracing::debug!("Pruned generation {}", id);
            removed += 1;
        }
        Ok(removed)
    }

    /// Loads and verifies the active generation.
    pub fn load(&self) -> Result<LoadedIndex> {
        let manifest = self
            .read_manifest()?
            .ok_or(RetrieverError::unavailable(UnavailableReason::NotFound))?;
        self.load_generation(manifest)
    }

    fn read_artifact(dir: &Path, name: &str) -> Result<Vec<u8>> {
        fs::read(dir.join(name)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RetrieverError::corrupt(format!("{name} is missing")),
            _ => e.into(),
        })
    }

    pub fn load_generation(&self, manifest: Manifest) -> Result<LoadedIndex> {
        let dir = self.generation_dir(&manifest.generation_id);
        let vectors = Self::read_artifact(&dir, VECTORS_FILE)?;
        let mapping = Self::read_artifact(&dir, MAPPING_FILE)?;

        if checksum(&vectors) != manifest.vectors_checksum {
            return Err(UnavailableReason::ChecksumMismatch {
                artifact: VECTORS_FILE.to_string(),
            }
            .into());
        }
        if checksum(&mapping) != manifest.mapping_checksum {
            return Err(UnavailableReason::ChecksumMismatch {
                artifact: MAPPING_FILE.to_string(),
            }
            .into());
        }

        let index = vector_file::decode(&vectors)?;
        let mapping: Vec<String> = serde_json::from_slice(&mapping)
            .map_err(|e| RetrieverError::corrupt(format!("{MAPPING_FILE}: {e}")))?;

        if index.dimension() != manifest.dimension {
            return Err(UnavailableReason::DimensionMismatch {
                expected: manifest.dimension,
                actual: index.dimension(),
            }
            .into());
        }
        if index.len() != manifest.chunk_count {
            return Err(UnavailableReason::LengthMismatch {
                vectors: index.len(),
                texts: manifest.chunk_count,
            }
            .into());
        }

        tracing::info!(
            "Loaded index generation {} ({} chunks, dimension {})",
            manifest.generation_id,
            mapping.len(),
            index.dimension()
        );
        Ok(LoadedIndex::new(index, mapping)?.with_manifest(manifest))
    }
}
