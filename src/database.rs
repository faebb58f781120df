use crate::config::Number;
use crate::error::{Error, Result};
use crate::vector_entry::{Metadata, RecordId, VectorRecord};
use crate::vector_ops::compute_cosine_similarity_simd;
use bincode::Options;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 8] = b"EMBSTORE";
const FORMAT_VERSION: u32 = 1;
const TMP_EXTENSION: &str = "tmp";

#[derive(Debug, Clone, Copy)]
pub struct SearchMatch<'a> {
    pub record: &'a VectorRecord,
    pub score: Number,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    dimension: Option<usize>,
    records: &'a [VectorRecord],
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    dimension: Option<usize>,
    records: Vec<VectorRecord>,
}

/// Append-only, in-memory collection of embedded text segments.
///
/// The first record added fixes the dimensionality for the lifetime of the
/// store; records are kept in insertion order and never updated or removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorStore {
    dimension: Option<usize>,
    records: Vec<VectorRecord>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[cfg(test)]
    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }

    pub fn add(&mut self, embedding: Vec<Number>, text: impl Into<String>, metadata: Metadata) -> Result<RecordId> {
        let id = new_record_id();
        self.push(VectorRecord {
            id: id.clone(),
            embedding,
            text: text.into(),
            metadata,
        })?;
        Ok(id)
    }

    fn push(&mut self, record: VectorRecord) -> Result<()> {
        let actual = record.embedding.len();
        match self.dimension {
            Some(expected) if expected != actual => {
                return Err(Error::DimensionMismatch { expected, actual });
            }
            None => self.dimension = Some(actual),
            _ => {}
        }
        log::debug!("Added record {} ({} dims)", record.id, actual);
        self.records.push(record);
        Ok(())
    }

    /// Exact cosine-similarity search over every record.
    ///
    /// Matches scoring below `min_score` are dropped; the rest are ordered by
    /// descending score with earlier-inserted records winning ties, and cut to
    /// `max_results`.
    pub fn search(&self, query_embedding: &[Number], max_results: usize, min_score: Number) -> Vec<SearchMatch<'_>> {
        if let Some(expected) = self.dimension {
            if expected != query_embedding.len() {
                log::warn!(
                    "Query has {} dimensions but the store holds {}; no record can match",
                    query_embedding.len(),
                    expected
                );
            }
        }

        let mut matches: Vec<SearchMatch<'_>> = self
            .records
            .iter()
            .filter_map(|record| {
                compute_cosine_similarity_simd(query_embedding, &record.embedding)
                    .map(|score| SearchMatch { record, score })
            })
            .filter(|m| m.score >= min_score)
            .collect();

        // sort_by is stable, so ties keep insertion order
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(max_results);
        log::debug!("Search over {} records returned {} matches", self.records.len(), matches.len());
        matches
    }

    /// Write a full snapshot to `path`, replacing anything already there.
    pub fn serialize(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = tmp_path_for(path);
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            writer.write_all(MAGIC)?;
            let snapshot = SnapshotRef {
                version: FORMAT_VERSION,
                dimension: self.dimension,
                records: &self.records,
            };
            snapshot_options()
                .serialize_into(&mut writer, &snapshot)
                .map_err(|e| Error::Io(std::io::Error::new(ErrorKind::Other, e)))?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        log::info!("Wrote {} records to '{}'", self.records.len(), path.display());
        Ok(())
    }

    pub fn deserialize(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::NotFound(path.to_path_buf())),
            Err(e) => return Err(e.into()),
        };
        if file.metadata()?.len() == 0 {
            return Err(Error::EmptyFile(path.to_path_buf()));
        }

        let mmap = unsafe { Mmap::map(&file)? };
        let store = Self::from_bytes(&mmap)?;
        log::info!("Loaded {} records from '{}'", store.len(), path.display());
        Ok(store)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let payload = bytes
            .strip_prefix(MAGIC.as_slice())
            .ok_or_else(|| Error::CorruptFormat("missing store header".to_string()))?;

        let snapshot: Snapshot =
            snapshot_options().deserialize(payload).map_err(|e| Error::CorruptFormat(e.to_string()))?;
        if snapshot.version != FORMAT_VERSION {
            return Err(Error::CorruptFormat(format!(
                "unsupported format version {} (expected {})",
                snapshot.version, FORMAT_VERSION
            )));
        }

        let mut store = VectorStore::new();
        for record in snapshot.records {
            store.push(record).map_err(|e| Error::CorruptFormat(e.to_string()))?;
        }
        if !store.is_empty() && store.dimension != snapshot.dimension {
            return Err(Error::CorruptFormat(format!(
                "header declares {:?} dimensions but records have {:?}",
                snapshot.dimension, store.dimension
            )));
        }
        Ok(store)
    }

    /// Concatenate `a`'s records followed by `b`'s.
    ///
    /// An empty side is the identity, and merging a store with itself returns
    /// it unchanged. Duplicate content is kept as-is.
    pub fn merge(a: &VectorStore, b: &VectorStore) -> Result<VectorStore> {
        if std::ptr::eq(a, b) || b.is_empty() {
            return Ok(a.clone());
        }
        if a.is_empty() {
            return Ok(b.clone());
        }

        let mut merged = a.clone();
        merged.records.reserve(b.len());
        for record in &b.records {
            merged.push(record.clone())?;
        }
        Ok(merged)
    }

    /// Like [`VectorStore::merge`], with either side possibly absent.
    pub fn merge_optional(a: Option<&VectorStore>, b: Option<&VectorStore>) -> Result<VectorStore> {
        match (a, b) {
            (Some(a), Some(b)) => Self::merge(a, b),
            (Some(only), None) | (None, Some(only)) => Ok(only.clone()),
            (None, None) => Ok(VectorStore::new()),
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(TMP_EXTENSION);
    path.with_file_name(name)
}

/// Fixed-width little-endian encoding; bytes after the snapshot are an error.
fn snapshot_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

fn new_record_id() -> RecordId {
    let bits: u128 = rand::random();
    let hex = format!("{:032x}", bits);
    format!("{}-{}-{}-{}-{}", &hex[0..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..32])
}
