// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Durable storage of a built road network.
//!
//! A cache directory holds the graph blob (`road_graph.bin`) and the region index
//! directory (`region_index/`) with exactly two files: `index.dat` with the index
//! entries and `index.idx` with the structural header. A cache is only usable
//! if all three files are present, non-empty and agree with each other.
//!
//! All files are read into memory and closed before validation, and written
//! through a temporary file which is renamed into place, so no file handle
//! outlives a [Cache] call.

mod error;
mod format;
mod retry;

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::region::EdgeBox;
use crate::{BoundingBox, Graph, RegionIndex};

pub use error::{CacheError, Corruption};
pub use format::FORMAT_VERSION;
pub use retry::RetryPolicy;

use format::{IndexHeader, DATA_MAGIC, GRAPH_MAGIC, INDEX_MAGIC};

const GRAPH_FILE: &str = "road_graph.bin";
const INDEX_DIR: &str = "region_index";
const INDEX_DATA_FILE: &str = "index.dat";
const INDEX_HEADER_FILE: &str = "index.idx";

/// Persistence manager for a [Graph] and its [RegionIndex].
///
/// Calls are not synchronized: [Cache::save] and [Cache::purge] must not run
/// concurrently with any other call on the same directory. [Engine](crate::Engine)
/// serializes them for the caches it manages.
#[derive(Debug, Clone)]
pub struct Cache {
    graph_path: PathBuf,
    index_dir: PathBuf,
    retry: RetryPolicy,
}

impl Cache {
    /// Creates a cache rooted at the given directory.
    /// Nothing is touched on disk until [Cache::load], [Cache::save] or [Cache::purge] is called.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            graph_path: dir.join(GRAPH_FILE),
            index_dir: dir.join(INDEX_DIR),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn graph_path(&self) -> &Path {
        &self.graph_path
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn index_data_path(&self) -> PathBuf {
        self.index_dir.join(INDEX_DATA_FILE)
    }

    pub fn index_header_path(&self) -> PathBuf {
        self.index_dir.join(INDEX_HEADER_FILE)
    }

    /// Loads the graph and region index.
    ///
    /// Fails with [CacheError::Missing] if no cache files exist. A cache which exists
    /// but is incomplete, damaged or of another format version is purged before
    /// returning [CacheError::Corrupt] or [CacheError::Version]; if the purge itself
    /// fails, [CacheError::PurgeFailed] is returned instead. Other I/O failures
    /// are returned as-is, without touching the files.
    pub fn load(&self) -> Result<(Graph, RegionIndex), CacheError> {
        match self.read() {
            Ok((g, regions)) => {
                info!(
                    "loaded cached road network from {}: {} nodes, {} edges",
                    self.graph_path.display(),
                    g.len(),
                    g.segment_count()
                );
                Ok((g, regions))
            }
            Err(e) if e.is_invalid() => {
                match e {
                    CacheError::Version { .. } => info!("discarding cache: {}", e),
                    _ => warn!("discarding cache: {}", e),
                }
                self.purge()?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn read(&self) -> Result<(Graph, RegionIndex), CacheError> {
        let data_path = self.index_data_path();
        let header_path = self.index_header_path();

        let present = [
            exists(&self.graph_path)?,
            exists(&data_path)?,
            exists(&header_path)?,
        ];
        if present.iter().all(|&p| !p) {
            return Err(CacheError::Missing);
        }
        if let Some(idx) = present.iter().position(|&p| !p) {
            let missing = [&self.graph_path, &data_path, &header_path][idx];
            return Err(CacheError::corrupt(missing, Corruption::Incomplete));
        }

        let graph_bytes = read_file(&self.graph_path)?;
        let data_bytes = read_file(&data_path)?;
        let header_bytes = read_file(&header_path)?;

        let g: Graph = format::decode(&self.graph_path, GRAPH_MAGIC, &graph_bytes)?;
        let entries: Vec<EdgeBox> = format::decode(&data_path, DATA_MAGIC, &data_bytes)?;
        let header: IndexHeader = format::decode(&header_path, INDEX_MAGIC, &header_bytes)?;

        let inconsistent = |path: &Path, msg: String| {
            CacheError::corrupt(path, Corruption::Inconsistent(msg))
        };

        g.validate()
            .map_err(|msg| inconsistent(&self.graph_path, msg))?;

        if header.data_len != data_bytes.len() as u64
            || header.data_crc != crc32fast::hash(&data_bytes)
        {
            return Err(inconsistent(
                &header_path,
                "header does not describe the data file".to_string(),
            ));
        }
        if header.entries != entries.len() as u64 {
            return Err(inconsistent(
                &header_path,
                format!(
                    "header declares {} entries, data file holds {}",
                    header.entries,
                    entries.len()
                ),
            ));
        }

        check_index_entries(&g, &entries).map_err(|msg| inconsistent(&data_path, msg))?;

        Ok((g, RegionIndex::from_entries(entries)))
    }

    /// Stores the graph and region index.
    ///
    /// The graph blob is written first, then the region index data file, and finally
    /// the region index header, which makes the cache complete.
    pub fn save(&self, g: &Graph, regions: &RegionIndex) -> Result<(), CacheError> {
        if let Some(parent) = self.graph_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
        fs::create_dir_all(&self.index_dir).map_err(|e| CacheError::io(&self.index_dir, e))?;

        let data_path = self.index_data_path();
        let header_path = self.index_header_path();

        let graph_bytes = format::encode(&self.graph_path, GRAPH_MAGIC, g)?;
        write_atomic(&self.graph_path, &graph_bytes)?;

        let entries = regions.entries();
        let data_bytes = format::encode(&data_path, DATA_MAGIC, &entries)?;
        write_atomic(&data_path, &data_bytes)?;

        let header = IndexHeader {
            entries: entries.len() as u64,
            data_len: data_bytes.len() as u64,
            data_crc: crc32fast::hash(&data_bytes),
        };
        write_atomic(
            &header_path,
            &format::encode(&header_path, INDEX_MAGIC, &header)?,
        )?;

        info!(
            "saved road network to {} and {}",
            self.graph_path.display(),
            self.index_dir.display()
        );
        Ok(())
    }

    /// Deletes the graph blob and the whole region index directory, then recreates
    /// the directory empty. Deletions are retried as per the [RetryPolicy].
    pub fn purge(&self) -> Result<(), CacheError> {
        self.retry.delete(&self.graph_path, |p| fs::remove_file(p))?;
        self.retry
            .delete(&temp_path(&self.graph_path), |p| fs::remove_file(p))?;
        self.retry.delete(&self.index_dir, |p| fs::remove_dir_all(p))?;
        fs::create_dir_all(&self.index_dir).map_err(|e| CacheError::io(&self.index_dir, e))?;

        info!(
            "purged cache files {} and {}",
            self.graph_path.display(),
            self.index_dir.display()
        );
        Ok(())
    }
}

/// Checks that region index entries cover exactly the edge table ids,
/// each under the box of its edge's endpoints.
fn check_index_entries(g: &Graph, entries: &[EdgeBox]) -> Result<(), String> {
    if entries.len() != g.segment_count() {
        return Err(format!(
            "region index holds {} entries, edge table holds {}",
            entries.len(),
            g.segment_count()
        ));
    }

    let ids: BTreeSet<u64> = entries.iter().map(|e| e.id).collect();
    if ids.len() != entries.len() || ids.last().is_some_and(|&id| id as usize >= entries.len()) {
        return Err("region index ids do not match the edge id space".to_string());
    }

    for entry in entries {
        let expected = g.segment(entry.id).and_then(|s| {
            let from = g.get_node(s.from)?;
            let to = g.get_node(s.to)?;
            Some(BoundingBox::around(&from, &to))
        });
        if expected != Some(entry.bbox) {
            return Err(format!("region index entry {} does not match its edge", entry.id));
        }
    }

    Ok(())
}

fn exists(path: &Path) -> Result<bool, CacheError> {
    match fs::metadata(path) {
        Ok(m) => Ok(m.is_file()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, CacheError> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => CacheError::corrupt(path, Corruption::Truncated),
        _ => CacheError::io(path, e),
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes the file next to its destination and renames it into place,
/// so that readers never observe a half-written file.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    let tmp = temp_path(path);
    let write = || -> io::Result<()> {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(data)?;
        f.sync_all()?;
        Ok(())
    };
    write().map_err(|e| CacheError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| CacheError::io(path, e))
}
