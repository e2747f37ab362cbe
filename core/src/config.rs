use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Settings for one indexing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Directory receiving segments, merged indexes and metadata.
    pub output_dir: PathBuf,
    /// Places per batch handed to one worker.
    pub batch_size: usize,
    /// (term, doc) insertions a block may hold before it is flushed as a segment.
    pub max_postings_per_segment: usize,
    /// Upper bound on concurrently running batch workers.
    pub workers: usize,
    /// Write a skip list next to every merged posting list.
    pub build_skip_lists: bool,
    /// Leave intermediate segments on disk after a successful merge.
    pub keep_segments: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./index"),
            batch_size: 100_000,
            max_postings_per_segment: 1_000_000,
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            build_skip_lists: true,
            keep_segments: false,
        }
    }
}

impl IndexerConfig {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self { output_dir: output_dir.as_ref().to_path_buf(), ..Self::default() }
    }

    /// Load from a JSON file; missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path)?;
        let cfg = serde_json::from_reader(BufReader::new(f))?;
        Ok(cfg)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_postings_per_segment(mut self, max: usize) -> Self {
        self.max_postings_per_segment = max;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_keep_segments(mut self, keep: bool) -> Self {
        self.keep_segments = keep;
        self
    }

    pub fn with_skip_lists(mut self, enabled: bool) -> Self {
        self.build_skip_lists = enabled;
        self
    }

    // Zero would never flush / never run anything.
    pub(crate) fn normalized(mut self) -> Self {
        self.batch_size = self.batch_size.max(1);
        self.max_postings_per_segment = self.max_postings_per_segment.max(1);
        self.workers = self.workers.max(1);
        self
    }
}
