use crate::interner::InternerSnapshot;
use crate::{DocId, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

/// Human-readable summary written next to the index as `meta.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
}

/// Everything besides the posting files that query time needs.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IndexMeta {
    pub interner: InternerSnapshot,
    /// Tokens per document over all fields.
    pub doc_word_count: HashMap<DocId, u32>,
    pub docs_count: u32,
}

impl IndexMeta {
    pub fn average_doc_length(&self) -> f64 {
        if self.docs_count == 0 {
            return 0.0;
        }
        let total: u64 = self.doc_word_count.values().map(|&n| u64::from(n)).sum();
        total as f64 / f64::from(self.docs_count)
    }
}

/// File names inside one index directory.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index_file(&self, name: &str) -> PathBuf { self.root.join(format!("{name}.index")) }
    pub fn metadata_file(&self, name: &str) -> PathBuf { self.root.join(format!("{name}.metadata")) }
    pub fn size_file(&self, name: &str) -> PathBuf { self.root.join(format!("{name}_size.metadata")) }
    pub fn skip_file(&self, name: &str) -> PathBuf { self.root.join(format!("{name}.skip")) }
    pub fn skip_metadata_file(&self, name: &str) -> PathBuf { self.root.join(format!("{name}_skip.metadata")) }
    fn meta_bin(&self) -> PathBuf { self.root.join("meta.bin") }
    fn meta_json(&self) -> PathBuf { self.root.join("meta.json") }

    /// Every file an inverted index named `name` may own.
    pub fn index_family(&self, name: &str) -> [PathBuf; 5] {
        [
            self.index_file(name),
            self.metadata_file(name),
            self.size_file(name),
            self.skip_file(name),
            self.skip_metadata_file(name),
        ]
    }
}

pub fn save_index_meta(paths: &IndexPaths, meta: &IndexMeta) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = BufWriter::new(File::create(paths.meta_bin())?);
    bincode::serialize_into(&mut f, meta)?;
    f.flush()?;
    Ok(())
}

pub fn load_index_meta(paths: &IndexPaths) -> Result<IndexMeta> {
    let f = File::open(paths.meta_bin())?;
    let meta = bincode::deserialize_from(BufReader::new(f))?;
    Ok(meta)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta_json())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta_json())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
