//! On-disk inverted index for one field: postings file plus metadata.
//!
//! Segments and merged indexes share this format. Files for an index `<name>`:
//!
//! ```text
//! <name>.index            codec-encoded posting lists back to back
//! <name>.metadata         [terms:4][entries:4][doc_lengths:4]
//!                         terms   x [term:4]
//!                         entries x [term:4][byte_len:4][list_len:4][offset:4]
//!                         doc_lengths x [doc:4][field_len:4]
//!                         [average_field_length:f64]
//! <name>_size.metadata    100 bytes; first 8 = f64 bits of the metadata length
//! <name>.skip             serialized skip lists (optional)
//! <name>_skip.metadata    [count:4] count x [term:4][offset:4][byte_len:4]
//! ```
//!
//! All integers are little-endian.

use crate::codec::{decode_posting_list, encode_posting_list};
use crate::persist::IndexPaths;
use crate::skiplist::{SkipList, SkipListReader, END_KEY};
use crate::{DocId, IndexError, Result, TermId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const SIZE_SIDECAR_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingMeta {
    pub offset: u32,
    pub list_len: u32,
    pub byte_len: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SkipMeta {
    offset: u32,
    byte_len: u32,
}

/// One term and its posting list, as produced by [`InvertedIndex::iter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub term: TermId,
    pub postings: Vec<DocId>,
}

/// Decoded contents of a `.metadata` file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    pub terms: Vec<TermId>,
    pub postings: HashMap<TermId, PostingMeta>,
    pub len_field_in_doc: HashMap<DocId, u32>,
    pub average_field_length: f64,
}

enum Handle {
    Writer(BufWriter<File>),
    Reader(File),
}

/// Append-only data file readable at arbitrary offsets, also while writing.
struct DataFile {
    handle: Handle,
    len: u64,
}

impl DataFile {
    fn create(path: &Path) -> Result<Self> {
        File::create(path)?;
        // append mode keeps writes at the end even after reads moved the cursor
        let file = OpenOptions::new().read(true).append(true).open(path)?;
        Ok(Self { handle: Handle::Writer(BufWriter::new(file)), len: 0 })
    }

    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { handle: Handle::Reader(file), len })
    }

    fn append(&mut self, bytes: &[u8]) -> Result<u32> {
        let offset = self.len;
        if offset + bytes.len() as u64 > u64::from(u32::MAX) {
            return Err(IndexError::InvalidOperation("index file would exceed 4 GiB".into()));
        }
        match &mut self.handle {
            Handle::Writer(w) => w.write_all(bytes)?,
            Handle::Reader(_) => return Err(IndexError::InvalidOperation("index is open read-only".into())),
        }
        self.len += bytes.len() as u64;
        Ok(offset as u32)
    }

    fn read_at(&mut self, offset: u32, len: u32) -> Result<Vec<u8>> {
        if u64::from(offset) + u64::from(len) > self.len {
            return Err(IndexError::corrupt(format!(
                "range {offset}+{len} lies outside a {} byte file",
                self.len
            )));
        }
        let file = match &mut self.handle {
            Handle::Writer(w) => {
                w.flush()?;
                w.get_mut()
            }
            Handle::Reader(f) => f,
        };
        file.seek(SeekFrom::Start(u64::from(offset)))?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn finish(self) -> Result<()> {
        if let Handle::Writer(mut w) = self.handle {
            w.flush()?;
            w.get_ref().sync_data()?;
        }
        Ok(())
    }
}

pub struct InvertedIndex {
    name: String,
    paths: IndexPaths,
    with_skip_lists: bool,
    postings_file: Option<Mutex<DataFile>>,
    skip_file: Option<Mutex<DataFile>>,
    writing: bool,
    terms: Vec<TermId>,
    posting_meta: HashMap<TermId, PostingMeta>,
    skip_meta: HashMap<TermId, SkipMeta>,
    len_field_in_doc: HashMap<DocId, u32>,
    average_field_length: f64,
}

impl InvertedIndex {
    pub fn new(paths: &IndexPaths, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paths: paths.clone(),
            with_skip_lists: false,
            postings_file: None,
            skip_file: None,
            writing: false,
            terms: Vec::new(),
            posting_meta: HashMap::new(),
            skip_meta: HashMap::new(),
            len_field_in_doc: HashMap::new(),
            average_field_length: 0.0,
        }
    }

    /// Also store a serialized skip list for every appended posting list.
    pub fn with_skip_lists(mut self, enabled: bool) -> Self {
        self.with_skip_lists = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_path(&self) -> PathBuf {
        self.paths.index_file(&self.name)
    }

    pub fn terms(&self) -> &[TermId] {
        &self.terms
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn posting_meta(&self, term: TermId) -> Option<PostingMeta> {
        self.posting_meta.get(&term).copied()
    }

    pub fn has_skip_lists(&self) -> bool {
        !self.skip_meta.is_empty() || (self.writing && self.with_skip_lists)
    }

    pub fn set_len_field_in_doc(&mut self, len_field_in_doc: HashMap<DocId, u32>) {
        self.len_field_in_doc = len_field_in_doc;
        self.average_field_length = average(&self.len_field_in_doc);
    }

    pub fn get_len_field_in_doc(&self) -> &HashMap<DocId, u32> {
        &self.len_field_in_doc
    }

    pub fn get_average_field_length(&self) -> f64 {
        self.average_field_length
    }

    /// Starts an empty index, deleting whatever an earlier index of the same
    /// name left behind so no stale metadata or skip lists outlive it.
    pub fn open_writer(&mut self) -> Result<()> {
        fs::create_dir_all(&self.paths.root)?;
        self.delete_family()?;
        self.postings_file = Some(Mutex::new(DataFile::create(&self.paths.index_file(&self.name))?));
        self.skip_file = if self.with_skip_lists {
            Some(Mutex::new(DataFile::create(&self.paths.skip_file(&self.name))?))
        } else {
            None
        };
        self.writing = true;
        self.terms.clear();
        self.posting_meta.clear();
        self.skip_meta.clear();
        Ok(())
    }

    /// Opens an index written earlier, reading its metadata back exactly.
    pub fn open_reader(&mut self) -> Result<()> {
        let size_buf = fs::read(self.paths.size_file(&self.name))?;
        if size_buf.len() < 8 {
            return Err(IndexError::corrupt(format!("{}: size sidecar is truncated", self.name)));
        }
        let size = f64::from_bits(u64::from_le_bytes(le8(&size_buf[..8])));
        if !size.is_finite() || size < 0.0 || size.fract() != 0.0 {
            return Err(IndexError::corrupt(format!("{}: bad metadata size {size}", self.name)));
        }
        let size = size as usize;

        let metadata_buf = fs::read(self.paths.metadata_file(&self.name))?;
        if metadata_buf.len() < size {
            return Err(IndexError::corrupt(format!(
                "{}: metadata has {} bytes, sidecar says {size}",
                self.name,
                metadata_buf.len()
            )));
        }
        let metadata = deserialize_metadata(&metadata_buf[..size])?;

        let postings_file = DataFile::open(&self.paths.index_file(&self.name))?;
        for (term, meta) in &metadata.postings {
            if u64::from(meta.offset) + u64::from(meta.byte_len) > postings_file.len {
                return Err(IndexError::corrupt(format!("{}: postings of term {term} run past the file", self.name)));
            }
        }

        let skip_meta_path = self.paths.skip_metadata_file(&self.name);
        let (skip_file, skip_meta) = if skip_meta_path.exists() {
            let skip_meta = deserialize_skip_metadata(&fs::read(&skip_meta_path)?)?;
            let skip_file = DataFile::open(&self.paths.skip_file(&self.name))?;
            (Some(Mutex::new(skip_file)), skip_meta)
        } else {
            (None, HashMap::new())
        };

        self.terms = metadata.terms;
        self.posting_meta = metadata.postings;
        self.len_field_in_doc = metadata.len_field_in_doc;
        self.average_field_length = metadata.average_field_length;
        self.postings_file = Some(Mutex::new(postings_file));
        self.skip_file = skip_file;
        self.skip_meta = skip_meta;
        self.writing = false;
        Ok(())
    }

    /// Appends `postings` for `term`. Each term may be written once per index.
    pub fn append_posting_list(&mut self, term: TermId, postings: &[DocId]) -> Result<()> {
        if !self.writing {
            return Err(IndexError::InvalidOperation(format!("{} is not open for writing", self.name)));
        }
        if self.posting_meta.contains_key(&term) {
            return Err(IndexError::InvalidOperation(format!("term {term} already written to {}", self.name)));
        }
        let file = self
            .postings_file
            .as_ref()
            .ok_or_else(|| IndexError::InvalidOperation(format!("{} has no postings file", self.name)))?;

        if self.skip_file.is_some() && postings.iter().any(|&d| d >= END_KEY) {
            return Err(IndexError::InvalidOperation(format!(
                "term {term}: document IDs must stay below {END_KEY} to build a skip list"
            )));
        }

        let encoded = encode_posting_list(postings);
        let offset = file.lock().append(&encoded)?;

        if let Some(skip_file) = &self.skip_file {
            let mut skip_list = SkipList::with_seed(u64::from(term));
            for &doc in postings {
                skip_list.insert(doc)?;
            }
            let bytes = skip_list.serialize();
            let skip_offset = skip_file.lock().append(&bytes)?;
            self.skip_meta.insert(term, SkipMeta { offset: skip_offset, byte_len: bytes.len() as u32 });
        }

        self.terms.push(term);
        self.posting_meta.insert(
            term,
            PostingMeta { offset, list_len: postings.len() as u32, byte_len: encoded.len() as u32 },
        );
        Ok(())
    }

    /// Posting list of `term`; empty when the term is not in this index.
    pub fn get_posting_list(&self, term: TermId) -> Result<Vec<DocId>> {
        let Some(meta) = self.posting_meta.get(&term) else {
            return Ok(Vec::new());
        };
        let file = self
            .postings_file
            .as_ref()
            .ok_or_else(|| IndexError::InvalidOperation(format!("{} is closed", self.name)))?;
        let bytes = file.lock().read_at(meta.offset, meta.byte_len)?;
        let postings = decode_posting_list(&bytes)?;
        if postings.len() != meta.list_len as usize {
            return Err(IndexError::corrupt(format!(
                "term {term}: decoded {} postings, metadata says {}",
                postings.len(),
                meta.list_len
            )));
        }
        Ok(postings)
    }

    /// Stored skip list of `term`, if this index carries skip lists and knows the term.
    pub fn get_skip_list(&self, term: TermId) -> Result<Option<SkipListReader>> {
        let (Some(meta), Some(file)) = (self.skip_meta.get(&term), self.skip_file.as_ref()) else {
            return Ok(None);
        };
        let bytes = file.lock().read_at(meta.offset, meta.byte_len)?;
        SkipListReader::new(bytes).map(Some)
    }

    /// Term-ordered (append order) walk over the whole index.
    pub fn iter(&self) -> InvertedIndexIter<'_> {
        InvertedIndexIter { index: self, pos: 0, done: false }
    }

    /// Persists metadata and sidecars when writing; releases file handles either way.
    pub fn close(&mut self) -> Result<()> {
        let postings_file = self.postings_file.take();
        let skip_file = self.skip_file.take();
        if !self.writing {
            return Ok(());
        }
        self.writing = false;

        if let Some(f) = postings_file {
            f.into_inner().finish()?;
        }
        if let Some(f) = skip_file {
            f.into_inner().finish()?;
            fs::write(self.paths.skip_metadata_file(&self.name), self.serialize_skip_metadata())?;
        }

        self.average_field_length = average(&self.len_field_in_doc);
        let metadata = self.serialize_metadata();
        fs::write(self.paths.metadata_file(&self.name), &metadata)?;

        let mut size_buf = vec![0u8; SIZE_SIDECAR_LEN];
        size_buf[..8].copy_from_slice(&(metadata.len() as f64).to_bits().to_le_bytes());
        fs::write(self.paths.size_file(&self.name), size_buf)?;
        Ok(())
    }

    /// Drops file handles without persisting anything and deletes every file of this index.
    pub fn remove_files(mut self) -> Result<()> {
        self.discard()
    }

    /// Abandons a partly written index: nothing is persisted and its files are deleted.
    pub fn discard(&mut self) -> Result<()> {
        self.postings_file = None;
        self.skip_file = None;
        self.writing = false;
        self.delete_family()
    }

    fn delete_family(&self) -> Result<()> {
        for path in self.paths.index_family(&self.name) {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn metadata(&self) -> Metadata {
        Metadata {
            terms: self.terms.clone(),
            postings: self.posting_meta.clone(),
            len_field_in_doc: self.len_field_in_doc.clone(),
            average_field_length: average(&self.len_field_in_doc),
        }
    }

    pub fn serialize_metadata(&self) -> Vec<u8> {
        serialize_metadata(&self.metadata())
    }

    fn serialize_skip_metadata(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 12 * self.skip_meta.len());
        buf.extend_from_slice(&(self.skip_meta.len() as u32).to_le_bytes());
        for term in &self.terms {
            if let Some(meta) = self.skip_meta.get(term) {
                buf.extend_from_slice(&term.to_le_bytes());
                buf.extend_from_slice(&meta.offset.to_le_bytes());
                buf.extend_from_slice(&meta.byte_len.to_le_bytes());
            }
        }
        buf
    }
}

/// An index dropped while still writing never gets metadata, so readers
/// cannot mistake a partial write for a finished one.
impl Drop for InvertedIndex {
    fn drop(&mut self) {
        if self.writing {
            tracing::warn!(index = %self.name, "index dropped before close; metadata not written");
        }
    }
}

pub struct InvertedIndexIter<'a> {
    index: &'a InvertedIndex,
    pos: usize,
    done: bool,
}

impl Iterator for InvertedIndexIter<'_> {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(&term) = self.index.terms.get(self.pos) else {
            self.done = true;
            return None;
        };
        self.pos += 1;
        match self.index.get_posting_list(term) {
            Ok(postings) => Some(Ok(IndexEntry { term, postings })),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = if self.done { 0 } else { self.index.terms.len() - self.pos };
        (0, Some(left))
    }
}

fn average(lengths: &HashMap<DocId, u32>) -> f64 {
    if lengths.is_empty() {
        return 0.0;
    }
    let total: u64 = lengths.values().map(|&n| u64::from(n)).sum();
    total as f64 / lengths.len() as f64
}

fn le8(b: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(b);
    out
}

pub fn serialize_metadata(meta: &Metadata) -> Vec<u8> {
    let size = 12 + 4 * meta.terms.len() + 16 * meta.postings.len() + 8 * meta.len_field_in_doc.len() + 8;
    let mut buf = Vec::with_capacity(size);
    let put = |v: u32, buf: &mut Vec<u8>| buf.extend_from_slice(&v.to_le_bytes());

    put(meta.terms.len() as u32, &mut buf);
    put(meta.postings.len() as u32, &mut buf);
    put(meta.len_field_in_doc.len() as u32, &mut buf);
    for &term in &meta.terms {
        put(term, &mut buf);
    }

    // entries follow term order; any term missing from `terms` goes last, ascending
    let listed: HashSet<TermId> = meta.terms.iter().copied().collect();
    let mut extra: Vec<TermId> = meta.postings.keys().filter(|t| !listed.contains(t)).copied().collect();
    extra.sort_unstable();
    for term in meta.terms.iter().chain(extra.iter()) {
        if let Some(p) = meta.postings.get(term) {
            put(*term, &mut buf);
            put(p.byte_len, &mut buf);
            put(p.list_len, &mut buf);
            put(p.offset, &mut buf);
        }
    }

    let mut docs: Vec<(&DocId, &u32)> = meta.len_field_in_doc.iter().collect();
    docs.sort_unstable();
    for (&doc, &len) in docs {
        put(doc, &mut buf);
        put(len, &mut buf);
    }
    buf.extend_from_slice(&meta.average_field_length.to_bits().to_le_bytes());
    debug_assert_eq!(buf.len(), size);
    buf
}

struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&e| e <= self.buf.len())
            .ok_or_else(|| IndexError::corrupt(format!("metadata truncated at byte {}", self.pos)))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(u64::from_le_bytes(le8(self.take(8)?))))
    }

    fn count(&mut self, record_len: usize) -> Result<usize> {
        let n = self.u32()? as usize;
        if n.saturating_mul(record_len) > self.buf.len() {
            return Err(IndexError::corrupt(format!("implausible record count {n}")));
        }
        Ok(n)
    }
}

pub fn deserialize_metadata(buf: &[u8]) -> Result<Metadata> {
    let mut cur = ByteCursor::new(buf);
    let term_count = cur.count(4)?;
    let entry_count = cur.count(16)?;
    let doc_count = cur.count(8)?;

    let mut terms = Vec::with_capacity(term_count);
    for _ in 0..term_count {
        terms.push(cur.u32()?);
    }

    let mut postings = HashMap::with_capacity(entry_count);
    for _ in 0..entry_count {
        let term = cur.u32()?;
        let byte_len = cur.u32()?;
        let list_len = cur.u32()?;
        let offset = cur.u32()?;
        postings.insert(term, PostingMeta { offset, list_len, byte_len });
    }
    if let Some(t) = terms.iter().find(|t| !postings.contains_key(t)) {
        return Err(IndexError::corrupt(format!("term {t} has no posting entry")));
    }

    let mut len_field_in_doc = HashMap::with_capacity(doc_count);
    for _ in 0..doc_count {
        let doc = cur.u32()?;
        let len = cur.u32()?;
        len_field_in_doc.insert(doc, len);
    }
    let average_field_length = cur.f64()?;

    Ok(Metadata { terms, postings, len_field_in_doc, average_field_length })
}

fn deserialize_skip_metadata(buf: &[u8]) -> Result<HashMap<TermId, SkipMeta>> {
    let mut cur = ByteCursor::new(buf);
    let n = cur.count(12)?;
    let mut out = HashMap::with_capacity(n);
    for _ in 0..n {
        let term = cur.u32()?;
        let offset = cur.u32()?;
        let byte_len = cur.u32()?;
        out.insert(term, SkipMeta { offset, byte_len });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn writer(paths: &IndexPaths, name: &str) -> InvertedIndex {
        let mut idx = InvertedIndex::new(paths, name);
        idx.open_writer().unwrap();
        idx
    }

    #[test]
    fn append_then_read_while_writing() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut idx = writer(&paths, "test");
        idx.append_posting_list(1, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(idx.posting_meta(1), Some(PostingMeta { offset: 0, list_len: 5, byte_len: 5 }));
        idx.append_posting_list(2, &[300, 70_000]).unwrap();

        assert_eq!(idx.get_posting_list(1).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(idx.get_posting_list(2).unwrap(), vec![300, 70_000]);
        assert!(idx.get_posting_list(99).unwrap().is_empty());

        // writes after a read still land at the end
        idx.append_posting_list(3, &[9]).unwrap();
        assert_eq!(idx.get_posting_list(3).unwrap(), vec![9]);

        let items: Vec<_> = idx.iter().map(|r| r.unwrap()).collect();
        assert_eq!(items[0], IndexEntry { term: 1, postings: vec![1, 2, 3, 4, 5] });
        assert_eq!(items.len(), 3);
        idx.close().unwrap();
    }

    #[test]
    fn append_requires_open_writer_and_unique_terms() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut idx = writer(&paths, "test");
        idx.append_posting_list(1, &[1]).unwrap();
        assert!(matches!(idx.append_posting_list(1, &[2]), Err(IndexError::InvalidOperation(_))));
        idx.close().unwrap();
        assert!(matches!(idx.append_posting_list(2, &[1]), Err(IndexError::InvalidOperation(_))));
    }

    #[test]
    fn close_then_open_reader() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut idx = writer(&paths, "seg");
        idx.append_posting_list(4, &[2, 8]).unwrap();
        idx.append_posting_list(0, &[1, 2, 3]).unwrap();
        idx.set_len_field_in_doc(HashMap::from([(1, 2), (2, 4), (3, 3), (8, 1)]));
        idx.close().unwrap();

        let size = fs::read(paths.size_file("seg")).unwrap();
        assert_eq!(size.len(), SIZE_SIDECAR_LEN);
        let meta_len = fs::metadata(paths.metadata_file("seg")).unwrap().len();
        assert_eq!(f64::from_bits(u64::from_le_bytes(le8(&size[..8]))), meta_len as f64);

        let mut reader = InvertedIndex::new(&paths, "seg");
        reader.open_reader().unwrap();
        assert_eq!(reader.terms(), &[4, 0]);
        assert_eq!(reader.get_posting_list(0).unwrap(), vec![1, 2, 3]);
        assert_eq!(reader.get_len_field_in_doc().get(&2), Some(&4));
        assert_eq!(reader.get_average_field_length(), 2.5);
        let terms: Vec<TermId> = reader.iter().map(|e| e.unwrap().term).collect();
        assert_eq!(terms, vec![4, 0]);
        assert!(reader.get_skip_list(0).unwrap().is_none());
    }

    #[test]
    fn skip_lists_are_stored_per_term() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut idx = InvertedIndex::new(&paths, "merged").with_skip_lists(true);
        idx.open_writer().unwrap();
        let evens: Vec<u32> = (0..1000).map(|i| i * 2).collect();
        idx.append_posting_list(7, &evens).unwrap();
        idx.append_posting_list(8, &[]).unwrap();
        idx.close().unwrap();

        let mut reader = InvertedIndex::new(&paths, "merged");
        reader.open_reader().unwrap();
        assert!(reader.has_skip_lists());
        let sl = reader.get_skip_list(7).unwrap().unwrap();
        assert_eq!(sl.get_all_items(), evens);
        assert!(sl.contains(1998));
        assert!(!sl.contains(1999));
        assert!(reader.get_skip_list(8).unwrap().unwrap().is_empty());
        assert!(reader.get_skip_list(9).unwrap().is_none());
    }

    #[test]
    fn metadata_round_trip() {
        let meta = Metadata {
            terms: vec![3, 1, 2],
            postings: HashMap::from([
                (3, PostingMeta { offset: 0, list_len: 2, byte_len: 2 }),
                (1, PostingMeta { offset: 2, list_len: 1, byte_len: 3 }),
                (2, PostingMeta { offset: 5, list_len: 4, byte_len: 4 }),
            ]),
            len_field_in_doc: HashMap::from([(10, 3), (11, 1)]),
            average_field_length: 2.0,
        };
        let bytes = serialize_metadata(&meta);
        assert_eq!(bytes.len(), 12 + 12 + 48 + 16 + 8);
        assert_eq!(deserialize_metadata(&bytes).unwrap(), meta);
    }

    #[test]
    fn truncated_metadata_is_corrupt() {
        let meta = Metadata {
            terms: vec![1],
            postings: HashMap::from([(1, PostingMeta { offset: 0, list_len: 1, byte_len: 1 })]),
            ..Metadata::default()
        };
        let bytes = serialize_metadata(&meta);
        for cut in [0, 5, 12, 20, bytes.len() - 1] {
            assert!(matches!(deserialize_metadata(&bytes[..cut]), Err(IndexError::Corrupt(_))), "cut {cut}");
        }
    }

    #[test]
    fn open_reader_rejects_bad_sidecar() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut idx = writer(&paths, "seg");
        idx.append_posting_list(1, &[1]).unwrap();
        idx.close().unwrap();
        let mut size = vec![0u8; SIZE_SIDECAR_LEN];
        size[..8].copy_from_slice(&10_000f64.to_bits().to_le_bytes());
        fs::write(paths.size_file("seg"), size).unwrap();

        let mut reader = InvertedIndex::new(&paths, "seg");
        assert!(matches!(reader.open_reader(), Err(IndexError::Corrupt(_))));
        assert!(matches!(InvertedIndex::new(&paths, "missing").open_reader(), Err(IndexError::Io(_))));
    }

    #[test]
    fn rewrite_without_skip_lists_drops_old_ones() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut idx = InvertedIndex::new(&paths, "merged").with_skip_lists(true);
        idx.open_writer().unwrap();
        idx.append_posting_list(1, &[0, 1, 2]).unwrap();
        idx.close().unwrap();

        let mut idx = InvertedIndex::new(&paths, "merged");
        idx.open_writer().unwrap();
        assert!(!paths.skip_file("merged").exists());
        assert!(!paths.skip_metadata_file("merged").exists());
        idx.append_posting_list(1, &[0]).unwrap();
        idx.close().unwrap();

        let mut reader = InvertedIndex::new(&paths, "merged");
        reader.open_reader().unwrap();
        assert!(!reader.has_skip_lists());
        assert!(reader.get_skip_list(1).unwrap().is_none());
        assert_eq!(reader.get_posting_list(1).unwrap(), vec![0]);
    }

    #[test]
    fn dropped_writer_leaves_no_readable_index() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut idx = writer(&paths, "partial");
        idx.append_posting_list(1, &[1, 2]).unwrap();
        drop(idx);
        assert!(!paths.metadata_file("partial").exists());
        assert!(!paths.size_file("partial").exists());
        assert!(InvertedIndex::new(&paths, "partial").open_reader().is_err());

        let mut idx = writer(&paths, "partial");
        idx.append_posting_list(1, &[1]).unwrap();
        idx.discard().unwrap();
        for p in paths.index_family("partial") {
            assert!(!p.exists(), "{}", p.display());
        }
    }

    #[test]
    fn iterator_stops_after_first_corrupt_list() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut idx = writer(&paths, "seg");
        idx.append_posting_list(1, &[5]).unwrap();
        idx.append_posting_list(2, &[300]).unwrap();
        idx.append_posting_list(3, &[7]).unwrap();
        idx.close().unwrap();

        // term 2 is encoded as [0x82, 0x2c]; a continuation byte in its last position cuts it short
        let mut bytes = fs::read(paths.index_file("seg")).unwrap();
        bytes[2] = 0x80;
        fs::write(paths.index_file("seg"), bytes).unwrap();

        let mut reader = InvertedIndex::new(&paths, "seg");
        reader.open_reader().unwrap();
        let mut it = reader.iter();
        assert_eq!(it.next().unwrap().unwrap(), IndexEntry { term: 1, postings: vec![5] });
        assert!(matches!(it.next(), Some(Err(IndexError::Corrupt(_)))));
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn remove_files_deletes_family() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut idx = InvertedIndex::new(&paths, "gone").with_skip_lists(true);
        idx.open_writer().unwrap();
        idx.append_posting_list(1, &[1, 2]).unwrap();
        idx.close().unwrap();
        assert!(paths.skip_metadata_file("gone").exists());
        idx.remove_files().unwrap();
        for p in paths.index_family("gone") {
            assert!(!p.exists(), "{}", p.display());
        }
    }
}
