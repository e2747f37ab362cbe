//! SPIMI inversion: documents to bounded in-memory blocks to on-disk segments.

use crate::document::Document;
use crate::field::Field;
use crate::interner::TermInterner;
use crate::inverted_index::InvertedIndex;
use crate::persist::IndexPaths;
use crate::pipeline::CancellationFlag;
use crate::tokenizer::Tokenizer;
use crate::{DocId, IndexError, Result, TermId};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Default)]
struct Registry {
    next: [u32; 2],
    names: [Vec<String>; 2],
}

/// Hands out segment names and remembers every segment written so far.
#[derive(Default)]
pub struct SegmentRegistry {
    inner: Mutex<Registry>,
}

impl SegmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates `index_<field>_<n>` with a per-field counter starting at 0.
    pub fn next_segment_name(&self, field: Field) -> String {
        let mut reg = self.inner.lock();
        let slot = field.slot();
        let name = field.segment_name(reg.next[slot]);
        reg.next[slot] += 1;
        reg.names[slot].push(name.clone());
        name
    }

    pub fn segments_for(&self, field: Field) -> Vec<String> {
        self.inner.lock().names[field.slot()].clone()
    }

    pub fn all(&self) -> Vec<String> {
        let reg = self.inner.lock();
        reg.names.iter().flatten().cloned().collect()
    }
}

/// What one [`SegmentBuilder::invert`] call produced.
#[derive(Debug, Default)]
pub struct SegmentOutput {
    pub segments: Vec<String>,
    /// Token count of the field for every document that had at least one token.
    pub field_lengths: Vec<(DocId, u32)>,
}

/// Inverts one field of a document batch.
///
/// Postings accumulate in memory until `max_postings` (term, doc) pairs have
/// been collected, then the block is written out as a segment.
pub struct SegmentBuilder<'a, T: Tokenizer + ?Sized> {
    field: Field,
    interner: &'a TermInterner,
    tokenizer: &'a T,
    registry: &'a SegmentRegistry,
    paths: &'a IndexPaths,
    cancel: &'a CancellationFlag,
    max_postings: usize,
    block: HashMap<TermId, Vec<DocId>>,
    block_lengths: HashMap<DocId, u32>,
    pending: usize,
    output: SegmentOutput,
}

impl<'a, T: Tokenizer + ?Sized> SegmentBuilder<'a, T> {
    pub fn new(
        field: Field,
        interner: &'a TermInterner,
        tokenizer: &'a T,
        registry: &'a SegmentRegistry,
        paths: &'a IndexPaths,
        cancel: &'a CancellationFlag,
    ) -> Self {
        Self {
            field,
            interner,
            tokenizer,
            registry,
            paths,
            cancel,
            max_postings: 1_000_000,
            block: HashMap::new(),
            block_lengths: HashMap::new(),
            pending: 0,
            output: SegmentOutput::default(),
        }
    }

    pub fn with_max_postings(mut self, max_postings: usize) -> Self {
        self.max_postings = max_postings.max(1);
        self
    }

    pub fn invert(mut self, docs: &[Document]) -> Result<SegmentOutput> {
        for doc in docs {
            if self.cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }
            let tokens = self.tokenizer.tokenize(self.field.text_of(doc));
            if tokens.is_empty() {
                continue;
            }
            self.block_lengths.insert(doc.id, tokens.len() as u32);
            self.output.field_lengths.push((doc.id, tokens.len() as u32));
            for token in &tokens {
                let term = self.interner.get_id(token);
                self.block.entry(term).or_default().push(doc.id);
                self.pending += 1;
                if self.pending >= self.max_postings {
                    self.flush()?;
                }
            }
        }
        self.flush()?;
        Ok(self.output)
    }

    fn flush(&mut self) -> Result<()> {
        if self.block.is_empty() {
            return Ok(());
        }
        let name = self.registry.next_segment_name(self.field);
        let mut index = InvertedIndex::new(self.paths, name.clone());
        index.open_writer()?;

        let mut block: Vec<(TermId, Vec<DocId>)> = self.block.drain().collect();
        block.sort_unstable_by_key(|(term, _)| *term);
        let terms = block.len();
        for (term, mut postings) in block {
            postings.sort_unstable();
            postings.dedup();
            if let Err(e) = index.append_posting_list(term, &postings) {
                if let Err(cleanup) = index.discard() {
                    warn!(segment = %name, error = %cleanup, "failed to remove partial segment");
                }
                return Err(e);
            }
        }
        index.set_len_field_in_doc(std::mem::take(&mut self.block_lengths));
        index.close()?;

        debug!(segment = %name, terms, postings = self.pending, "flushed segment");
        self.pending = 0;
        self.output.segments.push(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TextTokenizer;
    use tempfile::tempdir;

    fn jalan_docs() -> Vec<Document> {
        [
            "Jalan Sentosa Harapan",
            "Jalan Dunia Baru",
            "Jalan Mulwo Apel",
            "Jalan Kebun Jeruk Apel",
            "Jalan Pantai Ancol",
        ]
        .iter()
        .enumerate()
        .map(|(i, name)| Document::new(i as DocId + 1, *name, ""))
        .collect()
    }

    fn read_all(paths: &IndexPaths, name: &str) -> Vec<(TermId, Vec<DocId>)> {
        let mut idx = InvertedIndex::new(paths, name);
        idx.open_reader().unwrap();
        idx.iter().map(|e| e.map(|e| (e.term, e.postings)).unwrap()).collect()
    }

    #[test]
    fn inverts_one_block() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let interner = TermInterner::new();
        let tokenizer = TextTokenizer::new();
        let registry = SegmentRegistry::new();
        let cancel = CancellationFlag::new();

        let out = SegmentBuilder::new(Field::Name, &interner, &tokenizer, &registry, &paths, &cancel)
            .with_max_postings(500)
            .invert(&jalan_docs())
            .unwrap();

        assert_eq!(out.segments, vec!["index_name_0"]);
        assert_eq!(registry.segments_for(Field::Name), out.segments);
        assert_eq!(interner.len(), 11);

        let entries = read_all(&paths, "index_name_0");
        let terms: Vec<TermId> = entries.iter().map(|(t, _)| *t).collect();
        assert_eq!(terms, (0..11).collect::<Vec<_>>());
        let expected: HashMap<TermId, Vec<DocId>> = HashMap::from([
            (0, vec![1, 2, 3, 4, 5]),
            (1, vec![1]),
            (2, vec![1]),
            (3, vec![2]),
            (4, vec![2]),
            (5, vec![3]),
            (6, vec![3, 4]),
            (7, vec![4]),
            (8, vec![4]),
            (9, vec![5]),
            (10, vec![5]),
        ]);
        for (term, postings) in entries {
            assert_eq!(postings, expected[&term], "term {term}");
        }

        let mut idx = InvertedIndex::new(&paths, "index_name_0");
        idx.open_reader().unwrap();
        assert_eq!(idx.get_len_field_in_doc().get(&4), Some(&4));
        assert_eq!(idx.get_average_field_length(), 16.0 / 5.0);
    }

    #[test]
    fn small_threshold_splits_into_segments() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let interner = TermInterner::new();
        let tokenizer = TextTokenizer::new();
        let registry = SegmentRegistry::new();
        let cancel = CancellationFlag::new();

        let out = SegmentBuilder::new(Field::Name, &interner, &tokenizer, &registry, &paths, &cancel)
            .with_max_postings(4)
            .invert(&jalan_docs())
            .unwrap();

        // 16 tokens, 4 per segment
        assert_eq!(out.segments.len(), 4);
        assert_eq!(out.field_lengths.len(), 5);

        let mut lengths = HashMap::new();
        for name in &out.segments {
            let mut idx = InvertedIndex::new(&paths, name.as_str());
            idx.open_reader().unwrap();
            for (doc, len) in idx.get_len_field_in_doc() {
                assert!(lengths.insert(*doc, *len).is_none(), "doc {doc} attached twice");
            }
        }
        assert_eq!(lengths.len(), 5);
    }

    #[test]
    fn empty_fields_produce_nothing() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let interner = TermInterner::new();
        let tokenizer = TextTokenizer::new();
        let registry = SegmentRegistry::new();
        let cancel = CancellationFlag::new();

        let out = SegmentBuilder::new(Field::Address, &interner, &tokenizer, &registry, &paths, &cancel)
            .invert(&jalan_docs())
            .unwrap();
        assert!(out.segments.is_empty());
        assert!(out.field_lengths.is_empty());
        assert!(registry.all().is_empty());
    }

    #[test]
    fn cancelled_before_start() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let interner = TermInterner::new();
        let tokenizer = TextTokenizer::new();
        let registry = SegmentRegistry::new();
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let err = SegmentBuilder::new(Field::Name, &interner, &tokenizer, &registry, &paths, &cancel)
            .invert(&jalan_docs())
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(interner.is_empty());
    }

    #[test]
    fn registry_counts_per_field() {
        let registry = SegmentRegistry::new();
        assert_eq!(registry.next_segment_name(Field::Name), "index_name_0");
        assert_eq!(registry.next_segment_name(Field::Address), "index_address_0");
        assert_eq!(registry.next_segment_name(Field::Name), "index_name_1");
        assert_eq!(registry.all().len(), 3);
    }
}
