//! K-way merge of term-ordered segments into one index.

use crate::inverted_index::{IndexEntry, InvertedIndex, InvertedIndexIter};
use crate::persist::IndexPaths;
use crate::{DocId, IndexError, Result, TermId};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;
use tracing::{info, warn};

/// Streams `(term, postings)` from several segments in ascending term order.
///
/// A term present in several segments is yielded once per segment; ties pop
/// in segment order. A read error is yielded once, after the entry popped
/// before it, and ends the stream.
pub struct MergeIterator<'a> {
    sources: Vec<InvertedIndexIter<'a>>,
    heads: Vec<Vec<DocId>>,
    heap: BinaryHeap<Reverse<(TermId, usize)>>,
    error: Option<IndexError>,
    failed: bool,
}

impl<'a> MergeIterator<'a> {
    pub fn new(segments: &'a [InvertedIndex]) -> Result<Self> {
        let mut it = Self {
            sources: segments.iter().map(InvertedIndex::iter).collect(),
            heads: vec![Vec::new(); segments.len()],
            heap: BinaryHeap::with_capacity(segments.len()),
            error: None,
            failed: false,
        };
        for seg in 0..segments.len() {
            it.pull(seg)?;
        }
        Ok(it)
    }

    fn pull(&mut self, seg: usize) -> Result<()> {
        if let Some(entry) = self.sources[seg].next() {
            let IndexEntry { term, postings } = entry?;
            self.heads[seg] = postings;
            self.heap.push(Reverse((term, seg)));
        }
        Ok(())
    }
}

impl Iterator for MergeIterator<'_> {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(e) = self.error.take() {
            self.failed = true;
            return Some(Err(e));
        }
        let Reverse((term, seg)) = self.heap.pop()?;
        let postings = std::mem::take(&mut self.heads[seg]);
        if let Err(e) = self.pull(seg) {
            self.error = Some(e);
        }
        Some(Ok(IndexEntry { term, postings }))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub terms: usize,
    pub postings: usize,
}

/// Writes the union of `segments` into `merged`, which must be open for writing.
///
/// Postings of a term are concatenated across segments, then sorted and
/// deduplicated before being appended.
pub fn merge_indexes(segments: &[InvertedIndex], merged: &mut InvertedIndex) -> Result<MergeStats> {
    let mut stats = MergeStats::default();
    let mut current: Option<(TermId, Vec<DocId>)> = None;

    let mut write = |term: TermId, mut postings: Vec<DocId>, merged: &mut InvertedIndex| -> Result<()> {
        postings.sort_unstable();
        postings.dedup();
        stats.terms += 1;
        stats.postings += postings.len();
        merged.append_posting_list(term, &postings)
    };

    for entry in MergeIterator::new(segments)? {
        let IndexEntry { term, postings } = entry?;
        if let Some((cur, acc)) = current.as_mut() {
            if *cur == term {
                acc.extend(postings);
                continue;
            }
        }
        if let Some((prev, acc)) = current.replace((term, postings)) {
            write(prev, acc, merged)?;
        }
    }
    if let Some((term, acc)) = current {
        write(term, acc, merged)?;
    }
    Ok(stats)
}

/// Field-length tables of all segments combined; a document split across
/// segments gets the sum of its parts.
pub fn merge_field_lengths(segments: &[InvertedIndex]) -> HashMap<DocId, u32> {
    let mut out = HashMap::new();
    for seg in segments {
        for (&doc, &len) in seg.get_len_field_in_doc() {
            *out.entry(doc).or_insert(0) += len;
        }
    }
    out
}

/// Opens the named segments, merges them into a fresh index `merged_name`
/// and closes it.
pub fn merge_segments(
    paths: &IndexPaths,
    segment_names: &[String],
    merged_name: &str,
    build_skip_lists: bool,
) -> Result<MergeStats> {
    let started = Instant::now();
    let mut segments = Vec::with_capacity(segment_names.len());
    for name in segment_names {
        let mut seg = InvertedIndex::new(paths, name.as_str());
        seg.open_reader()?;
        segments.push(seg);
    }

    let mut merged = InvertedIndex::new(paths, merged_name).with_skip_lists(build_skip_lists);
    merged.open_writer()?;
    let stats = match merge_indexes(&segments, &mut merged) {
        Ok(stats) => stats,
        Err(e) => {
            if let Err(cleanup) = merged.discard() {
                warn!(index = merged_name, error = %cleanup, "failed to remove partial merge");
            }
            return Err(e);
        }
    };
    merged.set_len_field_in_doc(merge_field_lengths(&segments));
    merged.close()?;

    info!(
        index = merged_name,
        segments = segment_names.len(),
        terms = stats.terms,
        postings = stats.postings,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "merged segments"
    );
    Ok(stats)
}

/// Deletes every file of the named segments.
pub fn remove_segments(paths: &IndexPaths, names: &[String]) -> Result<()> {
    for name in names {
        InvertedIndex::new(paths, name.as_str()).remove_files()?;
    }
    Ok(())
}
