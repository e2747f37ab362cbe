//! The indexing run: batches of places in, merged per-field indexes out.

use crate::config::IndexerConfig;
use crate::dedup::DuplicateFilter;
use crate::document::{Document, DocumentSink, PlaceKind, PlaceRecord};
use crate::field::Field;
use crate::interner::TermInterner;
use crate::merge::{merge_segments, remove_segments};
use crate::persist::{self, IndexMeta, IndexPaths, MetaFile, FORMAT_VERSION};
use crate::segment::{SegmentBuilder, SegmentOutput, SegmentRegistry};
use crate::tokenizer::Tokenizer;
use crate::{DocId, IndexError, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

const PROGRESS_EVERY: DocId = 10_000;

/// Shared stop signal for an indexing run. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexSummary {
    pub docs: u32,
    pub terms: usize,
    pub name_segments: usize,
    pub address_segments: usize,
    pub skipped_unnamed: usize,
    pub duplicates: usize,
    pub elapsed_ms: u64,
}

#[derive(Default)]
struct RunState {
    next_doc: DocId,
    doc_word_count: HashMap<DocId, u32>,
    skipped_unnamed: usize,
    duplicates: usize,
}

/// Builds a searchable index from parsed places using bounded-memory SPIMI blocks.
///
/// One indexer performs one run: [`build`](Self::build) consumes it.
pub struct SpimiIndexer<T: Tokenizer, S: DocumentSink> {
    config: IndexerConfig,
    paths: IndexPaths,
    tokenizer: T,
    sink: S,
    interner: TermInterner,
    registry: SegmentRegistry,
    dedup: DuplicateFilter,
}

impl<T: Tokenizer, S: DocumentSink> SpimiIndexer<T, S> {
    pub fn new(config: IndexerConfig, tokenizer: T, sink: S) -> Self {
        let config = config.normalized();
        Self {
            paths: IndexPaths::new(&config.output_dir),
            config,
            tokenizer,
            sink,
            interner: TermInterner::new(),
            registry: SegmentRegistry::new(),
            dedup: DuplicateFilter::new(),
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Indexes way-derived places first, then node-derived places, merges the
    /// segments of each field and persists the run metadata.
    ///
    /// On error the cancellation flag is raised and segments already written
    /// stay on disk.
    pub fn build(self, ways: Vec<PlaceRecord>, nodes: Vec<PlaceRecord>, cancel: &CancellationFlag) -> Result<IndexSummary> {
        let started = Instant::now();
        std::fs::create_dir_all(&self.paths.root)?;
        info!(
            ways = ways.len(),
            nodes = nodes.len(),
            output = %self.paths.root.display(),
            "indexing places"
        );

        let state = Mutex::new(RunState::default());
        self.run_phase(ways, &state, cancel)?;
        self.run_phase(nodes, &state, cancel)?;
        let state = state.into_inner();

        let mut summary = IndexSummary {
            docs: state.next_doc,
            skipped_unnamed: state.skipped_unnamed,
            duplicates: state.duplicates,
            ..IndexSummary::default()
        };

        for field in Field::ALL {
            if cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }
            let names = self.registry.segments_for(field);
            merge_segments(&self.paths, &names, &field.merged_index_name(), self.config.build_skip_lists)?;
            if !self.config.keep_segments {
                remove_segments(&self.paths, &names)?;
                debug!(field = %field, segments = names.len(), "removed merged segments");
            }
            match field {
                Field::Name => summary.name_segments = names.len(),
                Field::Address => summary.address_segments = names.len(),
            }
        }

        summary.terms = self.interner.len();
        let meta = IndexMeta {
            interner: self.interner.snapshot(),
            doc_word_count: state.doc_word_count,
            docs_count: state.next_doc,
        };
        persist::save_index_meta(&self.paths, &meta)?;
        persist::save_meta(
            &self.paths,
            &MetaFile {
                num_docs: summary.docs,
                num_terms: summary.terms as u32,
                created_at: persist::now_rfc3339(),
                version: FORMAT_VERSION,
            },
        )?;

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            docs = summary.docs,
            terms = summary.terms,
            duplicates = summary.duplicates,
            elapsed_ms = summary.elapsed_ms,
            "index built"
        );
        Ok(summary)
    }

    fn run_phase(&self, places: Vec<PlaceRecord>, state: &Mutex<RunState>, cancel: &CancellationFlag) -> Result<()> {
        let mut queue = VecDeque::new();
        let mut places = places.into_iter().peekable();
        while places.peek().is_some() {
            queue.push_back(places.by_ref().take(self.config.batch_size).collect::<Vec<_>>());
        }
        if queue.is_empty() {
            return Ok(());
        }
        let workers = self.config.workers.min(queue.len());
        let queue = Mutex::new(queue);
        let first_error: Mutex<Option<IndexError>> = Mutex::new(None);

        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let Some(batch) = queue.lock().pop_front() else {
                        break;
                    };
                    if let Err(e) = self.process_batch(batch, state, cancel) {
                        cancel.cancel();
                        let mut slot = first_error.lock();
                        // a sibling's Cancelled must not mask the error that caused it
                        if slot.as_ref().map_or(true, IndexError::is_cancelled) {
                            if !e.is_cancelled() {
                                warn!(error = %e, "batch failed, cancelling run");
                            }
                            *slot = Some(e);
                        }
                        break;
                    }
                });
            }
        });

        match first_error.into_inner() {
            Some(e) => Err(e),
            None if cancel.is_cancelled() => Err(IndexError::Cancelled),
            None => Ok(()),
        }
    }

    fn process_batch(&self, batch: Vec<PlaceRecord>, state: &Mutex<RunState>, cancel: &CancellationFlag) -> Result<()> {
        let mut docs = Vec::with_capacity(batch.len());
        for place in &batch {
            if cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }
            if place.name.is_empty() && !(place.kind == PlaceKind::Way && place.highway) {
                state.lock().skipped_unnamed += 1;
                continue;
            }
            if self.dedup.is_duplicate(&place.name, &place.location) {
                state.lock().duplicates += 1;
                continue;
            }
            let id = {
                let mut st = state.lock();
                let id = st.next_doc;
                st.next_doc += 1;
                id
            };
            if id % PROGRESS_EVERY == 0 {
                info!(doc_id = id, "indexing places");
            }
            docs.push(Document::from_place(id, place));
        }
        if docs.is_empty() {
            return Ok(());
        }

        let (name, address) = thread::scope(|s| {
            let name = s.spawn(|| self.invert(Field::Name, &docs, cancel));
            let address = s.spawn(|| self.invert(Field::Address, &docs, cancel));
            (join(name.join()), join(address.join()))
        });
        let (name, address) = (name?, address?);

        {
            let mut st = state.lock();
            for (doc, len) in name.field_lengths.into_iter().chain(address.field_lengths) {
                *st.doc_word_count.entry(doc).or_insert(0) += len;
            }
        }
        self.sink.save_docs(&docs)
    }

    fn invert(&self, field: Field, docs: &[Document], cancel: &CancellationFlag) -> Result<SegmentOutput> {
        SegmentBuilder::new(field, &self.interner, &self.tokenizer, &self.registry, &self.paths, cancel)
            .with_max_postings(self.config.max_postings_per_segment)
            .invert(docs)
    }
}

fn join<R>(res: thread::Result<R>) -> R {
    res.unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
