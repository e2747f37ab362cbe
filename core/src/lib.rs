//! Inverted-index construction and posting-list storage for place search.
//!
//! Documents flow through [`pipeline::SpimiIndexer`], which builds bounded
//! in-memory blocks per field ([`segment::SegmentBuilder`]), flushes them as
//! immutable segments ([`inverted_index::InvertedIndex`]) and k-way merges
//! them ([`merge`]) into one index per [`Field`]. At query time
//! [`reader::MainIndex`] serves posting lists and skip-list backed
//! intersections.

pub mod codec;
pub mod config;
pub mod dedup;
pub mod document;
pub mod error;
pub mod field;
pub mod interner;
pub mod inverted_index;
pub mod merge;
pub mod persist;
pub mod pipeline;
pub mod reader;
pub mod segment;
pub mod skiplist;
pub mod tokenizer;

pub type TermId = u32;
pub type DocId = u32;

pub use config::IndexerConfig;
pub use document::{BoundingBox, Document, DocumentSink, Location, PlaceKind, PlaceRecord};
pub use error::{IndexError, Result};
pub use field::Field;
pub use interner::TermInterner;
pub use inverted_index::{IndexEntry, InvertedIndex};
pub use pipeline::{CancellationFlag, IndexSummary, SpimiIndexer};
pub use reader::MainIndex;
pub use skiplist::{fast_posting_lists_intersection, SkipList, SkipListReader};
pub use tokenizer::{TextTokenizer, Tokenizer};
