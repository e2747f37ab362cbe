use crate::field::Field;
use crate::interner::TermInterner;
use crate::inverted_index::InvertedIndex;
use crate::persist::{self, IndexMeta, IndexPaths};
use crate::skiplist::{fast_posting_lists_intersection, posting_list_intersection};
use crate::{DocId, Result, TermId};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Read-only view over a finished index directory.
pub struct MainIndex {
    paths: IndexPaths,
    interner: TermInterner,
    fields: [InvertedIndex; 2],
    doc_word_count: HashMap<DocId, u32>,
    docs_count: u32,
    average_doc_length: f64,
}

impl MainIndex {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let paths = IndexPaths::new(dir);
        let meta = persist::load_index_meta(&paths)?;
        let average_doc_length = meta.average_doc_length();
        let IndexMeta { interner, doc_word_count, docs_count } = meta;

        let mut interner = TermInterner::from_snapshot(interner);
        interner.build_vocabulary();

        let fields = [open_field(&paths, Field::Name)?, open_field(&paths, Field::Address)?];
        debug!(
            dir = %paths.root.display(),
            docs = docs_count,
            terms = interner.len(),
            "opened index"
        );
        Ok(Self { paths, interner, fields, doc_word_count, docs_count, average_doc_length })
    }

    pub fn root(&self) -> &Path {
        &self.paths.root
    }

    pub fn interner(&self) -> &TermInterner {
        &self.interner
    }

    pub fn field_index(&self, field: Field) -> &InvertedIndex {
        &self.fields[field.slot()]
    }

    pub fn doc_count(&self) -> u32 {
        self.docs_count
    }

    pub fn average_doc_length(&self) -> f64 {
        self.average_doc_length
    }

    /// Tokens of `doc` over all fields.
    pub fn doc_word_count(&self, doc: DocId) -> Option<u32> {
        self.doc_word_count.get(&doc).copied()
    }

    /// Documents whose `field` contains `term`; empty when the term was never indexed.
    pub fn posting_list(&self, field: Field, term: &str) -> Result<Vec<DocId>> {
        match self.interner.lookup(term) {
            Some(id) => self.field_index(field).get_posting_list(id),
            None => Ok(Vec::new()),
        }
    }

    /// Documents whose `field` contains every one of `terms`.
    ///
    /// Lists are intersected shortest first. With stored skip lists the first
    /// pair uses [`fast_posting_lists_intersection`] and the remaining lists
    /// are checked by skip-list search; without them a linear merge is used.
    pub fn conjunctive<S: AsRef<str>>(&self, field: Field, terms: &[S]) -> Result<Vec<DocId>> {
        let index = self.field_index(field);
        let mut ids: Vec<(TermId, u32)> = Vec::with_capacity(terms.len());
        for term in terms {
            let Some(id) = self.interner.lookup(term.as_ref()) else {
                return Ok(Vec::new());
            };
            let Some(meta) = index.posting_meta(id) else {
                return Ok(Vec::new());
            };
            ids.push((id, meta.list_len));
        }
        ids.sort_unstable_by_key(|&(id, len)| (len, id));
        ids.dedup_by_key(|&mut (id, _)| id);

        match ids.as_slice() {
            [] => Ok(Vec::new()),
            [(only, _)] => index.get_posting_list(*only),
            [(a, _), (b, _), rest @ ..] => {
                if let (Some(sa), Some(sb)) = (index.get_skip_list(*a)?, index.get_skip_list(*b)?) {
                    let mut result = fast_posting_lists_intersection(&sa, &sb);
                    for (term, _) in rest {
                        if result.is_empty() {
                            break;
                        }
                        match index.get_skip_list(*term)? {
                            Some(sl) => result.retain(|&doc| sl.contains(doc)),
                            None => result = posting_list_intersection(&result, &index.get_posting_list(*term)?),
                        }
                    }
                    return Ok(result);
                }
                let mut result = posting_list_intersection(&index.get_posting_list(*a)?, &index.get_posting_list(*b)?);
                for (term, _) in rest {
                    if result.is_empty() {
                        break;
                    }
                    result = posting_list_intersection(&result, &index.get_posting_list(*term)?);
                }
                Ok(result)
            }
        }
    }
}

fn open_field(paths: &IndexPaths, field: Field) -> Result<InvertedIndex> {
    let mut index = InvertedIndex::new(paths, field.merged_index_name());
    index.open_reader()?;
    Ok(index)
}
