use poi_index::{DocId, Document, DocumentSink, IndexError};
use std::io;
use std::path::Path;

/// Full place records keyed by document ID, kept next to the index in `docs.sled`.
pub struct SledDocStore {
    db: sled::Db,
}

impl SledDocStore {
    pub fn open<P: AsRef<Path>>(index_dir: P) -> anyhow::Result<Self> {
        let db = sled::open(index_dir.as_ref().join("docs.sled"))?;
        Ok(Self { db })
    }

    pub fn get(&self, id: DocId) -> anyhow::Result<Option<Document>> {
        match self.db.get(id.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn store_err(e: sled::Error) -> IndexError {
    IndexError::Io(io::Error::new(io::ErrorKind::Other, e))
}

impl DocumentSink for SledDocStore {
    fn save_docs(&self, docs: &[Document]) -> poi_index::Result<()> {
        let mut batch = sled::Batch::default();
        for doc in docs {
            batch.insert(doc.id.to_be_bytes().to_vec(), bincode::serialize(doc)?);
        }
        self.db.apply_batch(batch).map_err(store_err)
    }
}
