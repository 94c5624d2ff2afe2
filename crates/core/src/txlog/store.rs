//! Document stores for per-transaction logs.

use super::TxDocument;
use crate::config::StoreConfig;
use scopetrace_utils::errors::StoreError;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Destination for [`TxDocument`]s, one insert per transaction.
pub trait DocumentStore {
    /// Persists one document.
    fn insert(&mut self, doc: &TxDocument) -> Result<(), StoreError>;
}

/// Keeps documents in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Vec<TxDocument>,
}

impl MemoryStore {
    /// Documents inserted so far.
    pub fn documents(&self) -> &[TxDocument] {
        &self.docs
    }
}

impl DocumentStore for MemoryStore {
    fn insert(&mut self, doc: &TxDocument) -> Result<(), StoreError> {
        self.docs.push(doc.clone());
        Ok(())
    }
}

#[derive(Serialize)]
struct StoredDocument<'a> {
    collection: &'a str,
    #[serde(flatten)]
    doc: &'a TxDocument,
}

/// Appends documents to a file, one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    path: PathBuf,
    collection: String,
}

impl JsonLinesStore {
    /// Creates a store writing to `path`, tagging documents with `collection`.
    pub fn new(path: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            collection: collection.into(),
        }
    }

    /// Creates a store from configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.path.clone(), config.collection.clone())
    }

    /// The file documents are appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for JsonLinesStore {
    fn insert(&mut self, doc: &TxDocument) -> Result<(), StoreError> {
        let line = serde_json::to_string(&StoredDocument {
            collection: &self.collection,
            doc,
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        tracing::debug!("stored tx {} in {}", doc.tx, self.path.display());
        Ok(())
    }
}
