//! In-memory storage sink
//!
//! Mirrors the sink contract closely enough for the end-to-end tests:
//! prepare resets the collection and records its index set, and a batch
//! write is rejected wholesale when any document's identity collides with
//! one already stored.

use async_trait::async_trait;
use mapdepot_common::{ImportError, Result};
use mongodb::bson::{to_document, Bson, Document};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{CollectionSpec, StorageSink};
use crate::entity::Entity;

#[derive(Debug, Default)]
struct MemoryCollection {
    documents: Vec<Document>,
    indexes: Vec<String>,
    prepare_count: usize,
}

/// Storage sink that keeps documents in process memory
#[derive(Debug, Default)]
pub struct MemorySink {
    collections: Mutex<HashMap<String, MemoryCollection>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents stored in a collection, in insertion order
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    /// Index names declared for a collection
    pub fn indexes(&self, collection: &str) -> Vec<String> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.indexes.clone())
            .unwrap_or_default()
    }

    /// How many times a collection has been prepared
    pub fn prepare_count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.prepare_count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl StorageSink for MemorySink {
    async fn prepare_collection(&self, spec: &CollectionSpec) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        let entry = collections.entry(spec.name.to_string()).or_default();

        entry.documents.clear();
        entry.indexes = vec!["tagKeys_1".to_string()];
        if spec.geo_index {
            entry.indexes.push("location_2dsphere".to_string());
        }
        entry.prepare_count += 1;

        Ok(())
    }

    async fn write_batch(&self, batch: &[Entity], collection: &str) -> Result<()> {
        let documents = batch
            .iter()
            .map(to_document)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ImportError::Serialization(e.to_string()))?;

        let mut collections = self.collections.lock().unwrap();
        let entry = collections.entry(collection.to_string()).or_default();

        for document in &documents {
            let id = document.get("_id").cloned().unwrap_or(Bson::Null);
            if entry.documents.iter().any(|stored| stored.get("_id") == Some(&id)) {
                return Err(ImportError::duplicate_identity(
                    collection,
                    format!("identity {id} already stored"),
                ));
            }
        }

        entry.documents.extend(documents);
        Ok(())
    }
}
