//! MongoDB storage sink

use async_trait::async_trait;
use mapdepot_common::{ImportError, Result};
use mongodb::bson::{doc, to_document, Document};
use mongodb::{Client, Database, IndexModel};
use tracing::debug;

use super::{CollectionSpec, StorageSink};
use crate::entity::Entity;

/// Storage sink backed by a MongoDB database
///
/// The connection string must name the destination database, e.g.
/// `mongodb://localhost:27017/mapdepot`.
pub struct MongoSink {
    db: Database,
}

impl MongoSink {
    /// Connect using a connection string
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let client = Client::with_uri_str(connection_string)
            .await
            .map_err(|e| ImportError::storage(e.to_string()))?;

        let db = client.default_database().ok_or_else(|| {
            ImportError::config(format!(
                "connection string '{connection_string}' does not name a database"
            ))
        })?;

        Ok(Self { db })
    }
}

#[async_trait]
impl StorageSink for MongoSink {
    async fn prepare_collection(&self, spec: &CollectionSpec) -> Result<()> {
        let collection = self.db.collection::<Document>(spec.name);

        // Dropping a missing collection is a no-op, so reset is idempotent.
        collection
            .drop()
            .await
            .map_err(|e| ImportError::storage(e.to_string()))?;
        self.db
            .create_collection(spec.name)
            .await
            .map_err(|e| ImportError::storage(e.to_string()))?;

        let tag_keys_index = IndexModel::builder().keys(doc! { "tagKeys": 1 }).build();
        collection
            .create_index(tag_keys_index)
            .await
            .map_err(|e| ImportError::storage(e.to_string()))?;

        if spec.geo_index {
            let geo_index = IndexModel::builder()
                .keys(doc! { "location": "2dsphere" })
                .build();
            collection
                .create_index(geo_index)
                .await
                .map_err(|e| ImportError::storage(e.to_string()))?;
        }

        debug!(collection = spec.name, "Collection reset and indexed");
        Ok(())
    }

    async fn write_batch(&self, batch: &[Entity], collection: &str) -> Result<()> {
        let documents = batch
            .iter()
            .map(to_document)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ImportError::Serialization(e.to_string()))?;

        self.db
            .collection::<Document>(collection)
            .insert_many(documents)
            .await
            .map_err(|e| classify_write_error(e.to_string(), collection))?;

        Ok(())
    }
}

/// Map a driver error from a bulk insert onto the import taxonomy
///
/// Identity collisions surface as duplicate-key failures (server code 11000,
/// reported as E11000 in the message); everything else means the sink is
/// unavailable or rejecting writes wholesale.
fn classify_write_error(message: String, collection: &str) -> ImportError {
    if message.contains("E11000") || message.contains("duplicate key") {
        ImportError::duplicate_identity(collection, message)
    } else {
        ImportError::StorageUnavailable(message)
    }
}
