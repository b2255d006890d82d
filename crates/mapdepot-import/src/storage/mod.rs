//! Storage sink abstraction
//!
//! The destination document store is an external collaborator, specified only
//! at this interface: collection reset, index creation, and bulk insert.
//! [`mongo::MongoSink`] is the production implementation; [`memory::MemorySink`]
//! backs the end-to-end tests.

use async_trait::async_trait;
use mapdepot_common::Result;

use crate::entity::Entity;
use crate::stream::RecordKind;

pub mod memory;
pub mod mongo;

pub use memory::MemorySink;
pub use mongo::MongoSink;

/// Declarative description of a destination collection and its indexes
///
/// Every collection carries a non-unique index over `tagKeys`; the point
/// collection additionally carries a geospatial index over `location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub geo_index: bool,
}

impl CollectionSpec {
    /// The collection spec for one record kind
    pub fn for_kind(kind: RecordKind) -> Self {
        Self {
            name: kind.collection_name(),
            geo_index: matches!(kind, RecordKind::Point),
        }
    }
}

/// Destination document store for an import run
///
/// One sink instance is held for the duration of a run and reused across all
/// preparation calls and flushes.
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Idempotently reset the collection: drop-if-exists, recreate, and build
    /// the declared indexes. Guarantees the run starts from a clean, indexed
    /// destination.
    async fn prepare_collection(&self, spec: &CollectionSpec) -> Result<()>;

    /// Bulk-insert one batch into the named collection
    ///
    /// The write is at-least-once and all-or-nothing: an identity collision
    /// with an already-stored document rejects the entire batch, and no retry
    /// is attempted.
    async fn write_batch(&self, batch: &[Entity], collection: &str) -> Result<()>;
}
