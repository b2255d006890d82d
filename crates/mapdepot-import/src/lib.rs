//! Mapdepot Import Library
//!
//! Streams a map-data export into a document store, preserving identity,
//! authorship, versioning, tags, and geometric relationships. Built for
//! one-shot batch conversions over files too large to hold in memory.
//!
//! The pipeline makes one pass over the source file per record kind,
//! converting records into typed entities and flushing them in time-bounded
//! batches:
//!
//! ```no_run
//! use mapdepot_import::pipeline::Importer;
//! use mapdepot_import::storage::MongoSink;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sink = MongoSink::connect("mongodb://localhost:27017/mapdepot").await?;
//!     let counts = Importer::new("region.xml", sink).run().await?;
//!     println!("imported {} records", counts.total());
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod entity;
pub mod pipeline;
pub mod progress;
pub mod storage;
pub mod stream;

pub use entity::Entity;
pub use pipeline::Importer;
pub use progress::ImportCounts;
pub use stream::{RawRecord, RecordKind, RecordStream};
