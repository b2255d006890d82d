//! Import pipeline
//!
//! End-to-end orchestration of one run: validate the input, prepare the
//! destination collections, then stream, convert, batch, and flush each
//! record kind in turn. A single logical thread of control drives the whole
//! run; points are fully flushed before paths begin, and paths before groups.
//!
//! There is no retry and no rollback: any error terminates the run, leaving
//! already-flushed batches committed and pending records lost.

use mapdepot_common::{ImportError, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use crate::batch::{BatchAccumulator, FLUSH_INTERVAL};
use crate::entity::Entity;
use crate::progress::{ImportCounts, NullProgress, ProgressReporter};
use crate::storage::{CollectionSpec, StorageSink};
use crate::stream::{RecordKind, RecordStream};

/// One-shot importer of a map-data export into a storage sink
///
/// The sink connection is held for the duration of the run and reused across
/// all preparation calls and flushes.
pub struct Importer<S> {
    source: PathBuf,
    sink: S,
    progress: Box<dyn ProgressReporter>,
    flush_interval: Duration,
}

impl<S: StorageSink> Importer<S> {
    /// Create an importer over `source` writing to `sink`
    pub fn new(source: impl Into<PathBuf>, sink: S) -> Self {
        Self {
            source: source.into(),
            sink,
            progress: Box::new(NullProgress),
            flush_interval: FLUSH_INTERVAL,
        }
    }

    /// Attach a progress reporter
    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Override the batching interval
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// The storage sink this importer writes to
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run the full import: validate, prepare, then import each kind in order
    ///
    /// Returns the per-kind totals on success. Any error is terminal; records
    /// already flushed remain in storage.
    pub async fn run(&self) -> Result<ImportCounts> {
        self.validate()?;

        info!(source = %self.source.display(), "Preparing destination collections");
        self.prepare().await?;
        info!("Destination prepared. Importing data...");

        let mut counts = ImportCounts::default();
        for kind in RecordKind::ALL {
            self.import_kind(kind, &mut counts).await?;
        }

        self.progress.on_complete(counts);
        info!(
            points = counts.points,
            paths = counts.paths,
            groups = counts.groups,
            "Import complete"
        );

        Ok(counts)
    }

    /// The source path must reference an existing, readable file before
    /// storage is contacted
    fn validate(&self) -> Result<()> {
        let readable = std::fs::File::open(&self.source).is_ok();
        let is_file = self
            .source
            .metadata()
            .map(|m| m.is_file())
            .unwrap_or(false);

        if !readable || !is_file {
            return Err(ImportError::InputNotFound(
                self.source.display().to_string(),
            ));
        }

        Ok(())
    }

    /// Reset and index all three destination collections
    ///
    /// A full reload, never an incremental merge: any storage error here
    /// aborts the run before a single record is read.
    async fn prepare(&self) -> Result<()> {
        for kind in RecordKind::ALL {
            self.sink
                .prepare_collection(&CollectionSpec::for_kind(kind))
                .await?;
        }
        Ok(())
    }

    /// Stream one kind from a fresh pass over the source file, converting and
    /// flushing time-bounded batches as the stream advances
    async fn import_kind(&self, kind: RecordKind, counts: &mut ImportCounts) -> Result<()> {
        info!(kind = %kind, collection = kind.collection_name(), "Importing records");

        let stream = RecordStream::open(&self.source, kind)?;
        let mut accumulator = BatchAccumulator::with_interval(Instant::now(), self.flush_interval);

        for raw in stream {
            let entity = Entity::build_from(&raw?)?;
            if let Some(batch) = accumulator.push(entity, Instant::now()) {
                self.flush(&batch, kind, counts).await?;
            }
        }

        // Final flush on exhaustion, regardless of elapsed time. An empty
        // pending batch has nothing to write but still refreshes the line.
        let last = accumulator.finish();
        if last.is_empty() {
            self.progress.on_progress(*counts);
        } else {
            self.flush(&last, kind, counts).await?;
        }

        Ok(())
    }

    async fn flush(&self, batch: &[Entity], kind: RecordKind, counts: &mut ImportCounts) -> Result<()> {
        self.sink.write_batch(batch, kind.collection_name()).await?;
        counts.add(kind, batch.len());
        self.progress.on_progress(*counts);
        Ok(())
    }
}
