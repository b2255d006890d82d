//! Time-bounded batching of converted entities
//!
//! A batch flushes when the elapsed time since the last flush exceeds a fixed
//! threshold and at least one record is pending, or unconditionally when the
//! stream is exhausted. The trigger is time-based rather than count-based:
//! record sizes vary enormously between kinds, so a fixed record count would
//! produce wildly uneven payload sizes, while a time trigger bounds both
//! memory and per-batch latency regardless of record shape.
//!
//! The flush decision is a pure function of the clock reading, the last flush
//! time, and the pending count; callers supply the clock reading, which is
//! what lets tests drive a synthetic clock.

use std::time::{Duration, Instant};

/// Elapsed time after which a pending batch flushes
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(250);

/// Decide whether a pending batch should flush at `now`
pub fn should_flush(now: Instant, last_flush: Instant, pending: usize, interval: Duration) -> bool {
    pending > 0 && now.duration_since(last_flush) > interval
}

/// Accumulates entities of one kind between flushes
#[derive(Debug)]
pub struct BatchAccumulator<T> {
    pending: Vec<T>,
    last_flush: Instant,
    interval: Duration,
}

impl<T> BatchAccumulator<T> {
    /// Create an accumulator whose elapsed-time measurement starts at `now`
    pub fn new(now: Instant) -> Self {
        Self::with_interval(now, FLUSH_INTERVAL)
    }

    /// Create an accumulator with a custom flush interval
    pub fn with_interval(now: Instant, interval: Duration) -> Self {
        Self {
            pending: Vec::new(),
            last_flush: now,
            interval,
        }
    }

    /// Append one entity, returning a full batch when the interval has elapsed
    ///
    /// The flush decision is taken before the append, so the entity passed
    /// here always lands in the batch after the one returned. Returning a
    /// batch resets the elapsed-time measurement to `now`.
    pub fn push(&mut self, item: T, now: Instant) -> Option<Vec<T>> {
        let due = should_flush(now, self.last_flush, self.pending.len(), self.interval);
        let drained = if due {
            self.last_flush = now;
            Some(std::mem::take(&mut self.pending))
        } else {
            None
        };

        self.pending.push(item);
        drained
    }

    /// Drain whatever is pending for the final, unconditional flush
    pub fn finish(self) -> Vec<T> {
        self.pending
    }

    /// Number of entities awaiting the next flush
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(250);

    #[test]
    fn test_no_flush_before_threshold() {
        let t0 = Instant::now();
        let mut acc = BatchAccumulator::with_interval(t0, INTERVAL);

        assert!(acc.push(1, t0).is_none());
        assert!(acc.push(2, t0 + Duration::from_millis(100)).is_none());
        assert!(acc.push(3, t0 + Duration::from_millis(250)).is_none());
        assert_eq!(acc.pending_len(), 3);
    }

    #[test]
    fn test_flush_after_threshold_with_pending_records() {
        let t0 = Instant::now();
        let mut acc = BatchAccumulator::with_interval(t0, INTERVAL);

        acc.push(1, t0);
        acc.push(2, t0 + Duration::from_millis(200));

        let batch = acc.push(3, t0 + Duration::from_millis(260));
        assert_eq!(batch, Some(vec![1, 2]));
        // the triggering entity starts the next batch
        assert_eq!(acc.pending_len(), 1);
    }

    #[test]
    fn test_elapsed_time_resets_on_flush() {
        let t0 = Instant::now();
        let mut acc = BatchAccumulator::with_interval(t0, INTERVAL);

        acc.push(1, t0);
        let first = acc.push(2, t0 + Duration::from_millis(300));
        assert_eq!(first, Some(vec![1]));

        // measured from the flush at t0+300, not from t0
        assert!(acc.push(3, t0 + Duration::from_millis(500)).is_none());
        let second = acc.push(4, t0 + Duration::from_millis(600));
        assert_eq!(second, Some(vec![2, 3]));
    }

    #[test]
    fn test_no_flush_when_nothing_pending() {
        let t0 = Instant::now();
        let mut acc = BatchAccumulator::with_interval(t0, INTERVAL);

        // well past the threshold, but this is the first record since reset
        assert!(acc.push(1, t0 + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn test_finish_drains_final_partial_batch() {
        let t0 = Instant::now();
        let mut acc = BatchAccumulator::with_interval(t0, INTERVAL);

        acc.push(1, t0);
        acc.push(2, t0 + Duration::from_millis(10));

        // exhaustion before the threshold still yields exactly one final batch
        assert_eq!(acc.finish(), vec![1, 2]);
    }

    #[test]
    fn test_finish_on_empty_stream_is_empty() {
        let t0 = Instant::now();
        let acc: BatchAccumulator<i32> = BatchAccumulator::with_interval(t0, INTERVAL);
        assert!(acc.finish().is_empty());
    }

    #[test]
    fn test_batch_completeness_and_order() {
        let t0 = Instant::now();
        let mut acc = BatchAccumulator::with_interval(t0, INTERVAL);
        let mut flushed = Vec::new();

        for i in 0..100 {
            let now = t0 + Duration::from_millis(i * 40);
            if let Some(batch) = acc.push(i, now) {
                flushed.extend(batch);
            }
        }
        flushed.extend(acc.finish());

        assert_eq!(flushed, (0..100).collect::<Vec<_>>());
    }
}
