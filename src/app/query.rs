// EventReport - app/query.rs
//
// Query orchestration: open a log source, read batches until an empty batch,
// normalise each raw record, keep the ones that pass the filter.
//
// Architecture:
//   - `QueryEngine::stream` opens the handle and returns a lazy `EventStream`.
//     The stream owns the handle; it is closed exactly once, when the stream
//     reaches end-of-log, fails, is interrupted, or is dropped early.
//   - A `CancelToken` (shared `AtomicBool`) and an optional deadline are
//     checked at every batch boundary, never mid-batch.
//   - Records come out in the order the source delivered them. No sorting.
//   - A record that fails normalisation is skipped with a warning; any read
//     error ends the query.

use crate::core::filter::FilterCriteria;
use crate::core::model::{EventRecord, RawRecord};
use crate::core::normalize::normalize;
use crate::core::source::{LogHandle, LogSource};
use crate::util::constants::MAX_SKIP_WARNINGS_PER_QUERY;
use crate::util::error::QueryError;
use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

// =============================================================================
// Cancellation and options
// =============================================================================

/// Cooperative cancel flag. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next batch boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-query interruption settings. The default never interrupts.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub cancel: Option<CancelToken>,
    /// Advisory: checked only between batch reads.
    pub deadline: Option<Instant>,
}

impl QueryOptions {
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Counters for one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Non-empty batches read.
    pub batches: usize,
    /// Raw records received.
    pub records_read: usize,
    /// Records that failed normalisation.
    pub skipped: usize,
    /// Records that passed the filter.
    pub delivered: usize,
}

// =============================================================================
// QueryEngine
// =============================================================================

/// Runs filtered queries against one `LogSource`.
///
/// The engine holds no per-query state, so independent queries may run
/// concurrently on a shared engine when the source is `Sync`.
#[derive(Debug, Clone)]
pub struct QueryEngine<S> {
    source: S,
}

impl<S: LogSource> QueryEngine<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Open `channel` on `host` and return the lazy, single-pass record
    /// stream. Fails immediately with `QueryError::Connection` if the open
    /// fails; no handle exists in that case, so nothing is closed.
    pub fn stream(
        &self,
        host: &str,
        channel: &str,
        criteria: FilterCriteria,
        options: QueryOptions,
    ) -> Result<EventStream<S::Handle>, QueryError> {
        tracing::info!(host, channel, filtered = !criteria.is_empty(), "Opening event log");

        let handle = self.source.open(host, channel).map_err(|e| {
            tracing::warn!(host, channel, error = %e, "Event log open failed");
            QueryError::Connection(e)
        })?;

        Ok(EventStream {
            host: host.to_string(),
            channel: channel.to_string(),
            criteria,
            options,
            handle: Some(handle),
            pending: VecDeque::new(),
            stats: QueryStats::default(),
        })
    }

    /// Run a query to completion and collect the matching records.
    ///
    /// An empty `Ok` vector means the log was read and nothing matched.
    pub fn run(
        &self,
        host: &str,
        channel: &str,
        criteria: FilterCriteria,
    ) -> Result<Vec<EventRecord>, QueryError> {
        self.run_with(host, channel, criteria, QueryOptions::default())
    }

    /// `run` with cancellation and deadline.
    pub fn run_with(
        &self,
        host: &str,
        channel: &str,
        criteria: FilterCriteria,
        options: QueryOptions,
    ) -> Result<Vec<EventRecord>, QueryError> {
        self.stream(host, channel, criteria, options)?.collect()
    }
}

// =============================================================================
// EventStream
// =============================================================================

/// Lazy, finite, non-restartable sequence of matching records.
///
/// Yields `Err` at most once, after which it is exhausted. The underlying
/// read cursor cannot be rewound; start a new query to read again.
pub struct EventStream<H: LogHandle> {
    host: String,
    channel: String,
    criteria: FilterCriteria,
    options: QueryOptions,
    /// `Some` while the handle is open.
    handle: Option<H>,
    pending: VecDeque<RawRecord>,
    stats: QueryStats,
}

impl<H: LogHandle> EventStream<H> {
    pub fn stats(&self) -> QueryStats {
        self.stats
    }

    /// True once the handle has been released.
    pub fn is_finished(&self) -> bool {
        self.handle.is_none()
    }

    fn interruption(&self) -> Option<QueryError> {
        let cancelled = self
            .options
            .cancel
            .as_ref()
            .is_some_and(CancelToken::is_cancelled);
        if cancelled {
            return Some(QueryError::Cancelled {
                host: self.host.clone(),
                channel: self.channel.clone(),
                delivered: self.stats.delivered,
            });
        }

        if self.options.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(QueryError::DeadlineExceeded {
                host: self.host.clone(),
                channel: self.channel.clone(),
                delivered: self.stats.delivered,
            });
        }

        None
    }

    /// Release the handle (once) and drop anything still buffered.
    fn finish(&mut self, outcome: &'static str) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
            self.pending.clear();
            tracing::info!(
                host = %self.host,
                channel = %self.channel,
                outcome,
                batches = self.stats.batches,
                read = self.stats.records_read,
                skipped = self.stats.skipped,
                delivered = self.stats.delivered,
                "Event log closed"
            );
        }
    }

    fn process(&mut self, raw: RawRecord) -> Option<EventRecord> {
        match normalize(&raw) {
            Ok(record) if self.criteria.matches(&record) => {
                self.stats.delivered += 1;
                Some(record)
            }
            Ok(_) => None,
            Err(e) => {
                self.stats.skipped += 1;
                if self.stats.skipped <= MAX_SKIP_WARNINGS_PER_QUERY {
                    tracing::warn!(
                        host = %self.host,
                        channel = %self.channel,
                        error = %e,
                        "Skipping malformed record"
                    );
                }
                None
            }
        }
    }
}

impl<H: LogHandle> Iterator for EventStream<H> {
    type Item = Result<EventRecord, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.handle.is_none() {
                return None;
            }

            if let Some(raw) = self.pending.pop_front() {
                if let Some(record) = self.process(raw) {
                    return Some(Ok(record));
                }
                continue;
            }

            // Batch boundary.
            if let Some(err) = self.interruption() {
                self.finish("interrupted");
                return Some(Err(err));
            }

            let read = match self.handle.as_mut() {
                Some(handle) => handle.read_next_batch(),
                None => return None,
            };

            match read {
                Ok(batch) if batch.is_empty() => {
                    self.finish("end-of-log");
                    return None;
                }
                Ok(batch) => {
                    self.stats.batches += 1;
                    self.stats.records_read += batch.len();
                    tracing::debug!(
                        channel = %self.channel,
                        batch = self.stats.batches,
                        records = batch.len(),
                        "Batch read"
                    );
                    self.pending.extend(batch);
                }
                Err(source) => {
                    self.finish("read-error");
                    return Some(Err(QueryError::Read {
                        host: self.host.clone(),
                        channel: self.channel.clone(),
                        source,
                    }));
                }
            }
        }
    }
}

impl<H: LogHandle> FusedIterator for EventStream<H> {}

impl<H: LogHandle> Drop for EventStream<H> {
    fn drop(&mut self) {
        self.finish("abandoned");
    }
}
