// EventReport - core/source.rs
//
// Log source abstraction: open a named channel on a named host, then read
// raw records forward in batches until an empty batch signals end-of-log.
//
// The native implementation lives in platform::eventlog. `MemorySource`
// below is the in-memory implementation used by tests and demos.

use crate::core::model::RawRecord;
use crate::util::error::{ConnectionError, ConnectionFailure, ReadError};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Something that can open event-log channels.
pub trait LogSource {
    type Handle: LogHandle;

    /// Open `channel` on `host`. Fails when the host is unreachable, the
    /// channel is unknown, or the caller may not read it.
    fn open(&self, host: &str, channel: &str) -> Result<Self::Handle, ConnectionError>;
}

/// An open, forward-only read cursor over one channel.
pub trait LogHandle {
    /// Next batch in chronological order. An empty batch means end-of-log.
    /// Batch boundaries never duplicate or drop records.
    fn read_next_batch(&mut self) -> Result<Vec<RawRecord>, ReadError>;

    /// Release the handle. Called exactly once by the query engine, after
    /// end-of-log, after an error, or when the query is abandoned.
    fn close(&mut self);
}

// =============================================================================
// In-memory source
// =============================================================================

/// One scripted step of a `MemorySource` channel.
#[derive(Debug, Clone)]
pub enum Scripted {
    Batch(Vec<RawRecord>),
    Fail(ReadError),
}

/// Counters shared between a `MemorySource` and every handle it opened.
#[derive(Debug, Default)]
pub struct SourceStats {
    opens: AtomicUsize,
    reads: AtomicUsize,
    closes: AtomicUsize,
}

impl SourceStats {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// In-memory `LogSource` keyed by `(host, channel)`.
///
/// Each channel is a script of batches (and optionally read failures)
/// replayed once per open. Once the script runs out every read returns an
/// empty batch. Unregistered hosts fail with `HostUnreachable`; unknown
/// channels on a registered host fail with `ChannelNotFound`.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    channels: HashMap<(String, String), Vec<Scripted>>,
    denied: Vec<(String, String)>,
    stats: Arc<SourceStats>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel whose records arrive in the given batches.
    pub fn with_batches(mut self, host: &str, channel: &str, batches: Vec<Vec<RawRecord>>) -> Self {
        let script = batches.into_iter().map(Scripted::Batch).collect();
        self.channels
            .insert((host.to_lowercase(), channel.to_lowercase()), script);
        self
    }

    /// Register a channel from an explicit script.
    pub fn with_script(mut self, host: &str, channel: &str, script: Vec<Scripted>) -> Self {
        self.channels
            .insert((host.to_lowercase(), channel.to_lowercase()), script);
        self
    }

    /// Register a channel that refuses to open with `AccessDenied`.
    pub fn with_denied(mut self, host: &str, channel: &str) -> Self {
        self.denied.push((host.to_lowercase(), channel.to_lowercase()));
        self
    }

    /// Counters covering every handle opened from this source (and clones).
    pub fn stats(&self) -> Arc<SourceStats> {
        Arc::clone(&self.stats)
    }
}

impl LogSource for MemorySource {
    type Handle = MemoryHandle;

    fn open(&self, host: &str, channel: &str) -> Result<MemoryHandle, ConnectionError> {
        let key = (host.to_lowercase(), channel.to_lowercase());

        if self.denied.contains(&key) {
            return Err(ConnectionError::new(host, channel, ConnectionFailure::AccessDenied));
        }

        match self.channels.get(&key) {
            Some(script) => {
                self.stats.opens.fetch_add(1, Ordering::SeqCst);
                Ok(MemoryHandle {
                    pending: script.iter().cloned().collect(),
                    stats: Arc::clone(&self.stats),
                    closed: false,
                })
            }
            None => {
                let host_known = self.channels.keys().any(|(h, _)| *h == key.0)
                    || self.denied.iter().any(|(h, _)| *h == key.0);
                let kind = if host_known {
                    ConnectionFailure::ChannelNotFound
                } else {
                    ConnectionFailure::HostUnreachable
                };
                Err(ConnectionError::new(host, channel, kind))
            }
        }
    }
}

/// Handle returned by `MemorySource::open`.
#[derive(Debug)]
pub struct MemoryHandle {
    pending: VecDeque<Scripted>,
    stats: Arc<SourceStats>,
    closed: bool,
}

impl LogHandle for MemoryHandle {
    fn read_next_batch(&mut self) -> Result<Vec<RawRecord>, ReadError> {
        if self.closed {
            return Err(ReadError::new("read on a closed handle"));
        }
        self.stats.reads.fetch_add(1, Ordering::SeqCst);

        match self.pending.pop_front() {
            Some(Scripted::Batch(batch)) => Ok(batch),
            Some(Scripted::Fail(e)) => Err(e),
            None => Ok(Vec::new()),
        }
    }

    // Counts every call, so a double close shows up in `SourceStats`.
    fn close(&mut self) {
        self.closed = true;
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(n: u32) -> RawRecord {
        RawRecord {
            record_number: n,
            time_generated: 1_700_000_000 + i64::from(n),
            event_code: n,
            event_type: 4,
            category: 0,
            source: "src".to_string(),
            inserts: vec![],
        }
    }

    #[test]
    fn test_replays_batches_then_empty() {
        let source = MemorySource::new().with_batches("localhost", "Application", vec![vec![rec(1)]]);
        let mut handle = source.open("LOCALHOST", "application").unwrap();
        assert_eq!(handle.read_next_batch().unwrap(), vec![rec(1)]);
        assert!(handle.read_next_batch().unwrap().is_empty());
        assert!(handle.read_next_batch().unwrap().is_empty());
        handle.close();
        assert_eq!(source.stats().closes(), 1);
        assert!(handle.read_next_batch().is_err());
    }

    #[test]
    fn test_open_failures_are_classified() {
        let source = MemorySource::new()
            .with_batches("srv", "System", vec![])
            .with_denied("srv", "Security");

        let kind = |host: &str, channel: &str| source.open(host, channel).unwrap_err().kind;
        assert_eq!(kind("nowhere", "System"), ConnectionFailure::HostUnreachable);
        assert_eq!(kind("srv", "Nope"), ConnectionFailure::ChannelNotFound);
        assert_eq!(kind("srv", "Security"), ConnectionFailure::AccessDenied);
        assert_eq!(source.stats().opens(), 0);
    }

    #[test]
    fn test_each_open_replays_from_the_start() {
        let source = MemorySource::new().with_batches("h", "c", vec![vec![rec(1), rec(2)]]);
        for _ in 0..2 {
            let mut handle = source.open("h", "c").unwrap();
            assert_eq!(handle.read_next_batch().unwrap().len(), 2);
            handle.close();
        }
        assert_eq!(source.stats().opens(), 2);
        assert_eq!(source.stats().closes(), 2);
    }
}
