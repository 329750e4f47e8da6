// EventReport - app/batch.rs
//
// Several independent queries (one per channel) against the same host,
// run in parallel on the rayon pool. Queries share no mutable state: each
// gets its own handle, its own copy of the criteria, and its own result.

use crate::app::query::{QueryEngine, QueryOptions};
use crate::core::filter::FilterCriteria;
use crate::core::model::EventRecord;
use crate::core::source::LogSource;
use crate::util::error::QueryError;
use rayon::prelude::*;

/// Result of one channel's query.
#[derive(Debug)]
pub struct ChannelResult {
    pub channel: String,
    pub result: Result<Vec<EventRecord>, QueryError>,
}

/// Query every channel on `host`. Results come back in `channels` order,
/// whatever order the queries finished in. One failing channel does not
/// affect the others.
pub fn run_channels<S>(
    engine: &QueryEngine<S>,
    host: &str,
    channels: &[String],
    criteria: &FilterCriteria,
    options: &QueryOptions,
) -> Vec<ChannelResult>
where
    S: LogSource + Sync,
{
    tracing::debug!(host, channels = channels.len(), "Running channel queries");

    channels
        .par_iter()
        .map(|channel| ChannelResult {
            channel: channel.clone(),
            result: engine.run_with(host, channel, criteria.clone(), options.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::RawRecord;
    use crate::core::source::MemorySource;

    fn raw(n: u32) -> RawRecord {
        RawRecord {
            record_number: n,
            time_generated: 1_700_000_000,
            event_code: n,
            event_type: 1,
            category: 0,
            source: "s".to_string(),
            inserts: vec![format!("event {n}")],
        }
    }

    #[test]
    fn test_results_follow_input_order_and_isolate_failures() {
        let source = MemorySource::new()
            .with_batches("h", "Application", vec![vec![raw(1), raw(2)]])
            .with_batches("h", "System", vec![vec![raw(3)]])
            .with_denied("h", "Security");
        let stats = source.stats();
        let engine = QueryEngine::new(source);
        let channels: Vec<String> = ["System", "Security", "Application"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let results = run_channels(
            &engine,
            "h",
            &channels,
            &FilterCriteria::match_all(),
            &QueryOptions::default(),
        );

        let names: Vec<&str> = results.iter().map(|r| r.channel.as_str()).collect();
        assert_eq!(names, ["System", "Security", "Application"]);
        assert_eq!(results[0].result.as_ref().unwrap().len(), 1);
        assert!(matches!(results[1].result, Err(QueryError::Connection(_))));
        assert_eq!(results[2].result.as_ref().unwrap().len(), 2);
        assert_eq!(stats.opens(), 2);
        assert_eq!(stats.closes(), 2);
    }
}
