// EventReport - core/filter.rs
//
// Composable filter over normalised event records.
// Criteria are AND-combined; keywords within a criterion are OR-combined.
// Core layer: pure logic, no I/O.

use crate::core::model::{EventRecord, Severity};
use std::collections::HashSet;

/// Filter criteria for one query. An empty set disables that criterion;
/// `FilterCriteria::default()` (all sets empty) matches every record.
///
/// Built once before the query starts and passed by value; there is no
/// way to mutate it while a query is running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    severities: HashSet<Severity>,
    event_ids: HashSet<u16>,
    /// Stored lowercased; matched as case-insensitive substrings.
    keywords: Vec<String>,
}

impl FilterCriteria {
    /// The explicit "no filtering" state.
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn with_severities(mut self, severities: impl IntoIterator<Item = Severity>) -> Self {
        self.severities.extend(severities);
        self
    }

    pub fn with_event_ids(mut self, ids: impl IntoIterator<Item = u16>) -> Self {
        self.event_ids.extend(ids);
        self
    }

    /// Add keywords. Blank keywords are ignored; duplicates collapse.
    pub fn with_keywords<S: AsRef<str>>(mut self, keywords: impl IntoIterator<Item = S>) -> Self {
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !self.keywords.contains(&keyword) {
                self.keywords.push(keyword);
            }
        }
        self
    }

    /// Add keywords from one comma-separated string, e.g. `"disk, timeout"`.
    pub fn with_keyword_list(self, list: &str) -> Self {
        self.with_keywords(list.split(','))
    }

    pub fn severities(&self) -> &HashSet<Severity> {
        &self.severities
    }

    pub fn event_ids(&self) -> &HashSet<u16> {
        &self.event_ids
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns true if no criterion is active.
    pub fn is_empty(&self) -> bool {
        self.severities.is_empty() && self.event_ids.is_empty() && self.keywords.is_empty()
    }

    /// Check a single record. Cheapest test first, short-circuiting:
    /// severity membership, then event ID membership, then keyword scan.
    pub fn matches(&self, record: &EventRecord) -> bool {
        if !self.severities.is_empty() && !self.severities.contains(&record.severity()) {
            return false;
        }

        if !self.event_ids.is_empty() && !self.event_ids.contains(&record.event_id()) {
            return false;
        }

        if !self.keywords.is_empty() {
            let message = record.message().to_lowercase();
            if !self.keywords.iter().any(|k| message.contains(k.as_str())) {
                return false;
            }
        }

        true
    }
}

/// Free-function form of `FilterCriteria::matches`.
pub fn matches(record: &EventRecord, criteria: &FilterCriteria) -> bool {
    criteria.matches(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::RawRecord;
    use crate::core::normalize::normalize;

    fn make_record(event_type: u16, event_id: u32, message: &str) -> EventRecord {
        normalize(&RawRecord {
            record_number: 1,
            time_generated: 1_700_000_000,
            event_code: event_id,
            event_type,
            category: 0,
            source: "test".to_string(),
            inserts: vec![message.to_string()],
        })
        .unwrap()
    }

    const ERROR: u16 = 1;
    const WARNING: u16 = 2;
    const INFO: u16 = 4;

    #[test]
    fn test_empty_criteria_matches_everything() {
        let criteria = FilterCriteria::match_all();
        assert!(criteria.is_empty());
        for record in [
            make_record(ERROR, 1, "a"),
            make_record(INFO, 65535, "b"),
            make_record(0x0003, 0, ""),
        ] {
            assert!(matches(&record, &criteria));
        }
    }

    #[test]
    fn test_severity_filter() {
        let criteria = FilterCriteria::default().with_severities([Severity::Error]);
        assert!(criteria.matches(&make_record(ERROR, 1, "x")));
        assert!(!criteria.matches(&make_record(WARNING, 1, "x")));
    }

    #[test]
    fn test_unknown_severity_is_its_own_level() {
        let unknown = make_record(0x0003, 1, "x");
        let errors_only = FilterCriteria::default().with_severities([Severity::Error]);
        let unknown_only = FilterCriteria::default().with_severities([Severity::Unknown]);
        assert!(!errors_only.matches(&unknown));
        assert!(unknown_only.matches(&unknown));
    }

    #[test]
    fn test_keyword_case_insensitive() {
        let criteria = FilterCriteria::default().with_keywords(["failure"]);
        assert!(criteria.matches(&make_record(ERROR, 1, "Disk Failure")));
    }

    #[test]
    fn test_keywords_are_or_combined() {
        let criteria = FilterCriteria::default().with_keyword_list("timeout, DISK");
        assert_eq!(criteria.keywords(), ["timeout", "disk"]);
        assert!(criteria.matches(&make_record(ERROR, 1, "Disk Failure")));
        assert!(criteria.matches(&make_record(ERROR, 1, "Request TIMEOUT")));
        assert!(!criteria.matches(&make_record(ERROR, 1, "Service started")));
    }

    #[test]
    fn test_blank_keywords_do_not_filter() {
        let criteria = FilterCriteria::default().with_keyword_list(" , ,");
        assert!(criteria.is_empty());
    }

    #[test]
    fn test_combined_criteria() {
        let criteria = FilterCriteria::default()
            .with_severities([Severity::Error])
            .with_event_ids([1001]);
        assert!(!criteria.matches(&make_record(WARNING, 1001, "anything")));
        assert!(criteria.matches(&make_record(ERROR, 1001, "anything")));
        assert!(criteria.matches(&make_record(ERROR, 1001, "")));
        assert!(!criteria.matches(&make_record(ERROR, 1002, "anything")));
    }

    #[test]
    fn test_event_id_filter_uses_masked_id() {
        let criteria = FilterCriteria::default().with_event_ids([4112]);
        assert!(criteria.matches(&make_record(INFO, 0x4000_1010, "x")));
    }
}
