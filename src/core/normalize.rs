// EventReport - core/normalize.rs
//
// Raw record -> EventRecord conversion.
// Core layer: pure function, no I/O.

use crate::core::model::{EventRecord, RawRecord, Severity};
use crate::util::constants::{EVENT_ID_MASK, MESSAGE_INSERT_SEPARATOR, NO_MESSAGE_SENTINEL};
use crate::util::error::NormalizationError;
use chrono::DateTime;

/// Low 16 bits of a platform event code.
pub fn mask16(code: u32) -> u16 {
    (code & EVENT_ID_MASK) as u16
}

/// Flatten string inserts into one message.
///
/// Empty inserts are dropped so they cannot produce doubled separators;
/// if nothing is left the sentinel is returned.
pub fn flatten_message(inserts: &[String]) -> String {
    let message = inserts
        .iter()
        .map(|s| s.trim_end_matches('\0'))
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(MESSAGE_INSERT_SEPARATOR);

    if message.is_empty() {
        NO_MESSAGE_SENTINEL.to_string()
    } else {
        message
    }
}

/// Convert one raw record into the canonical shape.
///
/// Fails only when the generated time cannot be represented; the caller
/// skips such records and keeps going.
pub fn normalize(raw: &RawRecord) -> Result<EventRecord, NormalizationError> {
    let timestamp = DateTime::from_timestamp(raw.time_generated, 0).ok_or(
        NormalizationError::InvalidTimestamp {
            record_number: raw.record_number,
            raw: raw.time_generated,
        },
    )?;

    Ok(EventRecord::new(
        timestamp,
        raw.source.clone(),
        mask16(raw.event_code),
        raw.category,
        flatten_message(&raw.inserts),
        Severity::from_native(raw.event_type),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(event_code: u32, inserts: &[&str]) -> RawRecord {
        RawRecord {
            record_number: 7,
            time_generated: 1_700_000_000,
            event_code,
            event_type: 4,
            category: 3,
            source: "Service Control Manager".to_string(),
            inserts: inserts.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_event_code_is_masked() {
        let record = normalize(&raw(0xC000_1B58, &["x"])).unwrap();
        assert_eq!(record.event_id(), 0x1B58);
        assert_eq!(record.event_id(), 7000);
    }

    #[test]
    fn test_mask16_is_idempotent() {
        for code in [0u32, 1, 0xFFFF, 0x1_0000, 0x4000_1010, u32::MAX] {
            let once = mask16(code);
            assert_eq!(mask16(u32::from(once)), once);
        }
    }

    #[test]
    fn test_inserts_joined_with_single_space() {
        let record = normalize(&raw(4112, &["Service", "started"])).unwrap();
        assert_eq!(record.message(), "Service started");
    }

    #[test]
    fn test_empty_inserts_become_sentinel() {
        assert_eq!(normalize(&raw(1, &[])).unwrap().message(), "No message");
        assert_eq!(normalize(&raw(1, &["", "  "])).unwrap().message(), "No message");
    }

    #[test]
    fn test_blank_inserts_do_not_double_separators() {
        assert_eq!(flatten_message(&["a".into(), "".into(), "b".into()]), "a b");
    }

    #[test]
    fn test_fields_carried_over() {
        let record = normalize(&raw(1000, &["hello"])).unwrap();
        assert_eq!(record.source(), "Service Control Manager");
        assert_eq!(record.category(), 3);
        assert_eq!(record.severity(), Severity::Information);
        assert_eq!(record.timestamp_text(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_unknown_native_severity_is_kept() {
        let mut r = raw(1, &["x"]);
        r.event_type = 0x0003;
        assert_eq!(normalize(&r).unwrap().severity(), Severity::Unknown);
    }

    #[test]
    fn test_unrepresentable_timestamp_fails() {
        let mut r = raw(1, &["x"]);
        r.time_generated = i64::MAX;
        assert_eq!(
            normalize(&r),
            Err(NormalizationError::InvalidTimestamp {
                record_number: 7,
                raw: i64::MAX
            })
        );
    }
}
