//! Groups a newest-first message log into conversations.
//!
//! Two adjacent records belong to the same conversation when their timestamps
//! are at most [`CONVERSATION_GAP_MINUTES`] apart. A record whose timestamp
//! cannot be compared always opens a new conversation.
//!
//! Because records arrive newest first, the record that opens a run is the
//! most recent message of that conversation. `first_*` fields therefore
//! describe the first record *seen*, which is the latest message, and
//! `last_timestamp` is the oldest message reached so far.

use chrono::TimeDelta;
use serde::Serialize;
use tracing::debug;

use crate::conversations::timestamp::{TimestampError, parse_timestamp};
use crate::storage::MessageRecord;

/// Maximum gap between adjacent messages of one conversation.
pub const CONVERSATION_GAP_MINUTES: i64 = 30;

/// Default number of conversations returned.
pub const DEFAULT_LIMIT: usize = 10;

/// A run of messages grouped into one conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    /// Text of the record that opened the run (its most recent message).
    pub first_message: String,
    /// Stored timestamp of the record that opened the run.
    pub first_timestamp: String,
    /// Stored timestamp of the last record added to the run (its oldest message).
    pub last_timestamp: String,
    /// Number of records in the run.
    pub message_count: usize,
}

impl ConversationSummary {
    fn start(record: &MessageRecord) -> Self {
        Self {
            first_message: record.message.clone(),
            first_timestamp: record.timestamp.clone(),
            last_timestamp: record.timestamp.clone(),
            message_count: 1,
        }
    }

    fn extend(&mut self, record: &MessageRecord) {
        self.last_timestamp.clone_from(&record.timestamp);
        self.message_count += 1;
    }

    fn gap_to(&self, record: &MessageRecord) -> Result<TimeDelta, TimestampError> {
        let last = parse_timestamp(&self.last_timestamp)?;
        let next = parse_timestamp(&record.timestamp)?;
        Ok((last - next).abs())
    }

    fn continues_with(&self, record: &MessageRecord) -> bool {
        match self.gap_to(record) {
            Ok(gap) => gap <= TimeDelta::minutes(CONVERSATION_GAP_MINUTES),
            Err(err) => {
                debug!(chat_id = record.id, "splitting conversation: {err}");
                false
            }
        }
    }
}

/// Group `records` (ordered newest first) into at most `limit` conversations,
/// most recent first.
#[must_use]
pub fn summarize(records: &[MessageRecord], limit: usize) -> Vec<ConversationSummary> {
    let mut conversations = Vec::new();
    let mut current: Option<ConversationSummary> = None;

    for record in records {
        // Closed runs never change, so enough of them ends the scan.
        if conversations.len() >= limit {
            break;
        }

        current = Some(match current.take() {
            None => ConversationSummary::start(record),
            Some(mut run) if run.continues_with(record) => {
                run.extend(record);
                run
            }
            Some(run) => {
                conversations.push(run);
                ConversationSummary::start(record)
            }
        });
    }

    conversations.extend(current);
    conversations.truncate(limit);
    conversations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversations::timestamp::format_timestamp;
    use chrono::{DateTime, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).single().unwrap()
    }

    fn record_at(id: i64, message: &str, timestamp: &str) -> MessageRecord {
        MessageRecord {
            id,
            user_id: 1,
            message: message.to_string(),
            reply: format!("reply to {message}"),
            timestamp: timestamp.to_string(),
        }
    }

    /// Build newest-first records from minute offsets relative to `base()`.
    fn log(offsets_newest_first: &[i64]) -> Vec<MessageRecord> {
        offsets_newest_first
            .iter()
            .enumerate()
            .map(|(i, minutes)| {
                let at = base() + TimeDelta::minutes(*minutes);
                let id = i64::try_from(offsets_newest_first.len() - i).unwrap();
                record_at(id, &format!("message at {minutes}"), &format_timestamp(at))
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(summarize(&[], DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn test_single_record() {
        let records = log(&[0]);
        let conversations = summarize(&records, DEFAULT_LIMIT);
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].message_count, 1);
        assert_eq!(conversations[0].first_timestamp, conversations[0].last_timestamp);
    }

    #[test]
    fn test_close_messages_form_one_conversation() {
        let records = log(&[90, 70, 50, 30, 10, 0]);
        let conversations = summarize(&records, DEFAULT_LIMIT);
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].message_count, records.len());
    }

    #[test]
    fn test_exactly_thirty_minutes_stays_together() {
        let records = log(&[30, 0]);
        assert_eq!(summarize(&records, DEFAULT_LIMIT).len(), 1);
    }

    #[test]
    fn test_wide_gaps_split_every_message() {
        let records = log(&[200, 150, 100, 31, 0]);
        let conversations = summarize(&records, DEFAULT_LIMIT);
        assert_eq!(conversations.len(), 5);
        assert!(conversations.iter().all(|c| c.message_count == 1));
    }

    #[test]
    fn test_gap_after_pair_opens_new_conversation() {
        // T, T+10 and T+55 (45 minutes after T+10), newest first.
        let records = log(&[55, 10, 0]);
        let conversations = summarize(&records, DEFAULT_LIMIT);

        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].message_count, 1);
        assert_eq!(conversations[0].first_message, "message at 55");
        assert_eq!(conversations[1].message_count, 2);
        assert_eq!(conversations[1].first_message, "message at 10");
        assert_eq!(conversations[1].last_timestamp, records[2].timestamp);
    }

    #[test]
    fn test_limit_truncates_newest_first() {
        let records = log(&[300, 200, 100, 0]);
        let conversations = summarize(&records, 2);
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].first_message, "message at 300");
        assert_eq!(conversations[1].first_message, "message at 200");

        assert_eq!(summarize(&records, 4).len(), 4);
        assert_eq!(summarize(&records, 100).len(), 4);
    }

    #[test]
    fn test_zero_limit_is_empty() {
        let records = log(&[10, 0]);
        assert!(summarize(&records, 0).is_empty());
    }

    #[test]
    fn test_unparsable_timestamp_forces_boundary() {
        let records = vec![
            record_at(3, "newest", "2024-03-10 12:20:00"),
            record_at(2, "broken", "not a timestamp"),
            record_at(1, "oldest", "2024-03-10 12:10:00"),
        ];
        let conversations = summarize(&records, DEFAULT_LIMIT);

        assert_eq!(conversations.len(), 3);
        assert_eq!(conversations[1].first_message, "broken");
        assert_eq!(conversations[1].message_count, 1);
    }

    #[test]
    fn test_mixed_timestamp_shapes_compare() {
        let records = vec![
            record_at(2, "iso", "2024-03-10T12:20:00.000Z"),
            record_at(1, "storage", "2024-03-10 12:00:00"),
        ];
        let conversations = summarize(&records, DEFAULT_LIMIT);
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].message_count, 2);
    }

    #[test]
    fn test_summarize_is_repeatable() {
        let records = log(&[500, 480, 300, 40, 20, 0]);
        assert_eq!(
            summarize(&records, DEFAULT_LIMIT),
            summarize(&records, DEFAULT_LIMIT)
        );
    }
}
