//! Display helpers for the recent-chats view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::conversations::segmenter::{ConversationSummary, summarize};
use crate::conversations::timestamp::parse_timestamp;
use crate::storage::MessageRecord;

/// Maximum title length in characters before an ellipsis is appended.
pub const TITLE_MAX_CHARS: usize = 50;

const ELLIPSIS: &str = "...";
const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// One entry of the recent-chats list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecentChat {
    /// Short title derived from the conversation's opening record.
    pub title: String,
    /// Full text of the opening record.
    pub preview: String,
    /// Stored timestamp of the opening record.
    pub timestamp: String,
    /// Human-readable age of the opening record.
    pub time_ago: String,
    /// Number of messages in the conversation.
    pub message_count: usize,
}

impl RecentChat {
    /// Build the display entry for a conversation.
    #[must_use]
    pub fn from_summary(summary: ConversationSummary, now: DateTime<Utc>) -> Self {
        Self {
            title: title_for(&summary.first_message),
            time_ago: relative_age(&summary.first_timestamp, now),
            preview: summary.first_message,
            timestamp: summary.first_timestamp,
            message_count: summary.message_count,
        }
    }
}

/// Group `records` (newest first) and render the `limit` most recent
/// conversations relative to `now`.
#[must_use]
pub fn recent_chats(records: &[MessageRecord], limit: usize, now: DateTime<Utc>) -> Vec<RecentChat> {
    summarize(records, limit)
        .into_iter()
        .map(|summary| RecentChat::from_summary(summary, now))
        .collect()
}

/// Truncate a message to [`TITLE_MAX_CHARS`] characters, marking the cut.
#[must_use]
pub fn title_for(message: &str) -> String {
    match message.char_indices().nth(TITLE_MAX_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &message[..cut]),
        None => message.to_string(),
    }
}

/// Describe how long ago `timestamp` was, relative to `now`.
///
/// Never fails: an unreadable timestamp yields `"Recently"`.
#[must_use]
pub fn relative_age(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(at) = parse_timestamp(timestamp) else {
        return "Recently".to_string();
    };

    let seconds = (now - at).num_seconds().abs();
    if seconds < MINUTE {
        "Just now".to_string()
    } else if seconds < HOUR {
        ago(seconds / MINUTE, "minute")
    } else if seconds < DAY {
        ago(seconds / HOUR, "hour")
    } else if seconds < WEEK {
        ago(seconds / DAY, "day")
    } else {
        at.format("%b %d, %Y").to_string()
    }
}

fn ago(count: i64, unit: &str) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} ago")
}
