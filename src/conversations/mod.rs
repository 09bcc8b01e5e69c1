//! Conversation grouping over the flat message log.
//!
//! - `timestamp`: parsing policy for stored timestamps
//! - `segmenter`: groups newest-first records into conversation runs
//! - `display`: titles, relative ages and the recent-chat view

pub mod display;
pub mod segmenter;
pub mod timestamp;

pub use display::{RecentChat, recent_chats, relative_age, title_for};
pub use segmenter::{CONVERSATION_GAP_MINUTES, ConversationSummary, DEFAULT_LIMIT, summarize};
pub use timestamp::{TimestampError, format_timestamp, parse_timestamp};
