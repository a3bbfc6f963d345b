//! # Story Core
//!
//! Core traits and types for the storykit collaborative story game.
//!
//! Inbound SMS messages are appended to a shared daily story. This crate
//! holds the behavioral contract for that:
//! - [`StoryStore`] trait over the external key-value store
//! - [`StoryService`] with the validate-then-append protocol
//! - [`Rejection`] outcomes that become friendly reply messages
//! - [`twiml`] reply-document formatting
//!
//! ## Example
//!
//! ```rust,ignore
//! use story_core::{MemoryStore, StoryService, SubmitOutcome};
//!
//! let service = StoryService::with_defaults(Arc::new(MemoryStore::new()));
//! match service.submit("+15550001111", "Once upon a time", now).await? {
//!     SubmitOutcome::Accepted { story } => println!("story so far: {story}"),
//!     SubmitOutcome::Rejected(rejection) => println!("{}", rejection.reply_text()),
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

mod memory;
mod service;
pub mod twiml;

pub use memory::MemoryStore;
pub use service::{StoryService, SubmitOutcome, EMPTY_STORY_PLACEHOLDER, GENERIC_FAILURE_REPLY};

/// Errors that can occur while talking to the story store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Could not reach the store at all.
    #[error("store connection error: {0}")]
    Connection(String),
    /// A command was sent but failed.
    #[error("store command error: {0}")]
    Command(String),
    /// The store returned something we could not interpret.
    #[error("unexpected store value: {0}")]
    Value(String),
}

/// Why a submission was refused. These are domain outcomes, not transport
/// failures: each one is delivered back to the sender as a normal reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Trimmed message exceeded the length limit; carries the exact length sent.
    TooLong { chars: usize },
    /// Trimmed message was empty.
    Empty,
    /// Sender already contributed within the submission window; carries the
    /// whole minutes left to wait, rounded up.
    RateLimited { wait_minutes: i64 },
    /// Today's story already holds the maximum number of messages.
    DailyCapReached,
}

impl Rejection {
    /// The reply text sent back to the contributor.
    pub fn reply_text(&self) -> String {
        match self {
            Rejection::TooLong { chars } => format!(
                "Too long! Your message was {chars} characters. Keep it to 75 or fewer so everyone gets a turn."
            ),
            Rejection::Empty => {
                "Your message was empty. Send a few words to add to today's story!".to_string()
            }
            Rejection::RateLimited { wait_minutes } => {
                let unit = if *wait_minutes == 1 { "minute" } else { "minutes" };
                format!(
                    "Easy there, storyteller! Wait {wait_minutes} more {unit} before adding to the story."
                )
            }
            Rejection::DailyCapReached => {
                "Today's story is complete at 50 messages. Come back tomorrow for a fresh page!"
                    .to_string()
            }
        }
    }
}

/// Game limits. Defaults match the production game; the server config may
/// override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryLimits {
    /// Maximum trimmed message length in characters.
    pub max_message_chars: usize,
    /// Maximum accepted messages per calendar day.
    pub daily_cap: i64,
    /// Minimum spacing between two accepted messages from one sender, seconds.
    pub submission_window_secs: i64,
    /// Time-to-live applied to every story/count/last-submission write, seconds.
    pub entry_ttl_secs: i64,
}

impl Default for StoryLimits {
    fn default() -> Self {
        Self {
            max_message_chars: 75,
            daily_cap: 50,
            submission_window_secs: 600,
            entry_ttl_secs: 86_400,
        }
    }
}

impl StoryLimits {
    pub fn submission_window(&self) -> Duration {
        Duration::seconds(self.submission_window_secs)
    }

    pub fn entry_ttl(&self) -> Duration {
        Duration::seconds(self.entry_ttl_secs)
    }
}

/// Current day's story and quota, as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryStatus {
    /// Calendar day, `YYYY-MM-DD` (UTC).
    pub date: String,
    pub story: String,
    pub message_count: i64,
    pub messages_remaining: i64,
}

/// Key-date stamp, `YYYY-MM-DD`.
pub fn day_stamp(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Key derivation shared by every store backend. All keys are derived from
/// the current date or the sender; there is no separate identity entity.
pub mod keys {
    use time::Date;

    use crate::day_stamp;

    /// `story:{date}` — the day's concatenated story text.
    pub fn story(date: Date) -> String {
        format!("story:{}", day_stamp(date))
    }

    /// `count:{date}` — the day's accepted-message counter.
    pub fn count(date: Date) -> String {
        format!("count:{}", day_stamp(date))
    }

    /// `last:{sender}` — unix timestamp of the sender's last accepted message.
    pub fn last(sender: &str) -> String {
        format!("last:{sender}")
    }
}

/// Typed repository over the external key-value store.
///
/// Every entry is self-expiring; the TTL is an explicit parameter on each
/// write and is reset on every write. Implementations must make
/// [`increment_count`](StoryStore::increment_count) an atomic increment, not
/// a read-modify-write, so concurrent submissions cannot lose updates.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Verify store connectivity.
    async fn ping(&self) -> Result<(), StoreError>;

    /// The day's story text, if any message was accepted yet.
    async fn get_story(&self, date: Date) -> Result<Option<String>, StoreError>;

    /// Append `fragment` to the day's story (space-joined, no leading space on
    /// the first message) and return the new full text. Not atomic across
    /// concurrent appends; see the service-level notes.
    async fn append_story(
        &self,
        date: Date,
        fragment: &str,
        ttl: Duration,
    ) -> Result<String, StoreError>;

    /// The day's accepted-message count (0 when absent).
    async fn get_count(&self, date: Date) -> Result<i64, StoreError>;

    /// Atomically increment the day's count, reset its TTL, and return the
    /// new value.
    async fn increment_count(&self, date: Date, ttl: Duration) -> Result<i64, StoreError>;

    /// Timestamp of the sender's most recent accepted message, if still live.
    async fn get_last_submission(
        &self,
        sender: &str,
    ) -> Result<Option<OffsetDateTime>, StoreError>;

    /// Record the sender's most recent accepted message.
    async fn set_last_submission(
        &self,
        sender: &str,
        at: OffsetDateTime,
        ttl: Duration,
    ) -> Result<(), StoreError>;
}
