use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::{day_stamp, Rejection, StoreError, StoryLimits, StoryStatus, StoryStore};

/// Status text reported before anyone has contributed today.
pub const EMPTY_STORY_PLACEHOLDER: &str = "No story yet today. Text a few words to start it!";

/// Reply sent when the store is unreachable during a submission. The sender
/// always gets a well-formed reply document, never a transport error.
pub const GENERIC_FAILURE_REPLY: &str =
    "Something went wrong adding your message. Please try again in a moment!";

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Message appended; carries the full updated story.
    Accepted { story: String },
    /// Message refused; carries the reason to relay to the sender.
    Rejected(Rejection),
}

/// Validate-then-append protocol over a [`StoryStore`].
///
/// Holds no state of its own; all cross-request state lives in the store.
#[derive(Clone)]
pub struct StoryService {
    store: Arc<dyn StoryStore>,
    limits: StoryLimits,
}

impl StoryService {
    pub fn new(store: Arc<dyn StoryStore>, limits: StoryLimits) -> Self {
        Self { store, limits }
    }

    pub fn with_defaults(store: Arc<dyn StoryStore>) -> Self {
        Self::new(store, StoryLimits::default())
    }

    pub fn limits(&self) -> &StoryLimits {
        &self.limits
    }

    /// Verify store connectivity.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    /// Validate the message and, if it passes, append it to today's story.
    ///
    /// The append sequence (story write, last-submission write, count
    /// increment) is deliberately not transactional: a failure mid-sequence
    /// leaves partial state behind, and no rollback is attempted.
    pub async fn submit(
        &self,
        sender: &str,
        body: &str,
        now: OffsetDateTime,
    ) -> Result<SubmitOutcome, StoreError> {
        let text = body.trim();

        if let Some(rejection) = self.validate(sender, text, now).await? {
            debug!(sender = %sender, rejection = ?rejection, "submission rejected");
            return Ok(SubmitOutcome::Rejected(rejection));
        }

        let today = now.date();
        let ttl = self.limits.entry_ttl();

        let story = self.store.append_story(today, text, ttl).await?;
        self.store.set_last_submission(sender, now, ttl).await?;
        let count = self.store.increment_count(today, ttl).await?;

        info!(sender = %sender, count, chars = text.chars().count(), "story fragment accepted");
        Ok(SubmitOutcome::Accepted { story })
    }

    /// Run the validation checks. Reads only, never mutates.
    ///
    /// The check order is part of the contract: length, then emptiness, then
    /// rate limit, then daily cap.
    async fn validate(
        &self,
        sender: &str,
        text: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Rejection>, StoreError> {
        let chars = text.chars().count();
        if chars > self.limits.max_message_chars {
            return Ok(Some(Rejection::TooLong { chars }));
        }
        if text.is_empty() {
            return Ok(Some(Rejection::Empty));
        }

        if let Some(last) = self.store.get_last_submission(sender).await? {
            let window = self.limits.submission_window();
            if now - last < window {
                let wait_minutes = ceil_minutes(last + window - now);
                return Ok(Some(Rejection::RateLimited { wait_minutes }));
            }
        }

        let count = self.store.get_count(now.date()).await?;
        if count >= self.limits.daily_cap {
            return Ok(Some(Rejection::DailyCapReached));
        }

        Ok(None)
    }

    /// Today's story and remaining quota. Reads only.
    pub async fn status(&self, now: OffsetDateTime) -> Result<StoryStatus, StoreError> {
        let today = now.date();
        let story = self.store.get_story(today).await?;
        let count = self.store.get_count(today).await?;

        Ok(StoryStatus {
            date: day_stamp(today),
            story: story.unwrap_or_else(|| EMPTY_STORY_PLACEHOLDER.to_string()),
            message_count: count,
            messages_remaining: self.limits.daily_cap - count,
        })
    }
}

/// Whole minutes left to wait, rounded up.
fn ceil_minutes(remaining: Duration) -> i64 {
    let ms = remaining.whole_milliseconds() as i64;
    (ms + 59_999).div_euclid(60_000)
}
