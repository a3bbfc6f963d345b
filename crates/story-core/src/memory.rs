use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::{Date, Duration, OffsetDateTime};

use crate::{keys, StoreError, StoryStore};

/// In-process [`StoryStore`] backed by a `HashMap`.
///
/// Honors the same TTL semantics as the real store (entries lapse after
/// their expiry and reads treat them as absent). Intended for tests and
/// local runs without a Redis instance; state is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: OffsetDateTime,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().expect("memory store lock poisoned");
        entries
            .get(key)
            .filter(|entry| entry.expires_at > OffsetDateTime::now_utc())
            .map(|entry| entry.value.clone())
    }

    fn write(&self, key: String, value: String, ttl: Duration) {
        let mut entries = self.entries.lock().expect("memory store lock poisoned");
        entries.insert(
            key,
            Entry {
                value,
                expires_at: OffsetDateTime::now_utc() + ttl,
            },
        );
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_story(&self, date: Date) -> Result<Option<String>, StoreError> {
        Ok(self.read(&keys::story(date)))
    }

    async fn append_story(
        &self,
        date: Date,
        fragment: &str,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        // Single lock for the whole read-modify-write; the in-process store
        // is stricter than the real one here.
        let mut entries = self.entries.lock().expect("memory store lock poisoned");
        let key = keys::story(date);
        let now = OffsetDateTime::now_utc();

        let story = match entries
            .get(&key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.as_str())
        {
            Some(current) if !current.is_empty() => format!("{current} {fragment}"),
            _ => fragment.to_string(),
        };

        entries.insert(
            key,
            Entry {
                value: story.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(story)
    }

    async fn get_count(&self, date: Date) -> Result<i64, StoreError> {
        match self.read(&keys::count(date)) {
            Some(raw) => raw
                .parse()
                .map_err(|_| StoreError::Value(format!("count is not an integer: {raw}"))),
            None => Ok(0),
        }
    }

    async fn increment_count(&self, date: Date, ttl: Duration) -> Result<i64, StoreError> {
        let mut entries = self.entries.lock().expect("memory store lock poisoned");
        let key = keys::count(date);
        let now = OffsetDateTime::now_utc();

        let current = entries
            .get(&key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.parse::<i64>())
            .transpose()
            .map_err(|e| StoreError::Value(format!("count is not an integer: {e}")))?
            .unwrap_or(0);

        let next = current + 1;
        entries.insert(
            key,
            Entry {
                value: next.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(next)
    }

    async fn get_last_submission(
        &self,
        sender: &str,
    ) -> Result<Option<OffsetDateTime>, StoreError> {
        match self.read(&keys::last(sender)) {
            Some(raw) => {
                let unix: i64 = raw
                    .parse()
                    .map_err(|_| StoreError::Value(format!("timestamp is not an integer: {raw}")))?;
                OffsetDateTime::from_unix_timestamp(unix)
                    .map(Some)
                    .map_err(|e| StoreError::Value(e.to_string()))
            }
            None => Ok(None),
        }
    }

    async fn set_last_submission(
        &self,
        sender: &str,
        at: OffsetDateTime,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.write(keys::last(sender), at.unix_timestamp().to_string(), ttl);
        Ok(())
    }
}
