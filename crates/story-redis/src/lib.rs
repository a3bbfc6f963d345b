//! Redis implementation of the storykit [`StoryStore`].
//!
//! All game state lives in self-expiring Redis keys:
//!
//! ```text
//! story:{YYYY-MM-DD}  → the day's concatenated story text
//! count:{YYYY-MM-DD}  → accepted-message counter (INCR, atomic)
//! last:{sender}       → unix seconds of the sender's last accepted message
//! ```
//!
//! Every write resets the key's TTL; nothing is ever deleted explicitly.

use async_trait::async_trait;
use redis::AsyncCommands;
use story_core::{keys, StoreError, StoryStore};
use time::{Date, Duration, OffsetDateTime};

/// Redis-backed [`StoryStore`].
#[derive(Clone, Debug)]
pub struct RedisStoryStore {
    client: redis::Client,
}

impl RedisStoryStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    /// Open a store from a connection URL (credentials embedded).
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self::new(client))
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

fn command_err(e: redis::RedisError) -> StoreError {
    StoreError::Command(e.to_string())
}

#[async_trait]
impl StoryStore for RedisStoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_err)?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Value(format!("unexpected PING reply: {pong}")))
        }
    }

    async fn get_story(&self, date: Date) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn().await?;
        conn.get(keys::story(date)).await.map_err(command_err)
    }

    async fn append_story(
        &self,
        date: Date,
        fragment: &str,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        let mut conn = self.conn().await?;
        let key = keys::story(date);

        // Read-modify-write, not a transaction. Concurrent appends can
        // interleave; acceptance order is whatever arrival order produced.
        let current: Option<String> = conn.get(&key).await.map_err(command_err)?;
        let story = match current {
            Some(existing) if !existing.is_empty() => format!("{existing} {fragment}"),
            _ => fragment.to_string(),
        };

        let _: () = conn.set(&key, &story).await.map_err(command_err)?;
        let _: () = conn
            .expire(&key, ttl.whole_seconds())
            .await
            .map_err(command_err)?;
        Ok(story)
    }

    async fn get_count(&self, date: Date) -> Result<i64, StoreError> {
        let mut conn = self.conn().await?;
        let count: Option<i64> = conn.get(keys::count(date)).await.map_err(command_err)?;
        Ok(count.unwrap_or(0))
    }

    async fn increment_count(&self, date: Date, ttl: Duration) -> Result<i64, StoreError> {
        let mut conn = self.conn().await?;
        let key = keys::count(date);

        let count: i64 = redis::cmd("INCR")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(command_err)?;
        let _: () = redis::cmd("EXPIRE")
            .arg(&key)
            .arg(ttl.whole_seconds())
            .query_async(&mut conn)
            .await
            .map_err(command_err)?;
        Ok(count)
    }

    async fn get_last_submission(
        &self,
        sender: &str,
    ) -> Result<Option<OffsetDateTime>, StoreError> {
        let mut conn = self.conn().await?;
        let unix: Option<i64> = conn.get(keys::last(sender)).await.map_err(command_err)?;

        unix.map(|ts| {
            OffsetDateTime::from_unix_timestamp(ts)
                .map_err(|e| StoreError::Value(format!("bad last-submission timestamp {ts}: {e}")))
        })
        .transpose()
    }

    async fn set_last_submission(
        &self,
        sender: &str,
        at: OffsetDateTime,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let key = keys::last(sender);

        let _: () = conn
            .set(&key, at.unix_timestamp())
            .await
            .map_err(command_err)?;
        let _: () = conn
            .expire(&key, ttl.whole_seconds())
            .await
            .map_err(command_err)?;
        Ok(())
    }
}
