//! # Storykit
//!
//! Webhook service for an SMS-driven collaborative story game: everyone's
//! text messages get stitched into one shared story per day.
//!
//! ## How the game works
//!
//! - Text up to 75 characters to add to today's story
//! - One message per sender every 10 minutes
//! - 50 messages per day, then the page is full
//! - The story (and every counter behind it) expires on its own after 24h
//!
//! ## Pieces
//!
//! - **story-core**: validation/append protocol, store trait, TwiML replies
//! - **story-redis**: Redis store backend
//! - **story-web-axum**: the HTTP endpoints
//! - this crate: configuration and the server binary
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use storykit::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(RedisStoryStore::open("redis://127.0.0.1:6379")?);
//! let service = StoryService::with_defaults(store);
//! let app = router().with_state(AppState { service });
//! ```
//!
//! ## Configuration
//!
//! Settings layer from defaults, `config/{default,RUN_MODE,local}` files, and
//! `STORYKIT_`-prefixed environment variables:
//!
//! ```rust,ignore
//! use storykit::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! println!("store at {}", config.store.url);
//! ```

pub mod config;

pub use config::*;

/// Common imports for storykit usage
pub mod prelude {
    pub use crate::config::{AppConfig, LoggingConfig, ServerConfig, StoreConfig};
    pub use story_core::*;
    pub use story_redis::RedisStoryStore;
    pub use story_web_axum::{router, AppState, InboundSms};
}
