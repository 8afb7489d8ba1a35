//! wordday - Daily word puzzle engine
//!
//! Resolves the day's answer from remote endpoints (with a deterministic
//! offline fallback), renders articles about it and keeps them in a
//! snapshot-backed content store, all driven by an in-process scheduler.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`cache`] - TTL cache and the optional Redis snapshot mirror
//! - [`resolver`] - Answer resolution with endpoint rotation and fallback
//! - [`content`] - Article rendering from an answer
//! - [`storage`] - Content store with retention and JSON snapshot
//! - [`scheduler`] - Background jobs (daily generation, cleanup, refresh, health)
//! - [`server`] - HTTP API
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use wordday::app::App;
//! use wordday::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::build(Config::from_env()?).await?;
//!     let answer = app.resolver.resolve_today().await;
//!     println!("{}", answer.word);
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod metrics;
pub mod models;
pub mod resolver;
pub mod scheduler;
pub mod server;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::App;
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result, WorddayErrorTrait};
    pub use crate::models::{AnswerRecord, ContentCategory, ContentItem};
    pub use crate::resolver::AnswerResolver;
    pub use crate::scheduler::Scheduler;
    pub use crate::storage::ContentStore;
}

// Direct re-exports for convenience
pub use models::{AnswerRecord, ContentCategory, ContentItem};
