pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::{Config, RankingConfig};
pub use error::{RankingError, Result};
pub use models::{ClipCandidate, FeedPrefs, LtrUserStats, RankingRequest};
pub use services::{FeedRanker, LtrModel, Snapshot, TopicGraph};
