use crate::error::{RankingError, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub refresh: RefreshConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
    pub log_format: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Snapshot refresh cadence for the topic graph and the LTR model.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub topic_graph_interval_secs: u64,
    pub ltr_model_interval_secs: u64,
    pub ltr_model_path: String,
}

/// Tuning constants for the ranking pass.
///
/// Loaded from `RANKING_*` environment variables; every field has a default
/// so an empty environment yields the production values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Multiplicative per-hop factor for hierarchical and lateral propagation
    pub hierarchical_decay: f64,
    pub max_lateral_hops: usize,
    pub max_descendant_depth: usize,
    /// Decay floors reached at diversity_mix = 1.0
    pub topic_min_decay: f64,
    pub channel_min_decay: f64,
    pub platform_min_decay: f64,
    pub graph_blend_weight: f64,
    pub embedding_blend_weight: f64,
    /// Scale of the log-velocity trending multiplier
    pub trending_factor: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            hierarchical_decay: 0.7,
            max_lateral_hops: 2,
            max_descendant_depth: 3,
            topic_min_decay: 0.6,
            channel_min_decay: 0.5,
            platform_min_decay: 0.84,
            graph_blend_weight: 0.6,
            embedding_blend_weight: 0.4,
            trending_factor: 0.1,
        }
    }
}

impl RankingConfig {
    pub fn from_env() -> Result<Self> {
        let config = envy::prefixed("RANKING_").from_env::<RankingConfig>()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(RankingError::Config(format!("{} must be in [0, 1], got {}", name, v)))
            }
        };
        unit("hierarchical_decay", self.hierarchical_decay)?;
        unit("topic_min_decay", self.topic_min_decay)?;
        unit("channel_min_decay", self.channel_min_decay)?;
        unit("platform_min_decay", self.platform_min_decay)?;
        unit("graph_blend_weight", self.graph_blend_weight)?;
        unit("embedding_blend_weight", self.embedding_blend_weight)?;
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            service: ServiceConfig {
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "clipfeed-ranking".to_string()),
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .map_err(|_| RankingError::Config("DATABASE_URL must be set".to_string()))?,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5)?,
            },
            refresh: RefreshConfig {
                topic_graph_interval_secs: parse_var("TOPIC_GRAPH_REFRESH_SECS", 300)?,
                ltr_model_interval_secs: parse_var("LTR_MODEL_REFRESH_SECS", 300)?,
                ltr_model_path: env::var("L2R_MODEL_PATH")
                    .unwrap_or_else(|_| "/data/l2r_model.json".to_string()),
            },
            ranking: RankingConfig::from_env()?,
        })
    }
}

/// Read an env var, falling back to `default` when unset.
pub(crate) fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| RankingError::Config(format!("{} is invalid: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_defaults() {
        let config = RankingConfig::default();
        assert_eq!(config.hierarchical_decay, 0.7);
        assert_eq!(config.max_lateral_hops, 2);
        assert_eq!(config.max_descendant_depth, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_decay() {
        let config = RankingConfig {
            channel_min_decay: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RankingError::Config(_))));
    }

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let value: u64 = parse_var("CLIPFEED_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
