//! Configuration loading and the typed sections the pipeline recognizes.
//!
//! Figment merges `config.toml` + `config.<env>.toml` (selected by
//! `RUST_ENV`) + `APP_*` environment variables. Typed sections are extracted
//! with serde and validated up front so bad values fail pipeline
//! construction, never a query.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("failed to get '{key}': {e}")))
    }

    /// The `[retrieval]` section, validated, defaults when absent.
    pub fn retrieval(&self) -> Result<RetrievalConfig> {
        let cfg: RetrievalConfig = self.get("retrieval").unwrap_or_default();
        cfg.validate()?;
        Ok(cfg)
    }

    /// The `[guard]` section, validated, defaults when absent.
    pub fn guard(&self) -> Result<GuardConfig> {
        let cfg: GuardConfig = self.get("guard").unwrap_or_default();
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Retrieval fan-out and fusion weighting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to generation per query.
    pub k: usize,
    /// Each index is asked for `k * overfetch` candidates before fusion.
    pub overfetch: usize,
    pub lexical_weight: f32,
    pub vector_weight: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: 3, overfetch: 4, lexical_weight: 0.5, vector_weight: 0.5 }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be at least 1".to_string()));
        }
        if self.overfetch == 0 {
            return Err(Error::InvalidConfig("retrieval.overfetch must be at least 1".to_string()));
        }
        if self.lexical_weight < 0.0 || self.vector_weight < 0.0 {
            return Err(Error::InvalidConfig("fusion weights must be non-negative".to_string()));
        }
        if self.lexical_weight == 0.0 && self.vector_weight == 0.0 {
            return Err(Error::InvalidConfig("at least one fusion weight must be positive".to_string()));
        }
        Ok(())
    }
}

/// Guard thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Minimum trimmed query length in characters.
    pub min_query_len: usize,
    /// Maximum trimmed query length in characters.
    pub max_query_len: usize,
    /// Answers scoring below this are rejected as low confidence.
    pub confidence_threshold: f32,
    /// Enables the optional topical-relevance check.
    pub topic_check: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self { min_query_len: 3, max_query_len: 2000, confidence_threshold: 0.5, topic_check: false }
    }
}

impl GuardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_query_len > self.max_query_len {
            return Err(Error::InvalidConfig(format!(
                "guard.min_query_len ({}) exceeds guard.max_query_len ({})",
                self.min_query_len, self.max_query_len
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::InvalidConfig(
                "guard.confidence_threshold must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Chunking knobs consumed by the corpus loader, not the pipeline core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 250, overlap_percent: 0.2 }
    }
}
