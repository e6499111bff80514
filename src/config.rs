use serde::Deserialize;
use std::fs;

use crate::constants::research;

#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConfig {
    /// Instruments researched concurrently per wave
    #[serde(default = "default_batch_size")]
    pub research_batch_size: usize,

    /// Phase 1 success rate required before decisions are synthesized
    #[serde(default = "default_min_success_rate")]
    pub min_research_success_rate: f64,

    /// Development-mode restriction: when set, only these symbols are
    /// researched and traded
    #[serde(default)]
    pub symbol_filter: Option<Vec<String>>,
}

fn default_batch_size() -> usize {
    research::DEFAULT_BATCH_SIZE
}

fn default_min_success_rate() -> f64 {
    research::DEFAULT_MIN_SUCCESS_RATE
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            research_batch_size: default_batch_size(),
            min_research_success_rate: default_min_success_rate(),
            symbol_filter: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AlpacaConfig {
    /// Fleet-wide fallback credentials; users may carry their own
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub base_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TrackedUser {
    pub id: String,

    /// Symbols watched but not necessarily held
    #[serde(default)]
    pub watchlist: Vec<String>,

    /// Per-user venue credentials; fall back to the top-level alpaca block
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Six-field cron expression; when absent the pipeline runs once and exits
    #[serde(default)]
    pub schedule: Option<String>,

    /// Root directory for the JSONL audit trail and conversations
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    pub llm_queue_size: usize,
    pub llm_max_concurrent: usize,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    pub llm: LlmConfig,
    pub alpaca: Option<AlpacaConfig>,

    pub users: Vec<TrackedUser>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl AppConfig {
    pub fn load() -> Self {
        Self::load_from("config.yaml")
    }

    pub fn load_from(path: &str) -> Self {
        let content = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));

        // Strip BOM if present
        let content = content.strip_prefix("\u{feff}").unwrap_or(&content);

        let config: AppConfig =
            serde_yaml::from_str(content).expect("Failed to parse configuration");
        config
    }

    /// Resolve venue credentials for a user: per-user keys win, the
    /// top-level alpaca block is the fallback.
    pub fn credentials_for(&self, user: &TrackedUser) -> Option<(String, String)> {
        let fallback = self.alpaca.as_ref();
        let api_key = user
            .api_key
            .clone()
            .or_else(|| fallback.and_then(|a| a.api_key.clone()))?;
        let secret_key = user
            .secret_key
            .clone()
            .or_else(|| fallback.and_then(|a| a.secret_key.clone()))?;
        Some((api_key, secret_key))
    }
}
