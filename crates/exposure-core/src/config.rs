//! Pipeline configuration, loaded from a YAML file.
//!
//! Everything operational lives here. The only secret, the judge API key,
//! comes from the `API_KEY` environment variable (a `.env` file is honored).

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input dataset (CSV with `Task ID`, `Title`, `Task` columns).
    pub dataset: PathBuf,
    /// Final merged output table.
    pub output: PathBuf,
    /// Directory for per-stage checkpoints and failure logs. Defaults to the
    /// output's parent directory.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    #[serde(default = "defaults::seed")]
    pub seed: u64,
    /// Judge requests per minute, enforced globally across workers.
    #[serde(default = "defaults::rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    /// Upper bound on concurrent judge calls per stage.
    #[serde(default = "defaults::max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default)]
    pub judge: JudgeConfig,
    /// Local raters, run in order; each gets exclusive use of the engine.
    pub raters: Vec<RaterConfig>,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    #[serde(default = "defaults::judge_endpoint")]
    pub endpoint: String,
    #[serde(default = "defaults::judge_model")]
    pub model: String,
    #[serde(default = "defaults::judge_top_p")]
    pub top_p: f64,
    #[serde(default)]
    pub temperature: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::judge_endpoint(),
            model: defaults::judge_model(),
            top_p: defaults::judge_top_p(),
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaterConfig {
    /// Checkpoint stage name and output column prefix.
    pub name: String,
    pub model_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Inference worker invocation; each rater's model path is handed to it
    /// in the request payload.
    pub command: Vec<String>,
}

mod defaults {
    pub fn seed() -> u64 {
        28
    }

    pub fn rate_limit_per_minute() -> u32 {
        60
    }

    pub fn max_in_flight() -> usize {
        100
    }

    pub fn judge_endpoint() -> String {
        "https://openrouter.ai/api/v1/chat/completions".to_string()
    }

    pub fn judge_model() -> String {
        "qwen/qwen-2.5-72b-instruct".to_string()
    }

    pub fn judge_top_p() -> f64 {
        1.0
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        anyhow::ensure!(!config.raters.is_empty(), "config lists no raters");
        anyhow::ensure!(
            !config.engine.command.is_empty(),
            "config lists no engine command"
        );
        Ok(config)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| {
            self.output
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }
}

/// Read the judge API key. A missing key is fatal: the pipeline refuses to
/// start rather than fail hundreds of requests later.
pub fn api_key_from_env() -> anyhow::Result<String> {
    dotenvy::dotenv().ok();
    std::env::var("API_KEY").context("API_KEY is not set (environment or .env)")
}
