use std::path::Path;
use std::sync::Arc;

use exposure_core::config::{self, PipelineConfig, RaterConfig};
use exposure_core::engine::{BatchEngine, CommandEngine};
use exposure_core::pipeline::EngineFactory;
use exposure_core::providers::OpenRouterClient;
use exposure_core::{JudgeClient, Pipeline, RateLimiter};

/// Assemble a pipeline from a config file: judge client against the
/// configured endpoint, shared rate limiter, and a factory that spawns the
/// inference worker per rater.
pub fn build(config_path: &Path) -> anyhow::Result<Pipeline> {
    let config = PipelineConfig::load(config_path)?;
    let api_key = config::api_key_from_env()?;

    let client = OpenRouterClient::new(
        config.judge.endpoint.clone(),
        config.judge.model.clone(),
        api_key,
        config.judge.top_p as f32,
        config.judge.temperature as f32,
    )?;
    let limiter = RateLimiter::per_minute(config.rate_limit_per_minute);
    let judge = JudgeClient::new(Arc::new(client), Arc::new(limiter));

    let command = config.engine.command.clone();
    let engines: EngineFactory = Box::new(move |rater: &RaterConfig| {
        let engine = CommandEngine::new(
            command.clone(),
            rater.model_path.display().to_string(),
            rater.name.clone(),
        );
        Ok(Box::new(engine) as Box<dyn BatchEngine>)
    });

    Ok(Pipeline::new(config, judge, engines))
}
