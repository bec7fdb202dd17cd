//! Seam to the local generative-model runtime.
//!
//! The inference engine itself is an external collaborator: it receives a
//! batch of prompts plus sampling parameters and returns one raw completion
//! per prompt. The pipeline drives it with exactly one blocking batched call
//! per rater and drops the engine before loading the next rater's model, so
//! at most one model is resident at a time.

use std::io::Write;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

/// Sampling configuration for local generation. The seed comes from the
/// pipeline config and is fixed at process start, so repeated runs with the
/// same inputs and weights are reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub seed: u64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.95,
            max_tokens: 2048,
            seed: 28,
        }
    }
}

/// One batched call into a local inference engine.
///
/// Synchronous from the pipeline's perspective; internal parallelism belongs
/// to the engine.
pub trait BatchEngine: Send {
    fn generate(&self, prompts: &[String], params: &SamplingParams) -> anyhow::Result<Vec<String>>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EngineRequest<'a> {
    model: &'a str,
    prompts: &'a [String],
    #[serde(flatten)]
    params: &'a SamplingParams,
}

/// Drives an external model runtime as a subprocess.
///
/// The request (model path, prompts, sampling parameters) is written to the
/// child's stdin as one JSON document; the child must print a JSON array of
/// completions, one per prompt, to stdout.
pub struct CommandEngine {
    command: Vec<String>,
    model_path: String,
    model_name: String,
}

impl CommandEngine {
    pub fn new(command: Vec<String>, model_path: String, model_name: String) -> Self {
        Self {
            command,
            model_path,
            model_name,
        }
    }
}

impl BatchEngine for CommandEngine {
    fn generate(&self, prompts: &[String], params: &SamplingParams) -> anyhow::Result<Vec<String>> {
        let program = self
            .command
            .first()
            .ok_or_else(|| anyhow::anyhow!("engine command is empty"))?;

        let mut child = Command::new(program)
            .args(&self.command[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow::anyhow!("failed to spawn engine '{}': {}", program, e))?;

        let request = EngineRequest {
            model: &self.model_path,
            prompts,
            params,
        };
        let payload = serde_json::to_vec(&request)?;
        child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("engine stdin unavailable"))?
            .write_all(&payload)?;

        let output = child.wait_with_output()?;
        if !output.status.success() {
            anyhow::bail!(
                "engine '{}' exited with {} for model {}",
                program,
                output.status,
                self.model_path
            );
        }

        let completions: Vec<String> = serde_json::from_slice(&output.stdout)
            .map_err(|e| anyhow::anyhow!("engine output is not a JSON string array: {}", e))?;
        anyhow::ensure!(
            completions.len() == prompts.len(),
            "engine returned {} completions for {} prompts",
            completions.len(),
            prompts.len()
        );
        Ok(completions)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Scripted engine replaying fixed completions, for tests.
pub struct ScriptedEngine {
    model_name: String,
    outputs: std::sync::Mutex<Vec<Vec<String>>>,
    batches_served: std::sync::atomic::AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(model_name: impl Into<String>, batches: Vec<Vec<String>>) -> Self {
        Self {
            model_name: model_name.into(),
            outputs: std::sync::Mutex::new(batches),
            batches_served: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn batches_served(&self) -> usize {
        self.batches_served.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl BatchEngine for ScriptedEngine {
    fn generate(&self, prompts: &[String], _params: &SamplingParams) -> anyhow::Result<Vec<String>> {
        let mut queue = self.outputs.lock().expect("poisoned output queue");
        if queue.is_empty() {
            anyhow::bail!("no more scripted batches");
        }
        let batch = queue.remove(0);
        anyhow::ensure!(
            batch.len() == prompts.len(),
            "scripted batch has {} outputs for {} prompts",
            batch.len(),
            prompts.len()
        );
        self.batches_served
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(batch)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
