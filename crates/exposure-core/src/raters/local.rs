use std::collections::HashMap;

use crate::engine::{BatchEngine, SamplingParams};
use crate::judge::extract_bracketed_raw;
use crate::model::{RaterOutcome, RecordId, TaskRecord};
use crate::prompt;

/// Rater backed by a locally hosted generative model.
///
/// Builds one few-shot prompt per unresolved record and issues all of them
/// in a single batched call to the inference engine. This is the most
/// resource-intensive step of the pipeline; the caller drops the rater (and
/// with it the engine) after the batch so only one model is resident at a
/// time.
pub struct LocalBatchRater {
    engine: Box<dyn BatchEngine>,
    params: SamplingParams,
}

impl LocalBatchRater {
    pub fn new(engine: Box<dyn BatchEngine>, params: SamplingParams) -> Self {
        Self { engine, params }
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }

    pub fn run(
        &self,
        records: &[TaskRecord],
    ) -> anyhow::Result<HashMap<RecordId, RaterOutcome>> {
        let model_name = self.engine.model_name().to_string();
        let prompts: Vec<String> = records
            .iter()
            .map(|r| prompt::build_eval_prompt(r, &model_name))
            .collect();

        let outputs = self.engine.generate(&prompts, &self.params)?;
        anyhow::ensure!(
            outputs.len() == records.len(),
            "engine returned {} outputs for {} records",
            outputs.len(),
            records.len()
        );

        Ok(records
            .iter()
            .zip(outputs)
            .map(|(record, output)| (record.id.clone(), parse_evaluation(&output)))
            .collect())
    }
}

/// Parse a raw completion into a rater outcome.
///
/// The model is asked for `[rating, "justification"]`; the first bracketed
/// segment is parsed as a JSON two-element array. On any extraction or
/// coercion failure the rating is absent and the raw output is kept
/// verbatim as the justification, never discarded.
pub fn parse_evaluation(output: &str) -> RaterOutcome {
    if let Some(segment) = extract_bracketed_raw(output) {
        if let Ok((rating, justification)) = serde_json::from_str::<(i64, String)>(segment) {
            if (1..=5).contains(&rating) {
                return RaterOutcome::resolved(rating as u8, justification);
            }
        }
    }
    RaterOutcome::unresolved(output.trim())
}
