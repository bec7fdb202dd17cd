//! Rate-limited client for the remote judging service.
//!
//! One request per record, validated before it is accepted: the secondary
//! classification must embed exactly one JSON object and echo back the
//! title/task it was asked about (see [`crate::identity`]); the
//! summarization call must return a bracketed summary. Failures are typed
//! ([`JudgeError`]) and never retried here; resolution is a later resumed
//! run.

mod extract;

pub use extract::{extract_bracketed, extract_bracketed_raw, extract_json_object};

use std::sync::Arc;

use crate::errors::JudgeError;
use crate::identity;
use crate::limiter::RateLimiter;
use crate::model::{SecondaryOutcome, TaskRecord};
use crate::prompt;
use crate::providers::ChatClient;

#[derive(Clone)]
pub struct JudgeClient {
    client: Arc<dyn ChatClient>,
    limiter: Arc<RateLimiter>,
}

impl JudgeClient {
    pub fn new(client: Arc<dyn ChatClient>, limiter: Arc<RateLimiter>) -> Self {
        Self { client, limiter }
    }

    /// Summarize the raters' justifications for one record into one text.
    ///
    /// The judge is instructed to wrap the summary in square brackets; if no
    /// bracketed segment is present the trimmed content is used as-is, the
    /// same lenient fallback the raters get for their raw output.
    pub async fn summarize(
        &self,
        record: &TaskRecord,
        justifications: &[String],
    ) -> Result<String, JudgeError> {
        self.limiter.acquire().await;
        let message = prompt::build_summary_prompt(record, justifications);
        let content = self
            .client
            .complete(&message)
            .await
            .map_err(|e| JudgeError::Transient(e.to_string()))?;
        Ok(extract_bracketed(&content).unwrap_or_else(|| content.trim().to_string()))
    }

    /// Classify the AI engagement level for one record from its consensus
    /// summary. Accepts the response only if it echoes the record it was
    /// asked about.
    pub async fn classify(
        &self,
        record: &TaskRecord,
        summary: &str,
    ) -> Result<SecondaryOutcome, JudgeError> {
        self.limiter.acquire().await;
        let message = prompt::build_engagement_prompt(record, summary);
        let content = self
            .client
            .complete(&message)
            .await
            .map_err(|e| JudgeError::Transient(e.to_string()))?;

        let value = extract_json_object(&content)
            .ok_or_else(|| JudgeError::Malformed("no JSON object in judge output".into()))?;

        let echoed_title = value.get("job_title").and_then(|v| v.as_str()).unwrap_or("");
        let echoed_task = value.get("job_task").and_then(|v| v.as_str()).unwrap_or("");
        if !identity::echo_matches(&record.title, echoed_title) {
            return Err(JudgeError::IdentityMismatch(format!(
                "echoed title '{}' does not match '{}'",
                echoed_title, record.title
            )));
        }
        if !identity::echo_matches(&record.task, echoed_task) {
            return Err(JudgeError::IdentityMismatch(format!(
                "echoed task does not match record {}",
                record.id
            )));
        }

        let engagement = value
            .get("ai_engagement_level")
            .and_then(coerce_integer)
            .filter(|v| (1..=5).contains(v))
            .ok_or_else(|| {
                JudgeError::Malformed("ai_engagement_level missing or outside 1-5".into())
            })?;

        let complementary = value
            .get("flag")
            .and_then(coerce_flag)
            .ok_or_else(|| JudgeError::Malformed("flag missing or not binary".into()))?;

        let reasoning = value
            .get("reasoning")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        Ok(SecondaryOutcome {
            engagement: engagement as u8,
            complementary,
            reasoning,
        })
    }
}

/// Accept integers whether the judge emitted them as numbers or strings.
fn coerce_integer(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_flag(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        _ => match coerce_integer(value)? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        },
    }
}
