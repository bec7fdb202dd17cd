use super::ChatClient;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type ScriptFn = dyn Fn(&str) -> anyhow::Result<String> + Send + Sync;

/// Deterministic in-memory chat client for tests and dry runs.
///
/// Either replays a fixed queue of responses or computes one per message
/// through a script closure. Counts calls so tests can assert how many
/// records were actually submitted.
pub struct FakeChatClient {
    responses: Mutex<Vec<String>>,
    script: Option<Box<ScriptFn>>,
    calls: AtomicUsize,
}

impl FakeChatClient {
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
            script: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Respond per-message through `script`.
    pub fn scripted<F>(script: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            responses: Mutex::new(Vec::new()),
            script: Some(Box::new(script)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatClient for FakeChatClient {
    async fn complete(&self, message: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(script) = &self.script {
            return script(message);
        }
        let mut queue = self.responses.lock().expect("poisoned response queue");
        if queue.is_empty() {
            anyhow::bail!("no more scripted responses");
        }
        Ok(queue.remove(0))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
