pub mod fake;
pub mod openrouter;

pub use fake::FakeChatClient;
pub use openrouter::OpenRouterClient;

use async_trait::async_trait;

/// Transport seam for single-message chat completions.
///
/// Implementations return the assistant message content; any transport,
/// timeout or status failure surfaces as an error. No retries; a failed
/// record is resolved by a later resumed run.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, message: &str) -> anyhow::Result<String>;

    fn provider_name(&self) -> &'static str;
}
