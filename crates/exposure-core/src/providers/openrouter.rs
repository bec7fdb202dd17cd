use super::ChatClient;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Request timeout for judge calls. Slow completions past this point are a
/// transient failure, picked up again on the next resumed run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat-completions client for an OpenRouter-compatible endpoint.
pub struct OpenRouterClient {
    endpoint: String,
    model: String,
    api_key: String,
    top_p: f32,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(
        endpoint: String,
        model: String,
        api_key: String,
        top_p: f32,
        temperature: f32,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            endpoint,
            model,
            api_key,
            top_p,
            temperature,
            client,
        })
    }
}

#[async_trait]
impl ChatClient for OpenRouterClient {
    async fn complete(&self, message: &str) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": message }],
            "top_p": self.top_p,
            "temperature": self.temperature,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_else(|_| String::new());
            anyhow::bail!("chat API error (status {}): {}", status, error_text);
        }

        let json: serde_json::Value = resp.json().await?;
        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("chat API response missing message content"))?
            .to_string();

        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }
}
