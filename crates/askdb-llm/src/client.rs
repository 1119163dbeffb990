//! OpenAI-compatible chat-completions client.
//!
//! The pipeline is synchronous, so the client owns a small tokio runtime
//! and blocks on each call; the per-request timeout wraps the entire
//! send/receive exchange. Works against any endpoint speaking the
//! chat-completions wire format (Groq by default).

use askdb_core::config::LlmSettings;
use askdb_core::error::{Error, Result};
use askdb_core::traits::{CompletionRequest, LanguageModel};
use serde::Deserialize;
use serde_json::json;

pub struct ChatClient {
    http: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    api_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl ChatClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Completion(format!("failed to start client runtime: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            runtime,
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

impl LanguageModel for ChatClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let completion: ChatCompletion = self.runtime.block_on(async {
            let call = async {
                let response = self
                    .http
                    .post(&self.api_url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| Error::Completion(format!("request failed: {e}")))?;
                let response = response
                    .error_for_status()
                    .map_err(|e| Error::Completion(format!("api returned an error: {e}")))?;
                response
                    .json::<ChatCompletion>()
                    .await
                    .map_err(|e| Error::Completion(format!("malformed response body: {e}")))
            };
            match tokio::time::timeout(request.timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(Error::Completion(format!(
                    "timed out after {}s",
                    request.timeout.as_secs()
                ))),
            }
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Completion("response carried no choices".to_string()))?;
        Ok(content.trim().to_string())
    }
}
