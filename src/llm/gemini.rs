//! Gemini Flash backend: `generateContent` via the Google AI API.
//!
//! Key differences from the Anthropic backend:
//! - API key in the `x-goog-api-key` header
//! - `responseMimeType: "application/json"` + `responseSchema` enforce the
//!   output shape server-side (no fence stripping needed, but tolerated)
//! - Text lives in `candidates[0].content.parts[*].text`
//! - Token usage in `usageMetadata`

use super::provider::ProviderKind;
use super::{Generation, GenerationRequest, ModelBackend};
use crate::config::ProviderSettings;
use crate::http::{self, RetryPolicy};
use crate::{Error, Result};
use async_trait::async_trait;

pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    policy: RetryPolicy,
}

impl GeminiBackend {
    pub fn new(
        client: reqwest::Client,
        settings: &ProviderSettings,
        api_key: String,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
            policy,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut parts = vec![serde_json::json!({ "text": request.text })];
        if let Some(image) = &request.image {
            parts.push(serde_json::json!({
                "inlineData": {
                    "mimeType": image.mime_type(),
                    "data": image.data(),
                }
            }));
        }
        serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": parts
                }
            ],
            "systemInstruction": {
                "parts": [
                    {
                        "text": request.system
                    }
                ]
            },
            "generationConfig": {
                "maxOutputTokens": request.max_tokens,
                "temperature": 0.1,
                "responseMimeType": "application/json",
                "responseSchema": request.schema
            }
        })
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let url = self.endpoint();
        let body = self.body(request);
        log::debug!("[LLM] POST {} (gemini)", url);

        let resp = http::send_with_retry(request.tag, &self.policy, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("content-type", "application/json")
                .json(&body)
        })
        .await?;

        let json = http::read_json(request.tag, resp).await?;
        extract_generation(&json)
    }
}

/// Pull text and token usage out of a `generateContent` response.
fn extract_generation(json: &serde_json::Value) -> Result<Generation> {
    if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
        return Err(Error::MalformedOutput(format!(
            "prompt blocked by provider: {}",
            reason
        )));
    }

    let candidate = json["candidates"]
        .get(0)
        .ok_or_else(|| Error::MalformedOutput("response has no candidates".to_string()))?;

    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let finish = candidate["finishReason"].as_str().unwrap_or("unknown");
        return Err(Error::MalformedOutput(format!(
            "empty response (finishReason: {})",
            finish
        )));
    }

    let usage = &json["usageMetadata"];
    Ok(Generation {
        text,
        input_tokens: usage["promptTokenCount"].as_u64().unwrap_or(0),
        output_tokens: usage["candidatesTokenCount"].as_u64().unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_parts_and_reads_usage() {
        let json = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"summary\":" }, { "text": " \"ok\"}" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 5 }
        });
        let g = extract_generation(&json).unwrap();
        assert_eq!(g.text, "{\"summary\": \"ok\"}");
        assert_eq!((g.input_tokens, g.output_tokens), (12, 5));
    }

    #[test]
    fn blocked_prompt_is_malformed_output() {
        let json = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(
            extract_generation(&json),
            Err(Error::MalformedOutput(_))
        ));
    }

    #[test]
    fn empty_candidate_is_malformed_output() {
        let json = serde_json::json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "MAX_TOKENS" }]
        });
        let err = extract_generation(&json).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }
}
