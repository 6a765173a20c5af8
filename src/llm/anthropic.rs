//! Anthropic Claude backend: Messages API, non-streaming.
//!
//! Claude has no server-side JSON schema here, so the schema is appended to
//! the system prompt and the reply goes through fence stripping in
//! `parse.rs`. The image is sent as a base64 `image` content block ahead of
//! the instruction text.

use super::provider::ProviderKind;
use super::{Generation, GenerationRequest, ModelBackend};
use crate::config::ProviderSettings;
use crate::http::{self, RetryPolicy};
use crate::{Error, Result};
use async_trait::async_trait;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    policy: RetryPolicy,
}

impl AnthropicBackend {
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

    fn body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut content = Vec::new();
        if let Some(image) = &request.image {
            content.push(serde_json::json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.mime_type(),
                    "data": image.data(),
                }
            }));
        }
        content.push(serde_json::json!({ "type": "text", "text": request.text }));

        let schema = serde_json::to_string_pretty(&json_schema(&request.schema))
            .unwrap_or_else(|_| request.schema.to_string());
        let system = format!(
            "{}\n\n<response_format>\nRespond with ONLY a JSON object matching this schema. No prose, no markdown.\n{}\n</response_format>",
            request.system, schema
        );

        serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "system": system,
            "messages": [
                {
                    "role": "user",
                    "content": content,
                }
            ]
        })
    }
}

/// Lower-case the OpenAPI-style `"type": "OBJECT"` tags into JSON Schema.
fn json_schema(schema: &serde_json::Value) -> serde_json::Value {
    match schema {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = match (k.as_str(), v) {
                        ("type", serde_json::Value::String(t)) => {
                            serde_json::Value::String(t.to_lowercase())
                        }
                        _ => json_schema(v),
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(json_schema).collect())
        }
        other => other.clone(),
    }
}

#[async_trait]
impl ModelBackend for AnthropicBackend {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let url = format!("{}/messages", self.base_url);
        let body = self.body(request);
        log::debug!("[LLM] POST {} (anthropic)", url);

        let resp = http::send_with_retry(request.tag, &self.policy, || {
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
        })
        .await?;

        let json = http::read_json(request.tag, resp).await?;
        extract_generation(&json)
    }
}

/// Extract text content and usage from a Messages API response.
fn extract_generation(json: &serde_json::Value) -> Result<Generation> {
    let content = json["content"]
        .as_array()
        .ok_or_else(|| Error::MalformedOutput("no content in response".to_string()))?;

    let text: String = content
        .iter()
        .filter(|block| block["type"].as_str() == Some("text"))
        .filter_map(|block| block["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        let stop = json["stop_reason"].as_str().unwrap_or("unknown");
        return Err(Error::MalformedOutput(format!(
            "no text in response (stop_reason: {})",
            stop
        )));
    }

    Ok(Generation {
        text,
        input_tokens: json["usage"]["input_tokens"].as_u64().unwrap_or(0),
        output_tokens: json["usage"]["output_tokens"].as_u64().unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_types_are_lowercased() {
        let schema = json_schema(&crate::llm::prompts::summary_schema());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["summary"]["type"], "string");
        assert_eq!(schema["required"][0], "summary");
    }

    #[test]
    fn text_blocks_are_collected() {
        let json = serde_json::json!({
            "content": [{ "type": "text", "text": "{\"summary\": \"x\"}" }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 40, "output_tokens": 9 }
        });
        let g = extract_generation(&json).unwrap();
        assert_eq!(g.text, "{\"summary\": \"x\"}");
        assert_eq!(g.output_tokens, 9);
    }

    #[test]
    fn missing_content_is_malformed_output() {
        let json = serde_json::json!({ "type": "error" });
        assert!(matches!(
            extract_generation(&json),
            Err(Error::MalformedOutput(_))
        ));
    }
}
