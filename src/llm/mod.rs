//! LLM domain: the two hosted-model calls behind LeafGuard.
//!
//! Public API for the inference layer. The controller only talks to
//! [`DiseaseService`]; everything provider-specific stays in here.
//!
//! Providers:
//!   - Google Gemini Flash (gemini.rs), default
//!   - Anthropic Claude Haiku (anthropic.rs)
//!
//! Calls:
//!   - detect.rs: leaf image → DetectionResult
//!   - summarize.rs: disease name → SummaryResult
//!
//! Shared:
//!   - prompts.rs: instruction templates + output schemas
//!   - parse.rs: fence stripping + typed JSON parsing
//!   - provider.rs: provider metadata

mod anthropic;
mod detect;
mod gemini;
pub mod parse;
pub mod prompts;
pub mod provider;
mod summarize;
pub mod types;

pub use anthropic::AnthropicBackend;
pub use detect::detect_disease;
pub use gemini::GeminiBackend;
pub use summarize::summarize_disease_info;
pub use types::{
    DetectedDisease, DetectionRequest, DetectionResult, SummaryRequest, SummaryResult,
};

use crate::config::{self, AppConfig};
use crate::http::{self, RetryPolicy};
use crate::image_input::InlineImage;
use crate::{Error, Result};
use async_trait::async_trait;
use prompts::PromptSet;
use provider::ProviderKind;
use std::sync::Arc;

/// One model call: instructions, optional image, and the JSON shape expected back.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Log tag of the calling stage ("DETECT", "SUMMARY", ...).
    pub tag: &'static str,
    pub system: String,
    pub text: String,
    pub image: Option<InlineImage>,
    pub schema: serde_json::Value,
    pub max_tokens: u32,
}

/// Raw model answer plus token usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A hosted model that can answer a [`GenerationRequest`].
#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn provider(&self) -> ProviderKind;
    fn model(&self) -> &str;
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation>;
}

/// The inference boundary the controller depends on.
#[async_trait]
pub trait DiseaseService: Send + Sync {
    async fn detect_disease(&self, request: &DetectionRequest) -> Result<DetectionResult>;
    async fn summarize_disease_info(&self, request: &SummaryRequest) -> Result<SummaryResult>;
}

/// Production [`DiseaseService`]: one backend, one prompt set, one client.
pub struct Inference {
    pub(crate) backend: Arc<dyn ModelBackend>,
    pub(crate) prompts: PromptSet,
    pub(crate) client: reqwest::Client,
    pub(crate) policy: RetryPolicy,
}

impl Inference {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        prompts: PromptSet,
        client: reqwest::Client,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            prompts,
            client,
            policy,
        }
    }

    /// Build the service for the configured (or auto-detected) provider.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = http::build_client(config.request_timeout())?;
        let policy = RetryPolicy {
            max_retries: config.max_retries,
            ..RetryPolicy::default()
        };
        let kind = config.resolve_provider();
        let backend = backend_for(kind, config, client.clone(), policy)?;
        log::info!("[LLM] Provider: {} ({})", kind, backend.model());
        Ok(Self::new(backend, config.prompt_set()?, client, policy))
    }

    pub fn backend(&self) -> &dyn ModelBackend {
        self.backend.as_ref()
    }
}

#[async_trait]
impl DiseaseService for Inference {
    async fn detect_disease(&self, request: &DetectionRequest) -> Result<DetectionResult> {
        let image = request.image.resolve(&self.client, &self.policy).await?;
        detect::detect_disease(self.backend.as_ref(), &self.prompts.detect, &image).await
    }

    async fn summarize_disease_info(&self, request: &SummaryRequest) -> Result<SummaryResult> {
        summarize::summarize_disease_info(self.backend.as_ref(), &self.prompts.summarize, request)
            .await
    }
}

/// Stand-in used when no provider key is available yet: every call fails
/// with the original configuration error, so the UI shows a failure notice
/// instead of the app refusing to start.
pub struct Unconfigured {
    reason: String,
}

impl Unconfigured {
    pub fn new(reason: &Error) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl DiseaseService for Unconfigured {
    async fn detect_disease(&self, _request: &DetectionRequest) -> Result<DetectionResult> {
        Err(Error::Config(self.reason.clone()))
    }

    async fn summarize_disease_info(&self, _request: &SummaryRequest) -> Result<SummaryResult> {
        Err(Error::Config(self.reason.clone()))
    }
}

/// Construct the backend for `kind`, resolving its API key.
pub fn backend_for(
    kind: ProviderKind,
    config: &AppConfig,
    client: reqwest::Client,
    policy: RetryPolicy,
) -> Result<Arc<dyn ModelBackend>> {
    let api_key = config::require_api_key(kind)?;
    let settings = config.provider_settings(kind);
    Ok(match kind {
        ProviderKind::Gemini => Arc::new(GeminiBackend::new(client, settings, api_key, policy)),
        ProviderKind::Anthropic => {
            Arc::new(AnthropicBackend::new(client, settings, api_key, policy))
        }
    })
}

/// Send a minimal request and check for a usable answer.
pub async fn test_connection(backend: &dyn ModelBackend) -> Result<()> {
    let request = GenerationRequest {
        tag: "TEST",
        system: "Answer with JSON only.".to_string(),
        text: "Reply with just: {\"ok\": true}".to_string(),
        image: None,
        schema: serde_json::json!({
            "type": "OBJECT",
            "properties": { "ok": { "type": "BOOLEAN" } },
            "required": ["ok"]
        }),
        max_tokens: 50,
    };
    let generation = backend.generate(&request).await?;
    log::info!(
        "[SETTINGS] Test {}: {} chars back",
        backend.provider(),
        generation.text.len()
    );
    Ok(())
}

/// Log token usage and estimated cost for a finished call.
pub(crate) fn log_usage(tag: &str, kind: ProviderKind, generation: &Generation) {
    if generation.input_tokens == 0 && generation.output_tokens == 0 {
        return;
    }
    log::info!(
        "[{}] Tokens: {} in / {} out, estimated cost ${:.6}",
        tag,
        generation.input_tokens,
        generation.output_tokens,
        kind.estimated_cost(generation.input_tokens, generation.output_tokens)
    );
}
