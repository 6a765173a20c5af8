//! Provider catalogue: which hosted models LeafGuard can talk to.
//!
//! The pipeline dispatches to the active provider based on configuration;
//! this module only knows names, env keys, and pricing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A hosted inference provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Anthropic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Gemini, ProviderKind::Anthropic];

    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// Environment variable holding the API key.
    pub fn env_key(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// (input, output) USD per 1M tokens, for cost logging only.
    pub fn pricing_per_million(self) -> (f64, f64) {
        match self {
            ProviderKind::Gemini => (0.10, 0.40),
            ProviderKind::Anthropic => (0.80, 4.0),
        }
    }

    pub fn estimated_cost(self, input_tokens: u64, output_tokens: u64) -> f64 {
        let (input, output) = self.pricing_per_million();
        (input_tokens as f64 * input + output_tokens as f64 * output) / 1_000_000.0
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" | "googleai" => Ok(ProviderKind::Gemini),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            other => Err(crate::Error::Config(format!("unknown provider: {}", other))),
        }
    }
}

/// Provider metadata exposed to the settings panel and `leafguard providers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub env_key: String,
    pub cost_per_detection: String,
    pub supports_json_schema: bool,
}

/// All known providers and their display info.
pub fn all_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            id: ProviderKind::Gemini.id().to_string(),
            name: "Gemini Flash (default, native JSON schema)".to_string(),
            env_key: ProviderKind::Gemini.env_key().to_string(),
            cost_per_detection: "Free tier / ~$0.0002".to_string(),
            supports_json_schema: true,
        },
        ProviderInfo {
            id: ProviderKind::Anthropic.id().to_string(),
            name: "Claude Haiku (vision, schema via prompt)".to_string(),
            env_key: ProviderKind::Anthropic.env_key().to_string(),
            cost_per_detection: "~$0.002".to_string(),
            supports_json_schema: false,
        },
    ]
}
