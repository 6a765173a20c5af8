//! Instruction templates for the two model calls.
//!
//! Templates are data: the defaults below can be replaced from the config
//! file (`prompts.detect` / `prompts.summarize`) without touching the
//! calling code. Placeholders use `{{name}}` syntax.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

pub const DETECT_MAX_TOKENS: u32 = 256;
pub const SUMMARY_MAX_TOKENS: u32 = 1024;

/// Placeholder the summary template must contain.
pub const DISEASE_NAME_VAR: &str = "diseaseName";

pub const DETECT_SYSTEM_PROMPT: &str = "You are an AI model specializing in plant leaf disease detection. \
You only ever answer with a JSON object matching the requested schema.";

/// DETECT instruction: sent as the text part alongside the leaf image.
pub const DETECT_TEMPLATE: &str = r#"Analyze the attached image of a plant leaf and determine whether any disease is present.

<rules>
1. If a disease is identified, set "diseaseDetected" to true and give both "diseaseName" (common name) and "confidenceLevel" (a number between 0 and 1).
2. If the leaf looks healthy, set "diseaseDetected" to false and omit "diseaseName" and "confidenceLevel".
3. Never report a disease name without a confidence level, or the other way round.
</rules>"#;

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are an expert in plant diseases. \
You only ever answer with a JSON object matching the requested schema.";

/// SUMMARIZE instruction: `{{diseaseName}}` is filled with the detected disease.
pub const SUMMARY_TEMPLATE: &str = "Please provide a brief summary of the following plant disease, \
including its common symptoms and potential treatments.\n\nDisease Name: {{diseaseName}}";

/// One named instruction template plus its system prompt and token budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub name: String,
    pub system: String,
    pub template: String,
    pub max_tokens: u32,
}

impl PromptTemplate {
    /// Substitute `{{key}}` placeholders. Unknown placeholders are left as-is.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        vars.iter().fold(self.template.clone(), |acc, (key, value)| {
            acc.replace(&format!("{{{{{}}}}}", key), value)
        })
    }

    pub fn has_var(&self, key: &str) -> bool {
        self.template.contains(&format!("{{{{{}}}}}", key))
    }
}

/// User-supplied replacements, read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromptOverrides {
    pub detect: Option<String>,
    pub summarize: Option<String>,
}

/// The pair of templates used by the detection flow.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSet {
    pub detect: PromptTemplate,
    pub summarize: PromptTemplate,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            detect: PromptTemplate {
                name: "diseaseDetectionPrompt".to_string(),
                system: DETECT_SYSTEM_PROMPT.to_string(),
                template: DETECT_TEMPLATE.to_string(),
                max_tokens: DETECT_MAX_TOKENS,
            },
            summarize: PromptTemplate {
                name: "summarizeDiseaseInfoPrompt".to_string(),
                system: SUMMARY_SYSTEM_PROMPT.to_string(),
                template: SUMMARY_TEMPLATE.to_string(),
                max_tokens: SUMMARY_MAX_TOKENS,
            },
        }
    }
}

impl PromptSet {
    /// Defaults with any configured overrides applied.
    ///
    /// A summary override that drops `{{diseaseName}}` is rejected: the
    /// call would no longer say which disease to summarize.
    pub fn with_overrides(overrides: &PromptOverrides) -> Result<Self> {
        let mut set = Self::default();
        if let Some(detect) = overrides.detect.as_deref().filter(|t| !t.trim().is_empty()) {
            set.detect.template = detect.to_string();
            log::info!("[PROMPTS] Using configured detect template");
        }
        if let Some(summarize) = overrides.summarize.as_deref().filter(|t| !t.trim().is_empty()) {
            set.summarize.template = summarize.to_string();
            if !set.summarize.has_var(DISEASE_NAME_VAR) {
                return Err(Error::Config(format!(
                    "summarize template must contain {{{{{}}}}}",
                    DISEASE_NAME_VAR
                )));
            }
            log::info!("[PROMPTS] Using configured summarize template");
        }
        Ok(set)
    }
}

/// Output schema for DETECT, in the OpenAPI subset Gemini accepts.
pub fn detection_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "diseaseDetected": {
                "type": "BOOLEAN",
                "description": "Whether a disease was detected or not."
            },
            "diseaseName": {
                "type": "STRING",
                "description": "The name of the detected disease, if any."
            },
            "confidenceLevel": {
                "type": "NUMBER",
                "description": "The confidence level of the detection (0-1), if a disease is detected."
            }
        },
        "required": ["diseaseDetected"]
    })
}

/// Output schema for SUMMARIZE.
pub fn summary_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "A brief summary of the disease, including common symptoms and potential treatments."
            }
        },
        "required": ["summary"]
    })
}
