//! SUMMARIZE call: disease name in, symptoms-and-treatment prose out.

use super::parse;
use super::prompts::{self, PromptTemplate, DISEASE_NAME_VAR};
use super::types::{SummaryRequest, SummaryResult};
use super::{GenerationRequest, ModelBackend};
use crate::{Error, Result};

pub async fn summarize_disease_info(
    backend: &dyn ModelBackend,
    prompt: &PromptTemplate,
    request: &SummaryRequest,
) -> Result<SummaryResult> {
    log::info!("[SUMMARY] Summarizing: {}", request.disease_name());

    let generation_request = GenerationRequest {
        tag: "SUMMARY",
        system: prompt.system.clone(),
        text: prompt.render(&[(DISEASE_NAME_VAR, request.disease_name())]),
        image: None,
        schema: prompts::summary_schema(),
        max_tokens: prompt.max_tokens,
    };

    let start = std::time::Instant::now();
    let generation = backend.generate(&generation_request).await?;
    log::info!("[SUMMARY] Model latency: {}ms", start.elapsed().as_millis());
    super::log_usage("SUMMARY", backend.provider(), &generation);

    let result: SummaryResult = parse::parse_json(&generation.text)?;
    let summary = result.summary.trim();
    if summary.is_empty() {
        return Err(Error::MalformedOutput("summary is empty".to_string()));
    }
    log::info!("[SUMMARY] {} chars", summary.len());
    Ok(SummaryResult {
        summary: summary.to_string(),
    })
}
