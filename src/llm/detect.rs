//! DETECT call: leaf image in, validated [`DetectionResult`] out.
//!
//! Errors are never turned into a default result: a failed or malformed
//! call means "nothing was detected", not "the plant is healthy".

use super::parse;
use super::prompts::{self, PromptTemplate};
use super::types::{DetectionResult, RawDetection};
use super::{GenerationRequest, ModelBackend};
use crate::image_input::InlineImage;
use crate::Result;

pub async fn detect_disease(
    backend: &dyn ModelBackend,
    prompt: &PromptTemplate,
    image: &InlineImage,
) -> Result<DetectionResult> {
    let (w, h) = image.dimensions();
    log::info!(
        "[DETECT] Provider: {}, model: {}, image: {} {}x{}",
        backend.provider(),
        backend.model(),
        image.mime_type(),
        w,
        h
    );

    let request = GenerationRequest {
        tag: "DETECT",
        system: prompt.system.clone(),
        text: prompt.render(&[]),
        image: Some(image.clone()),
        schema: prompts::detection_schema(),
        max_tokens: prompt.max_tokens,
    };

    let start = std::time::Instant::now();
    let generation = backend.generate(&request).await?;
    log::info!("[DETECT] Model latency: {}ms", start.elapsed().as_millis());
    super::log_usage("DETECT", backend.provider(), &generation);

    let raw: RawDetection = parse::parse_json(&generation.text)?;
    let result = DetectionResult::try_from(raw).map_err(|e| {
        log::warn!("[DETECT] Rejected model output: {}", e);
        e
    })?;

    match result.disease() {
        Some(d) => log::info!(
            "[DETECT] Disease detected: {} ({:.2})",
            d.name,
            d.confidence
        ),
        None => log::info!("[DETECT] No disease detected"),
    }
    Ok(result)
}
