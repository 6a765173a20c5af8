//! Request and response value objects for the two model calls.
//!
//! The wire shapes match the output schemas in `prompts.rs`. A
//! [`DetectionResult`] can only be built through validation, so a value
//! that exists always satisfies: no disease ⇔ no name and no confidence.

use crate::image_input::ImageReference;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Input to the DETECT call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRequest {
    #[serde(rename = "photoUrl")]
    pub image: ImageReference,
}

impl DetectionRequest {
    pub fn new(image: ImageReference) -> Self {
        Self { image }
    }
}

/// A disease the model reported, with its confidence in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedDisease {
    pub name: String,
    pub confidence: f64,
}

/// Validated DETECT output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawDetection", try_from = "RawDetection")]
pub struct DetectionResult {
    disease: Option<DetectedDisease>,
}

impl DetectionResult {
    pub fn healthy() -> Self {
        Self { disease: None }
    }

    pub fn diseased(name: impl Into<String>, confidence: f64) -> Result<Self> {
        RawDetection {
            disease_detected: true,
            disease_name: Some(name.into()),
            confidence_level: Some(confidence),
        }
        .try_into()
    }

    pub fn disease_detected(&self) -> bool {
        self.disease.is_some()
    }

    pub fn disease_name(&self) -> Option<&str> {
        self.disease.as_ref().map(|d| d.name.as_str())
    }

    pub fn confidence_level(&self) -> Option<f64> {
        self.disease.as_ref().map(|d| d.confidence)
    }

    pub fn disease(&self) -> Option<&DetectedDisease> {
        self.disease.as_ref()
    }

    pub fn into_disease(self) -> Option<DetectedDisease> {
        self.disease
    }
}

/// DETECT output exactly as the model returns it, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDetection {
    pub disease_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,
}

impl TryFrom<RawDetection> for DetectionResult {
    type Error = Error;

    /// Malformed output is rejected, never coerced into "healthy".
    fn try_from(raw: RawDetection) -> Result<Self> {
        let name = raw
            .disease_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        match (raw.disease_detected, name, raw.confidence_level) {
            (false, None, None) => Ok(Self::healthy()),
            (true, Some(name), Some(confidence)) => {
                if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
                    return Err(Error::MalformedOutput(format!(
                        "confidenceLevel {} is outside [0, 1]",
                        confidence
                    )));
                }
                Ok(Self {
                    disease: Some(DetectedDisease { name, confidence }),
                })
            }
            (true, name, confidence) => Err(Error::MalformedOutput(format!(
                "diseaseDetected is true but diseaseName={:?} confidenceLevel={:?}",
                name, confidence
            ))),
            (false, name, confidence) => Err(Error::MalformedOutput(format!(
                "diseaseDetected is false but diseaseName={:?} confidenceLevel={:?}",
                name, confidence
            ))),
        }
    }
}

impl From<DetectionResult> for RawDetection {
    fn from(result: DetectionResult) -> Self {
        match result.disease {
            Some(d) => RawDetection {
                disease_detected: true,
                disease_name: Some(d.name),
                confidence_level: Some(d.confidence),
            },
            None => RawDetection {
                disease_detected: false,
                disease_name: None,
                confidence_level: None,
            },
        }
    }
}

/// Input to the SUMMARIZE call. The name is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    disease_name: String,
}

impl SummaryRequest {
    pub fn new(disease_name: impl Into<String>) -> Result<Self> {
        let disease_name = disease_name.into();
        if disease_name.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "disease name must not be empty".to_string(),
            ));
        }
        Ok(Self { disease_name })
    }

    pub fn disease_name(&self) -> &str {
        &self.disease_name
    }
}

/// SUMMARIZE output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
}
