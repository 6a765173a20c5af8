//! View state for the single-page detector.
//!
//! Only the controller in `pipeline.rs` mutates [`UiState`]; everything
//! here is plain data plus the pure rendering of that data into banners
//! and button labels.

use crate::image_input::ImageReference;
use crate::llm::DetectedDisease;
use serde::{Deserialize, Serialize};

pub const NO_IMAGE_PROMPT: &str = "Please upload an image first.";
pub const FAILURE_NOTICE: &str = "Disease detection failed. Please try again.";
pub const DETECT_LABEL: &str = "Detect Disease";
pub const DETECTING_LABEL: &str = "Detecting...";

/// Where the controller is in the upload → detect → summarize cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// No image selected.
    #[default]
    Idle,
    ImageSelected,
    /// DETECT in flight.
    Detecting,
    /// Disease found, SUMMARIZE in flight.
    DetectingSummary,
    ResultReady,
}

/// A user-visible message that is not a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum Notice {
    /// Detect was pressed with nothing to analyze.
    ImageRequired(String),
    /// One of the two model calls failed.
    Failure(String),
}

impl Notice {
    pub fn image_required() -> Self {
        Notice::ImageRequired(NO_IMAGE_PROMPT.to_string())
    }

    pub fn failure() -> Self {
        Notice::Failure(FAILURE_NOTICE.to_string())
    }

    pub fn message(&self) -> &str {
        match self {
            Notice::ImageRequired(m) | Notice::Failure(m) => m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertFrequency {
    Immediately,
    #[default]
    Daily,
    Weekly,
}

/// Settings-panel values. Stored and observed, never delivered anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSettings {
    pub notifications_enabled: bool,
    pub frequency: AlertFrequency,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            frequency: AlertFrequency::Daily,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub phase: Phase,
    pub image_reference: Option<ImageReference>,
    pub detection: Option<DetectedDisease>,
    pub summary: Option<String>,
    pub loading: bool,
    pub notice: Option<Notice>,
    pub alert_settings: AlertSettings,
}

impl UiState {
    /// Drop any detection output and notice.
    pub(crate) fn clear_results(&mut self) {
        self.detection = None;
        self.summary = None;
        self.notice = None;
    }
}

/// The result banner under the upload card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Banner {
    DiseaseFound {
        title: String,
        text: String,
        summary: Option<String>,
    },
    NoDisease {
        title: String,
        text: String,
    },
}

/// Everything the frontend needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub state: UiState,
    pub banner: Option<Banner>,
    pub detect_label: String,
    pub detect_enabled: bool,
}

impl From<UiState> for ViewModel {
    fn from(state: UiState) -> Self {
        let banner = render_banner(&state);
        let (detect_label, detect_enabled) = if state.loading {
            (DETECTING_LABEL, false)
        } else {
            (DETECT_LABEL, true)
        };
        Self {
            state,
            banner,
            detect_label: detect_label.to_string(),
            detect_enabled,
        }
    }
}

/// Confidence in [0, 1] as a percentage with two decimals: 0.8732 → "87.32%".
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}%", confidence * 100.0)
}

/// Banner for the current state, if any.
///
/// "No disease" is only shown once a detection has actually finished;
/// a freshly selected image shows nothing.
pub fn render_banner(state: &UiState) -> Option<Banner> {
    if let Some(disease) = &state.detection {
        return Some(Banner::DiseaseFound {
            title: "Disease Detected!".to_string(),
            text: format!(
                "Detected disease: {} with confidence: {}",
                disease.name,
                format_confidence(disease.confidence)
            ),
            summary: state.summary.clone(),
        });
    }
    if state.phase == Phase::ResultReady {
        return Some(Banner::NoDisease {
            title: "No Disease Detected".to_string(),
            text: "The AI model did not detect any disease in the uploaded image. \
                   The plant appears to be healthy."
                .to_string(),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_has_two_decimals() {
        assert_eq!(format_confidence(0.8732), "87.32%");
        assert_eq!(format_confidence(0.87), "87.00%");
        assert_eq!(format_confidence(1.0), "100.00%");
        assert_eq!(format_confidence(0.0), "0.00%");
    }

    #[test]
    fn idle_has_no_banner() {
        let view = ViewModel::from(UiState::default());
        assert_eq!(view.banner, None);
        assert_eq!(view.detect_label, DETECT_LABEL);
        assert!(view.detect_enabled);
    }

    #[test]
    fn loading_disables_button() {
        let state = UiState {
            phase: Phase::Detecting,
            loading: true,
            ..Default::default()
        };
        let view = ViewModel::from(state);
        assert_eq!(view.detect_label, DETECTING_LABEL);
        assert!(!view.detect_enabled);
    }

    #[test]
    fn found_banner_includes_summary() {
        let state = UiState {
            phase: Phase::ResultReady,
            detection: Some(DetectedDisease {
                name: "Leaf Blight".to_string(),
                confidence: 0.8732,
            }),
            summary: Some("Brown lesions; remove infected leaves.".to_string()),
            ..Default::default()
        };
        match render_banner(&state) {
            Some(Banner::DiseaseFound { title, text, summary }) => {
                assert_eq!(title, "Disease Detected!");
                assert_eq!(text, "Detected disease: Leaf Blight with confidence: 87.32%");
                assert_eq!(summary.as_deref(), Some("Brown lesions; remove infected leaves."));
            }
            other => panic!("unexpected banner: {:?}", other),
        }
    }

    #[test]
    fn healthy_result_banner() {
        let state = UiState {
            phase: Phase::ResultReady,
            ..Default::default()
        };
        assert!(matches!(render_banner(&state), Some(Banner::NoDisease { .. })));
    }

    #[test]
    fn alert_settings_wire_shape() {
        let json = serde_json::to_value(AlertSettings::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"notificationsEnabled": true, "frequency": "daily"})
        );
    }
}
