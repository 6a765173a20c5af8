//! Detection controller: the upload → detect → summarize state machine.
//!
//! - select_image: store the new image, clear any previous result
//! - detect: DETECT → (disease found) SUMMARIZE → result banner
//! - update_alert_settings: store settings, notify observers
//!
//! The view state lives behind a std `Mutex` that is never held across an
//! await. Each detect flow carries a ticket; a newer upload or detect bumps
//! the counter and any older flow's results are dropped on arrival.

use crate::image_input::ImageReference;
use crate::llm::{DetectedDisease, DetectionRequest, DiseaseService, SummaryRequest};
use crate::state::{AlertSettings, Notice, Phase, UiState, ViewModel};
use crate::Error;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Hook invoked whenever the alert settings change.
///
/// LeafGuard ships no notification delivery; this is where one would plug in.
pub trait SettingsObserver: Send + Sync {
    fn on_alert_settings_changed(&self, settings: &AlertSettings);
}

struct Inner {
    ui: UiState,
    /// Bumped by every upload and every started detect flow.
    ticket: u64,
}

pub struct DetectionPipeline {
    service: RwLock<Arc<dyn DiseaseService>>,
    inner: Mutex<Inner>,
    observers: RwLock<Vec<Arc<dyn SettingsObserver>>>,
}

impl DetectionPipeline {
    pub fn new(service: Arc<dyn DiseaseService>) -> Self {
        Self {
            service: RwLock::new(service),
            inner: Mutex::new(Inner {
                ui: UiState::default(),
                ticket: 0,
            }),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Swap the inference service (e.g. after an API key is saved).
    pub fn set_service(&self, service: Arc<dyn DiseaseService>) {
        *self.service.write().unwrap_or_else(PoisonError::into_inner) = service;
    }

    pub fn add_observer(&self, observer: Arc<dyn SettingsObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub fn state(&self) -> UiState {
        self.lock().ui.clone()
    }

    pub fn view(&self) -> ViewModel {
        ViewModel::from(self.state())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn service(&self) -> Arc<dyn DiseaseService> {
        self.service
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Upload action: new image, previous detection and summary cleared.
    pub fn select_image(&self, image: ImageReference) -> ViewModel {
        let mut inner = self.lock();
        if inner.ui.loading {
            log::info!("[PIPELINE] New image supersedes the in-flight detection");
        }
        inner.ticket += 1;
        inner.ui.image_reference = Some(image);
        inner.ui.clear_results();
        inner.ui.loading = false;
        inner.ui.phase = Phase::ImageSelected;
        ViewModel::from(inner.ui.clone())
    }

    /// Detect action. Always returns the resulting view; failures become a
    /// notice in the view rather than an error.
    pub async fn detect(&self) -> ViewModel {
        let Some((ticket, image)) = self.begin_detect() else {
            return self.view();
        };
        let pipeline_start = std::time::Instant::now();
        let service = self.service();

        // Stage 1: DETECT
        let detection = match service.detect_disease(&DetectionRequest::new(image)).await {
            Ok(detection) => detection,
            Err(e) => return self.fail(ticket, "DETECT", &e),
        };

        let Some(disease) = detection.into_disease() else {
            log::info!(
                "[PIPELINE] Healthy leaf, total {}ms",
                pipeline_start.elapsed().as_millis()
            );
            return self.finish(ticket, None, None);
        };

        // Stage 2: SUMMARIZE, with the disease already visible
        let summary_request = match SummaryRequest::new(disease.name.clone()) {
            Ok(request) => request,
            Err(e) => return self.fail(ticket, "SUMMARY", &e),
        };
        let still_current = self.apply_if_current(ticket, |ui| {
            ui.phase = Phase::DetectingSummary;
            ui.detection = Some(disease.clone());
        });
        if !still_current {
            return self.view();
        }

        match service.summarize_disease_info(&summary_request).await {
            Ok(summary) => {
                log::info!(
                    "[PIPELINE] Disease + summary, total {}ms",
                    pipeline_start.elapsed().as_millis()
                );
                self.finish(ticket, Some(disease), Some(summary.summary))
            }
            Err(e) => self.fail(ticket, "SUMMARY", &e),
        }
    }

    /// Guard + transition into `Detecting`. `None` when the action is refused.
    fn begin_detect(&self) -> Option<(u64, ImageReference)> {
        let mut inner = self.lock();
        if inner.ui.loading {
            log::warn!("[PIPELINE] Detect ignored, a detection is already running");
            return None;
        }
        let Some(image) = inner.ui.image_reference.clone() else {
            log::info!("[PIPELINE] Detect without an image, prompting for upload");
            inner.ui.notice = Some(Notice::image_required());
            return None;
        };
        inner.ticket += 1;
        inner.ui.clear_results();
        inner.ui.loading = true;
        inner.ui.phase = Phase::Detecting;
        Some((inner.ticket, image))
    }

    /// Run `f` on the state if `ticket` is still the latest flow.
    fn apply_if_current(&self, ticket: u64, f: impl FnOnce(&mut UiState)) -> bool {
        let mut inner = self.lock();
        if inner.ticket != ticket {
            log::debug!("[PIPELINE] Dropping result of superseded detection #{}", ticket);
            return false;
        }
        f(&mut inner.ui);
        true
    }

    fn finish(
        &self,
        ticket: u64,
        detection: Option<DetectedDisease>,
        summary: Option<String>,
    ) -> ViewModel {
        self.apply_if_current(ticket, |ui| {
            ui.detection = detection;
            ui.summary = summary;
            ui.notice = None;
            ui.loading = false;
            ui.phase = Phase::ResultReady;
        });
        self.view()
    }

    fn fail(&self, ticket: u64, stage: &str, error: &Error) -> ViewModel {
        if error.is_external() {
            log::warn!("[PIPELINE] {} failed at the service: {}", stage, error);
        } else {
            log::error!("[PIPELINE] {} failed: {}", stage, error);
        }
        self.apply_if_current(ticket, |ui| {
            ui.clear_results();
            ui.notice = Some(Notice::failure());
            ui.loading = false;
            ui.phase = Phase::ImageSelected;
        });
        self.view()
    }

    /// Settings panel change. Local state only, plus observer callbacks.
    pub fn update_alert_settings(&self, settings: AlertSettings) -> ViewModel {
        let view = {
            let mut inner = self.lock();
            inner.ui.alert_settings = settings.clone();
            ViewModel::from(inner.ui.clone())
        };
        log::info!("[SETTINGS] Alert settings updated: {:?}", settings);
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_alert_settings_changed(&settings);
        }
        view
    }
}
