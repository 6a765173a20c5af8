//! Detector Tauri commands.
//!
//! Thin wrappers that bridge frontend invoke() calls to the controller.
//! Each returns the fresh `ViewModel` so the page re-renders from one value.

use crate::config::AppConfig;
use crate::image_input::ImageReference;
use crate::pipeline::DetectionPipeline;
use crate::state::{AlertSettings, ViewModel};
use std::sync::{PoisonError, RwLock};
use tauri_plugin_dialog::DialogExt;

/// Managed state shared by all desktop commands.
pub struct DesktopState {
    pub pipeline: DetectionPipeline,
    pub config: RwLock<AppConfig>,
}

impl DesktopState {
    pub fn new(pipeline: DetectionPipeline, config: AppConfig) -> Self {
        Self {
            pipeline,
            config: RwLock::new(config),
        }
    }

    pub fn config(&self) -> AppConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mutate the config and rebuild the inference service from it.
    pub fn update_config(&self, f: impl FnOnce(&mut AppConfig)) {
        let config = {
            let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard);
            guard.clone()
        };
        self.pipeline.set_service(crate::build_service(&config));
    }
}

/// Tauri command: open the native file picker and load the chosen image.
///
/// Cancelling the picker leaves the current state untouched.
#[tauri::command]
pub async fn pick_image(
    app: tauri::AppHandle,
    state: tauri::State<'_, DesktopState>,
) -> Result<ViewModel, String> {
    let picked = app
        .dialog()
        .file()
        .add_filter("Images", &["png", "jpg", "jpeg", "webp", "gif"])
        .blocking_pick_file();
    let Some(file) = picked else {
        return Ok(state.pipeline.view());
    };
    let path = file.into_path().map_err(|e| e.to_string())?;
    let image = ImageReference::from_path(&path)
        .await
        .map_err(|e| e.to_string())?;
    Ok(state.pipeline.select_image(image))
}

/// Tauri command: load an image the page already read (file input or
/// drag-and-drop), passed as a data URL, or a remote image URL.
#[tauri::command]
pub fn load_image_data(
    state: tauri::State<'_, DesktopState>,
    image: String,
) -> Result<ViewModel, String> {
    let image = ImageReference::parse(&image).map_err(|e| e.to_string())?;
    Ok(state.pipeline.select_image(image))
}

/// Tauri command: run the detect flow for the selected image.
#[tauri::command]
pub async fn detect_disease(state: tauri::State<'_, DesktopState>) -> Result<ViewModel, String> {
    Ok(state.pipeline.detect().await)
}

/// Tauri command: current view, used by the page on load.
#[tauri::command]
pub fn get_view(state: tauri::State<'_, DesktopState>) -> ViewModel {
    state.pipeline.view()
}

/// Tauri command: store alert settings from the settings panel.
#[tauri::command]
pub fn update_alert_settings(
    state: tauri::State<'_, DesktopState>,
    settings: AlertSettings,
) -> ViewModel {
    state.pipeline.update_alert_settings(settings)
}
