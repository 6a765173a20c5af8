//! LeafGuard: plant-leaf disease detection.
//!
//! A leaf photo goes to a hosted vision model (DETECT); if a disease comes
//! back, its name goes to the same model for a symptoms-and-treatment
//! write-up (SUMMARIZE). The controller in `pipeline.rs` sequences the two
//! calls and owns the view state the frontends render.
//!
//! Modules:
//!   - llm/: providers, prompts, request/response types
//!   - pipeline.rs: detection controller (state machine)
//!   - state.rs: view state + banner rendering
//!   - image_input.rs: data URLs, remote URLs, file bytes
//!   - config.rs: config file, env overrides, API keys
//!   - http.rs: shared client, timeout, retry
//!   - commands.rs / settings_commands.rs: desktop shell (feature `desktop`)

pub mod config;
pub mod error;
pub mod http;
pub mod image_input;
pub mod llm;
pub mod pipeline;
pub mod state;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
mod settings_commands;

pub use error::{Error, Result};

use config::AppConfig;
use llm::{DiseaseService, Inference, Unconfigured};
use pipeline::DetectionPipeline;
use std::sync::Arc;

/// Initialise `env_logger`; `RUST_LOG` overrides the default `info` level.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Inference service for `config`, or a stand-in that reports why none
/// could be built (typically a missing API key).
pub fn build_service(config: &AppConfig) -> Arc<dyn DiseaseService> {
    match Inference::from_config(config) {
        Ok(inference) => Arc::new(inference),
        Err(e) => {
            log::warn!("[STARTUP] Inference unavailable: {}", e);
            Arc::new(Unconfigured::new(&e))
        }
    }
}

pub fn build_pipeline(config: &AppConfig) -> DetectionPipeline {
    DetectionPipeline::new(build_service(config))
}

/// Desktop entry point, called by `leafguard gui`.
#[cfg(feature = "desktop")]
pub fn run() {
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::error!("[STARTUP] {}, falling back to defaults", e);
        AppConfig::default()
    });
    let pipeline = build_pipeline(&config);

    let result = tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .manage(commands::DesktopState::new(pipeline, config))
        .invoke_handler(tauri::generate_handler![
            // Detector commands (commands.rs)
            commands::pick_image,
            commands::load_image_data,
            commands::detect_disease,
            commands::get_view,
            commands::update_alert_settings,
            // Settings commands (settings_commands.rs)
            settings_commands::get_provider_config,
            settings_commands::set_active_provider,
            settings_commands::save_api_key,
            settings_commands::test_provider,
        ])
        .setup(|_app| {
            log::info!("LeafGuard starting up");
            Ok(())
        })
        .run(tauri::generate_context!());

    if let Err(e) = result {
        log::error!("Error running LeafGuard: {}", e);
    }
}
