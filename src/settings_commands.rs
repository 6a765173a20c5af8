//! Settings panel Tauri commands.
//!
//! Handles:
//! - Provider configuration (get/set active provider)
//! - API key storage (OS keychain via the keyring crate)
//! - Provider connection testing
//!
//! Alert settings go through `commands::update_alert_settings` instead;
//! they belong to the view state, not the app config.

use crate::commands::DesktopState;
use crate::config;
use crate::http::{self, RetryPolicy};
use crate::llm::{self, provider::ProviderKind};

fn parse_provider(provider_id: &str) -> Result<ProviderKind, String> {
    provider_id.parse::<ProviderKind>().map_err(|e| e.to_string())
}

/// Tauri command: get provider configuration for the settings panel.
#[tauri::command]
pub fn get_provider_config(
    state: tauri::State<'_, DesktopState>,
) -> Result<serde_json::Value, String> {
    let providers = llm::provider::all_providers();
    let active = state.config().resolve_provider();
    let configured: Vec<&str> = ProviderKind::ALL
        .into_iter()
        .filter(|kind| config::is_provider_configured(*kind))
        .map(ProviderKind::id)
        .collect();

    Ok(serde_json::json!({
        "activeProvider": active,
        "providers": providers,
        "configuredProviders": configured,
    }))
}

/// Tauri command: set the active provider for this session.
#[tauri::command]
pub fn set_active_provider(
    state: tauri::State<'_, DesktopState>,
    provider_id: String,
) -> Result<(), String> {
    let kind = parse_provider(&provider_id)?;
    state.update_config(|c| c.provider = Some(kind));
    log::info!("[SETTINGS] Active provider set to: {}", kind);
    Ok(())
}

/// Tauri command: save an API key to the OS keychain and start using it.
#[tauri::command]
pub fn save_api_key(
    state: tauri::State<'_, DesktopState>,
    provider_id: String,
    api_key: String,
) -> Result<(), String> {
    let kind = parse_provider(&provider_id)?;
    config::save_api_key(kind, &api_key).map_err(|e| e.to_string())?;
    state.update_config(|_| {});
    Ok(())
}

/// Tauri command: test a provider's API connection.
///
/// Sends a minimal request and checks for a valid response.
#[tauri::command]
pub async fn test_provider(
    state: tauri::State<'_, DesktopState>,
    provider_id: String,
) -> Result<bool, String> {
    let kind = parse_provider(&provider_id)?;
    let config = state.config();
    let client = http::build_client(config.request_timeout()).map_err(|e| e.to_string())?;
    let backend = llm::backend_for(kind, &config, client, RetryPolicy::none())
        .map_err(|e| e.to_string())?;
    match llm::test_connection(backend.as_ref()).await {
        Ok(()) => Ok(true),
        Err(e) => {
            log::warn!("[SETTINGS] Test {} failed: {}", kind, e);
            Ok(false)
        }
    }
}
