//! Application configuration.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. `<config_dir>/leafguard/config.json` (every field optional)
//! 3. Environment (`LLM_PROVIDER`, `GEMINI_MODEL`, `ANTHROPIC_MODEL`,
//!    `LEAFGUARD_TIMEOUT_SECS`), usually populated from `.env.local`
//!
//! API keys never live in the config file: they come from the provider's
//! env var or the OS keychain.

use crate::llm::prompts::{PromptOverrides, PromptSet};
use crate::llm::provider::ProviderKind;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keychain service name for saved API keys.
pub const KEYRING_SERVICE: &str = "leafguard";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Per-provider endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    pub model: String,
    pub base_url: String,
}

impl ProviderSettings {
    pub fn gemini() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    pub fn anthropic() -> Self {
        Self {
            model: "claude-haiku-4-5-20251001".to_string(),
            base_url: "https://api.anthropic.com/v1".to_string(),
        }
    }
}

/// Provider block as written in the config file: either field may be left out.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProviderOverride {
    model: Option<String>,
    base_url: Option<String>,
}

impl ProviderOverride {
    fn over(self, defaults: ProviderSettings) -> ProviderSettings {
        ProviderSettings {
            model: self.model.unwrap_or(defaults.model),
            base_url: self.base_url.unwrap_or(defaults.base_url),
        }
    }
}

fn gemini_settings<'de, D: Deserializer<'de>>(d: D) -> Result<ProviderSettings, D::Error> {
    ProviderOverride::deserialize(d).map(|o| o.over(ProviderSettings::gemini()))
}

fn anthropic_settings<'de, D: Deserializer<'de>>(d: D) -> Result<ProviderSettings, D::Error> {
    ProviderOverride::deserialize(d).map(|o| o.over(ProviderSettings::anthropic()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Explicit provider choice; `None` means auto-detect from available keys.
    pub provider: Option<ProviderKind>,
    #[serde(deserialize_with = "gemini_settings")]
    pub gemini: ProviderSettings,
    #[serde(deserialize_with = "anthropic_settings")]
    pub anthropic: ProviderSettings,
    pub request_timeout_secs: u64,
    /// Extra attempts after a transient failure.
    pub max_retries: u32,
    pub prompts: PromptOverrides,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: None,
            gemini: ProviderSettings::gemini(),
            anthropic: ProviderSettings::anthropic(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            prompts: PromptOverrides::default(),
        }
    }
}

/// Default location of the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("leafguard")
        .join("config.json")
}

/// Load `.env.local` then `.env` from the working directory.
///
/// Only the first file found is loaded; variables already set in the
/// process environment win. Runs before logging is up, so the caller logs
/// the returned path.
pub fn load_env() -> Result<Option<PathBuf>> {
    load_env_in(Path::new("."))
}

/// [`load_env`] against an explicit directory.
pub fn load_env_in(dir: &Path) -> Result<Option<PathBuf>> {
    for env_file in [".env.local", ".env"] {
        let path = dir.join(env_file);
        if path.exists() {
            dotenvy::from_path(&path)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
            return Ok(Some(path));
        }
    }
    Ok(None)
}

impl AppConfig {
    /// Load from the default config path, then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_env();
        Ok(config)
    }

    /// Load from an explicit file. A missing file yields defaults; an
    /// unreadable or invalid one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("[CONFIG] No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        log::info!("[CONFIG] Loaded {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        if let Ok(p) = std::env::var("LLM_PROVIDER") {
            match p.parse::<ProviderKind>() {
                Ok(kind) => {
                    log::info!("[CONFIG] Provider override: {}", kind);
                    self.provider = Some(kind);
                }
                Err(e) => log::warn!("[CONFIG] Ignoring LLM_PROVIDER: {}", e),
            }
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.is_empty() {
                self.gemini.model = model;
            }
        }
        if let Ok(model) = std::env::var("ANTHROPIC_MODEL") {
            if !model.is_empty() {
                self.anthropic.model = model;
            }
        }
        if let Ok(secs) = std::env::var("LEAFGUARD_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => log::warn!("[CONFIG] Ignoring LEAFGUARD_TIMEOUT_SECS={:?}", secs),
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn provider_settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Anthropic => &self.anthropic,
        }
    }

    pub fn prompt_set(&self) -> Result<PromptSet> {
        PromptSet::with_overrides(&self.prompts)
    }

    /// Determine which provider to use.
    ///
    /// Priority:
    /// 1. Explicit choice (config file or `LLM_PROVIDER`)
    /// 2. First provider with an API key (env var or keychain)
    /// 3. Gemini as final default (calls will fail with `MissingApiKey`)
    pub fn resolve_provider(&self) -> ProviderKind {
        if let Some(kind) = self.provider {
            return kind;
        }
        ProviderKind::ALL
            .into_iter()
            .find(|kind| api_key(*kind).is_some())
            .unwrap_or(ProviderKind::Gemini)
    }
}

/// Look up a provider's API key: env var first, then the OS keychain.
pub fn api_key(kind: ProviderKind) -> Option<String> {
    if let Ok(key) = std::env::var(kind.env_key()) {
        if !key.is_empty() {
            return Some(key);
        }
    }

    let entry = keyring::Entry::new(KEYRING_SERVICE, kind.id()).ok()?;
    match entry.get_password() {
        Ok(key) if !key.is_empty() => {
            log::info!("[SETTINGS] Loaded {} key from OS keychain", kind);
            Some(key)
        }
        _ => None,
    }
}

/// Like [`api_key`], but a missing key is an error.
pub fn require_api_key(kind: ProviderKind) -> Result<String> {
    api_key(kind).ok_or(Error::MissingApiKey {
        provider: kind.id(),
        env_key: kind.env_key(),
    })
}

/// Check if a provider has an API key configured.
pub fn is_provider_configured(kind: ProviderKind) -> bool {
    api_key(kind).is_some()
}

/// Save an API key to the OS keychain.
pub fn save_api_key(kind: ProviderKind, key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidRequest("API key is empty".to_string()));
    }
    let entry = keyring::Entry::new(KEYRING_SERVICE, kind.id())?;
    entry.set_password(key.trim())?;
    log::info!("[SETTINGS] API key saved for provider: {}", kind);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("leafguard-config-test-{}.json", name));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("leafguard-config-test-does-not-exist.json");
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_config(
            "partial",
            r#"{ "provider": "anthropic", "requestTimeoutSecs": 5, "gemini": { "model": "gemini-2.5-flash", "baseUrl": "http://localhost:9" } }"#,
        );
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.provider, Some(ProviderKind::Anthropic));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.anthropic, ProviderSettings::anthropic());
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn provider_block_with_only_model_keeps_default_url() {
        let path = temp_config(
            "model-only",
            r#"{ "gemini": { "model": "gemini-2.5-flash" }, "maxRetries": 3 }"#,
        );
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.base_url, ProviderSettings::gemini().base_url);
        assert_eq!(config.anthropic, ProviderSettings::anthropic());
        assert_eq!(config.max_retries, 3);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn empty_provider_block_is_all_defaults() {
        let path = temp_config("empty-anthropic", r#"{ "anthropic": {} }"#);
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.anthropic, ProviderSettings::anthropic());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn env_file_is_found_and_reported() {
        let dir = std::env::temp_dir().join("leafguard-env-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".env.local");
        std::fs::write(&path, "LEAFGUARD_ENV_TEST_MARKER=loaded\n").unwrap();

        let loaded = load_env_in(&dir).unwrap();

        assert_eq!(loaded, Some(path.clone()));
        assert_eq!(std::env::var("LEAFGUARD_ENV_TEST_MARKER").unwrap(), "loaded");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn no_env_file_loads_nothing() {
        let dir = std::env::temp_dir().join("leafguard-env-test-empty");
        std::fs::create_dir_all(&dir).unwrap();
        assert_eq!(load_env_in(&dir).unwrap(), None);
    }

    #[test]
    fn invalid_file_is_config_error() {
        let path = temp_config("invalid", "{ not json");
        assert!(matches!(AppConfig::load_from(&path), Err(Error::Config(_))));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn explicit_provider_wins() {
        let config = AppConfig {
            provider: Some(ProviderKind::Anthropic),
            ..Default::default()
        };
        assert_eq!(config.resolve_provider(), ProviderKind::Anthropic);
    }
}
