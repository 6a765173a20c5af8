//! LeafGuard CLI.
//!
//! Usage:
//!   leafguard detect <image>            Path, http(s) URL, or data URL
//!   leafguard detect <image> --json     Machine-readable result
//!   leafguard summarize "<disease>"     Summary only
//!   leafguard providers                 Known providers + key status
//!   leafguard check                     Test the active provider
//!   leafguard save-key <provider> <key> Store an API key in the OS keychain
//!   leafguard gui                       Desktop window (feature `desktop`)

use clap::{Parser, Subcommand};
use leafguard_lib::config::{self, AppConfig};
use leafguard_lib::image_input::ImageReference;
use leafguard_lib::llm::provider::{self, ProviderKind};
use leafguard_lib::llm::{self, DiseaseService, Inference, SummaryRequest};
use leafguard_lib::pipeline::DetectionPipeline;
use leafguard_lib::state::{Banner, ViewModel};
use leafguard_lib::Result;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "leafguard", version, about = "Detect plant-leaf diseases with a hosted vision model")]
struct Cli {
    /// Provider to use for this run (overrides config and LLM_PROVIDER).
    #[arg(long, global = true)]
    provider: Option<ProviderKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Detect disease in a leaf photo, then summarize it.
    Detect {
        /// Image path, http(s) URL, or data URL.
        image: String,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Summarize symptoms and treatments for a named disease.
    Summarize { disease_name: String },
    /// List providers and whether an API key is configured.
    Providers,
    /// Send a minimal request to the active provider.
    Check,
    /// Save an API key to the OS keychain.
    SaveKey {
        #[arg(value_name = "PROVIDER")]
        provider_id: ProviderKind,
        api_key: String,
    },
    /// Open the desktop window.
    #[cfg(feature = "desktop")]
    Gui,
}

fn main() -> ExitCode {
    // Before logging so RUST_LOG from .env.local applies.
    let env_file = config::load_env();
    leafguard_lib::init_logging();
    match env_file {
        Ok(Some(path)) => log::info!("[STARTUP] Loaded {}", path.display()),
        Ok(None) => log::debug!("[STARTUP] No .env.local or .env found"),
        Err(e) => log::warn!("[STARTUP] {}", e),
    }
    let cli = Cli::parse();

    if launch_gui(&cli.command) {
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(dispatch(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "desktop")]
fn launch_gui(command: &Command) -> bool {
    if matches!(command, Command::Gui) {
        leafguard_lib::run();
        return true;
    }
    false
}

#[cfg(not(feature = "desktop"))]
fn launch_gui(_command: &Command) -> bool {
    false
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let mut config = AppConfig::load()?;
    if let Some(kind) = cli.provider {
        config.provider = Some(kind);
    }

    match cli.command {
        Command::Detect { image, json } => detect(&config, &image, json).await,
        Command::Summarize { disease_name } => {
            let inference = Inference::from_config(&config)?;
            let request = SummaryRequest::new(disease_name)?;
            let result = inference.summarize_disease_info(&request).await?;
            println!("{}", result.summary);
            Ok(ExitCode::SUCCESS)
        }
        Command::Providers => {
            let active = config.resolve_provider();
            for info in provider::all_providers() {
                let kind: ProviderKind = info.id.parse()?;
                println!(
                    "{} {:<10} {:<45} key: {}",
                    if kind == active { "*" } else { " " },
                    info.id,
                    info.name,
                    if config::is_provider_configured(kind) {
                        "configured"
                    } else {
                        "missing"
                    }
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => {
            let inference = Inference::from_config(&config)?;
            llm::test_connection(inference.backend()).await?;
            println!(
                "{} ({}) ok",
                inference.backend().provider(),
                inference.backend().model()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::SaveKey {
            provider_id,
            api_key,
        } => {
            config::save_api_key(provider_id, &api_key)?;
            println!("Saved {} key to the OS keychain", provider_id);
            Ok(ExitCode::SUCCESS)
        }
        #[cfg(feature = "desktop")]
        Command::Gui => Ok(ExitCode::SUCCESS),
    }
}

async fn detect(config: &AppConfig, image: &str, json: bool) -> Result<ExitCode> {
    let image = ImageReference::from_arg(image).await?;
    let pipeline = DetectionPipeline::new(Arc::new(Inference::from_config(config)?));
    pipeline.select_image(image);
    let view = pipeline.detect().await;

    if json {
        let out = serde_json::json!({
            "phase": view.state.phase,
            "detection": view.state.detection,
            "summary": view.state.summary,
            "notice": view.state.notice,
        });
        println!("{}", serde_json::to_string_pretty(&out).unwrap_or_else(|_| out.to_string()));
    } else {
        print_view(&view);
    }

    Ok(if view.state.notice.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_view(view: &ViewModel) {
    if let Some(notice) = &view.state.notice {
        eprintln!("{}", notice.message());
    }
    match &view.banner {
        Some(Banner::DiseaseFound { title, text, summary }) => {
            println!("{}\n{}", title, text);
            if let Some(summary) = summary {
                println!("\n{}", summary);
            }
        }
        Some(Banner::NoDisease { title, text }) => println!("{}\n{}", title, text),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_key_provider_does_not_override_global_flag() {
        let cli = Cli::try_parse_from([
            "leafguard",
            "--provider",
            "gemini",
            "save-key",
            "anthropic",
            "sk-test",
        ])
        .unwrap();
        assert_eq!(cli.provider, Some(ProviderKind::Gemini));
        match cli.command {
            Command::SaveKey {
                provider_id,
                api_key,
            } => {
                assert_eq!(provider_id, ProviderKind::Anthropic);
                assert_eq!(api_key, "sk-test");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn save_key_alone_leaves_provider_unset() {
        let cli = Cli::try_parse_from(["leafguard", "save-key", "gemini", "k"]).unwrap();
        assert_eq!(cli.provider, None);
    }

    #[test]
    fn detect_takes_json_flag() {
        let cli = Cli::try_parse_from(["leafguard", "detect", "leaf.png", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Detect { ref image, json: true } if image == "leaf.png"
        ));
    }
}
