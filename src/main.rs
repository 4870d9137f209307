use r_playbot::config::Settings;
use r_playbot::coordinator::Coordinator;
use r_playbot::engine::MpvEngine;
use r_playbot::init_app_dirs;
use r_playbot::provider::YtDlpProvider;
use r_playbot::transport::console::CONSOLE_USER;
use r_playbot::transport::ConsoleTransport;
use r_playbot::ui::Cli;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const LOG_TARGET: &str = "r_playbot::main";
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::new();
    let args = &cli.args;

    // RUST_LOG wins over --log-level when both are given
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = args.config_path();
    let mut settings = match Settings::load(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            cli.display_error(&e);
            return Err(e.into());
        }
    };
    args.apply(&mut settings);
    settings.validate()?;
    init_app_dirs(&settings)?;
    info!(target: LOG_TARGET, "Loaded settings from {}", config_path.display());

    let socket_path = std::env::temp_dir().join(format!("r-playbot-{}.sock", std::process::id()));
    let engine = MpvEngine::spawn(&settings.mpv_path, &socket_path, settings.default_volume).await?;
    let provider = YtDlpProvider::new(settings.ytdlp_path.clone(), settings.search_result_limit)
        .with_cookie_file(settings.cookie_file.clone());
    let transport = ConsoleTransport::new(args.nickname.clone(), settings.share_dir.clone());

    cli.display_banner(&settings);
    let coordinator = Coordinator::new(Arc::new(engine), Arc::new(provider), Arc::new(transport), settings);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => coordinator.handle_text(CONSOLE_USER, &line).await,
                Ok(None) => {
                    info!(target: LOG_TARGET, "Input closed.");
                    break;
                }
                Err(e) => {
                    error!(target: LOG_TARGET, "Failed to read input: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!(target: LOG_TARGET, "Interrupted.");
                break;
            }
        }
    }

    coordinator.shutdown(SHUTDOWN_TIMEOUT).await;
    Ok(())
}
