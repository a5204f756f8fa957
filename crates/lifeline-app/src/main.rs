mod cli;
mod console;
mod devices;
mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use lifeline_common::LifelineError;
use lifeline_config::LifelineConfig;
use lifeline_session::{
    AudioSource, Devices, HelperSession, LaunchContext, PositionSource, WsConnector,
};
use tracing_subscriber::EnvFilter;

use crate::devices::{FileAudio, FixedPosition, NoAudio, NoPosition};

fn init_logging(directives: &[String]) {
    let mut filter = EnvFilter::from_default_env();
    for directive in directives {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("Ignoring log directive {directive:?}: {e}"),
        }
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn devices(args: &cli::Args) -> Devices {
    let position: Arc<dyn PositionSource> = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => Arc::new(FixedPosition::new(lat, lng)),
        _ => Arc::new(NoPosition),
    };
    let audio: Arc<dyn AudioSource> = match &args.audio_file {
        Some(path) => Arc::new(FileAudio::new(path)),
        None => Arc::new(NoAudio),
    };
    Devices { position, audio }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    // Load config before logging so its level applies; report failures after.
    let loaded = match &args.config {
        Some(path) => lifeline_config::load_config_from(path),
        None => lifeline_config::load_config(),
    };
    let (config, config_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (LifelineConfig::default(), Some(e)),
    };

    init_logging(&settings::log_directives(args.log_level.as_deref(), &config));
    tracing::info!("Lifeline v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(e) = config_error {
        tracing::warn!("Config load failed, using defaults: {e}");
    }

    match run(&args, &config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(LifelineError::Session(msg)) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("Console error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &cli::Args, config: &LifelineConfig) -> lifeline_common::Result<()> {
    let relay_url = args.relay.clone().unwrap_or_else(|| config.relay.url.clone());
    tracing::info!(relay = %relay_url, "Relay selected");

    let launch = LaunchContext {
        code: args.code.clone(),
        room: args.room.clone(),
    };
    let mut session = HelperSession::start(
        &launch,
        settings::session_config(config),
        devices(args),
        Arc::new(WsConnector::new(relay_url)),
    )
    .await?;

    let result = console::run(&session, config.audio.interaction).await;
    session.teardown();
    result
}
