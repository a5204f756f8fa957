use std::path::PathBuf;

use clap::Parser;

/// Lifeline helper: join a room and stay reachable for its owner.
#[derive(Parser, Debug)]
#[command(name = "lifeline", version, about)]
pub struct Args {
    /// Scanned pairing code, e.g. https://lifeline.app/help?room=ABC123
    #[arg(long)]
    pub code: Option<String>,

    /// Room token. Overrides --code and LIFELINE_ROOM.
    #[arg(long, env = "LIFELINE_ROOM")]
    pub room: Option<String>,

    /// Relay WebSocket URL override.
    #[arg(long)]
    pub relay: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter directive override (e.g. debug, lifeline_session=trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Raw audio file streamed as the microphone.
    #[arg(long)]
    pub audio_file: Option<PathBuf>,

    /// Fixed latitude reported as this device's position.
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Fixed longitude reported as this device's position.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,
}

pub fn parse() -> Args {
    Args::parse()
}
