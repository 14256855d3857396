use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "moodviz",
    version,
    about = "Mood-reactive bar visualizer and playback HUD for the listening dashboard backend"
)]
pub struct Config {
    /// Base URL of the dashboard backend.
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub backend: String,

    /// Read mood snapshots from a JSON file instead of the backend.
    #[arg(long)]
    pub mood_file: Option<PathBuf>,

    /// Defaults to the last renderer picked at runtime, then half-block.
    #[arg(long, value_enum)]
    pub renderer: Option<RendererMode>,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Seed for spike injection; random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many frames.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub frames: Option<u64>,

    #[arg(long, default_value_t = 10.0, value_parser = parse_secs)]
    pub mood_interval_secs: f32,

    #[arg(long, default_value_t = 3.5, value_parser = parse_secs)]
    pub now_interval_secs: f32,

    #[arg(long, default_value_t = 5.0, value_parser = parse_secs)]
    pub http_timeout_secs: f32,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Default level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Finite, at least 100 ms.
fn parse_secs(raw: &str) -> Result<f32, String> {
    let v: f32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))?;
    if !v.is_finite() {
        return Err(format!("'{raw}' is not a finite duration"));
    }
    if v < MIN_INTERVAL_SECS {
        return Err(format!("must be at least {MIN_INTERVAL_SECS} seconds"));
    }
    Ok(v)
}

const MIN_INTERVAL_SECS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
    #[value(alias = "dots")]
    Braille,
    #[value(alias = "text")]
    Ascii,
}

impl RendererMode {
    pub fn next(self) -> Self {
        match self {
            Self::HalfBlock => Self::Braille,
            Self::Braille => Self::Ascii,
            Self::Ascii => Self::HalfBlock,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::HalfBlock => "half-block",
            Self::Braille => "braille",
            Self::Ascii => "ascii",
        }
    }

    pub fn parse_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "half-block" | "halfblock" | "half_block" | "hb" => Some(Self::HalfBlock),
            "braille" | "dots" => Some(Self::Braille),
            "ascii" | "text" => Some(Self::Ascii),
            _ => None,
        }
    }
}

impl Config {
    pub fn frame_budget(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f32(1.0 / self.fps.max(1) as f32)
    }
}
