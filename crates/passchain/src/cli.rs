use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use renderer::DEFAULT_TIMING_WINDOW;

#[derive(Parser, Debug)]
#[command(
    name = "passchain",
    author,
    version,
    about = "Preview multi-pass slang shader presets"
)]
pub struct Args {
    /// Preset file listing the shader passes (`shaders=N`, `shader0=...`).
    #[arg(value_name = "PRESET", env = "PASSCHAIN_PRESET")]
    pub preset: PathBuf,

    /// Image fed to the chain as `Original`; a red placeholder is used otherwise.
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        value_parser = parse_surface_size,
        default_value = "1280x720"
    )]
    pub size: (u32, u32),

    /// Source for the `sound` sampler.
    #[arg(long, value_enum, default_value_t = AudioMode::None)]
    pub audio: AudioMode,

    /// Measure per-pass GPU time with timer queries.
    #[arg(long)]
    pub profile: bool,

    /// Frames averaged per GPU timing log line.
    #[arg(long, value_name = "FRAMES", default_value_t = DEFAULT_TIMING_WINDOW)]
    pub timing_window: u32,

    /// Write a JSON GPU timing report here on exit.
    #[arg(long, value_name = "PATH")]
    pub timing_report: Option<PathBuf>,

    /// Parse the preset and transpile every pass, then exit without opening a window.
    #[arg(long)]
    pub check: bool,

    /// Log at debug level regardless of `RUST_LOG`.
    #[arg(long)]
    pub debug: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AudioMode {
    /// Leave `sound` unbound.
    None,
    /// Feed a generated test signal.
    Synthetic,
}

pub fn parse() -> Args {
    Args::parse()
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size '{trimmed}'"))?;

    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}
