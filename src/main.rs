//! Johnnymino: falling-piece puzzle on a 6×13 board, with colour bombs and a commentator who won't stop talking.

mod app;
mod bombbag;
mod commentary;
mod field;
mod game;
mod input;
mod logging;
mod piece;
mod rng;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that shape a session and the frame loop.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Fixed seed for reproducible runs; entropy when absent.
    pub seed: Option<u64>,
    /// Nominal duration of each voice clip, ms.
    pub clip_ms: f64,
    /// Upper bound on the per-frame delta, ms.
    pub max_frame_delta_ms: f64,
    pub frame_rate: f64,
    pub no_intro: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    anyhow::ensure!(args.frame_rate > 0.0, "--frame-rate must be positive");

    if let Some(path) = &args.log_file {
        logging::init(path, args.log_level)
            .with_context(|| format!("setting up logging to {}", path.display()))?;
    }

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|err| {
        log::warn!("falling back to the default theme: {err}");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    let config = GameConfig {
        seed: args.seed,
        clip_ms: args.clip_ms as f64,
        max_frame_delta_ms: args.max_frame_delta_ms as f64,
        frame_rate: args.frame_rate,
        no_intro: args.no_intro,
    };
    log::info!("starting with {config:?}");

    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// Falling-piece puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "johnnymino",
    version,
    about = "Falling-piece puzzle on a 6x13 board. Clear lines, earn bombs, hear Johnny out.",
    long_about = "Johnnymino is a small falling-piece puzzle with a running commentary.\n\n\
        Pieces fall into a 6-wide, 13-tall well. Full rows clear and earn a bomb charge \
        (up to three). Arm a bomb on a colour and, a second later, every block of that \
        colour is gone. Each cleared line buys the next part of Johnny's suggestion; hear \
        all of it to win.\n\n\
        CONTROLS:\n  Left/Right, h/l  Move        Up, k           Rotate\n  Down, j (hold)   Fast fall   a/s/d/w         Bomb blue/green/red/yellow\n  Space            Cycle bomb colour (start / retry on other screens)\n  Esc / p          Pause       q / Ctrl-C      Quit"
)]
pub struct Args {
    /// Seed for piece and commentary randomness (same seed + same input = same game).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Target frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// How long each commentary clip stays on air, in ms.
    #[arg(long, default_value = "3000", value_name = "MS")]
    pub clip_ms: u64,

    /// Longest step a single frame may take, in ms.
    #[arg(long, default_value = "100", value_name = "MS")]
    pub max_frame_delta_ms: u64,

    /// Write a log to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,

    /// Log level for --log-file (error, warn, info, debug, trace).
    #[arg(long, default_value = "debug", value_name = "LEVEL")]
    pub log_level: log::LevelFilter,

    /// Skip the welcome screen and start playing immediately.
    #[arg(long)]
    pub no_intro: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
