//! FlashTap TUI: tap falling tiles in four lanes before they reach the bottom.

mod app;
mod game;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use game::Rules;
use std::path::Path;

/// Options derived from CLI that affect a run and the frame loop.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub rules: Rules,
    pub seed: u64,
    pub fps: f64,
    pub show_instructions: bool,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let theme = match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(theme) => theme,
        Err(e) => {
            log::warn!("theme not loaded, using defaults: {e}");
            let mut theme = theme::Theme::default();
            theme.apply_palette(args.palette);
            theme
        }
    };
    let config = GameConfig {
        rules: Rules {
            spawn_interval: args.spawn_interval_ms as f32 / 1000.0,
            max_tiles: args.max_tiles as usize,
            max_mistakes: args.max_mistakes,
        },
        seed: args.seed.unwrap_or_else(rand::random),
        fps: args.fps,
        show_instructions: args.show_instructions,
        no_animation: args.no_animation,
    };
    log::debug!("starting with {:?}", config);

    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// The terminal owns stdout/stderr while playing, so logs only go to a file.
/// Level comes from RUST_LOG (default info).
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .init();
    Ok(())
}

/// Tap the falling tiles in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "flashtap",
    version,
    about = "FlashTap: a falling-tile reaction game in the terminal.",
    long_about = "FlashTap is a reaction game. Tiles fall through four lanes; tap them before they reach the bottom.\n\n\
        GREEN tiles score 10, GOLD tiles score 50, RED tiles cost a life when tapped. \
        Letting a GREEN tile fall costs a life too. Three lives per run; tiles speed up every 50 points.\n\n\
        CONTROLS:\n  Mouse click   Tap a tile / press a button\n  D F J K       Tap the lowest tile in lane 1-4 (also 1 2 3 4)\n  \
        Enter         Start / Replay    I  Instructions    Esc  Back    Q / Ctrl-C  Quit"
)]
pub struct Args {
    /// RNG seed for tile lanes and colours. Random if not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Mistakes allowed before the run ends.
    #[arg(long, default_value_t = 3, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_mistakes: u32,

    /// Maximum tiles on screen at once; extra spawns are dropped.
    #[arg(long, default_value_t = 6, value_name = "N", value_parser = clap::value_parser!(u32).range(1..=64))]
    pub max_tiles: u32,

    /// Time between tile spawns in ms.
    #[arg(long, default_value_t = 1000, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub spawn_interval_ms: u64,

    /// Target frames (and simulation steps) per second, 1 to 1000.
    #[arg(long, default_value_t = 60.0, value_name = "RATE", value_parser = frame_rate)]
    pub fps: f64,

    /// Path to theme file (btop-style theme[key]="#hex"; keys: good, bad, bonus, main_bg, main_fg, title, div_line, inactive_fg).
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Open on the instructions screen instead of the menu.
    #[arg(long)]
    pub show_instructions: bool,

    /// Disable the tap flash effect.
    #[arg(long)]
    pub no_animation: bool,

    /// Write logs to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,
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

const FPS_RANGE: std::ops::RangeInclusive<f64> = 1.0..=1000.0;

fn frame_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if FPS_RANGE.contains(&rate) {
        Ok(rate)
    } else {
        Err(format!(
            "rate must be between {} and {}, got {rate}",
            FPS_RANGE.start(),
            FPS_RANGE.end()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_classic_rules() {
        let args = Args::parse_from(["flashtap"]);
        assert_eq!(args.max_mistakes, 3);
        assert_eq!(args.max_tiles, 6);
        assert_eq!(args.spawn_interval_ms, 1000);
        assert_eq!(args.fps, 60.0);
        assert_eq!(args.palette, Palette::Normal);
        assert!(!args.show_instructions);
    }

    #[test]
    fn test_rejects_zero_mistakes() {
        assert!(Args::try_parse_from(["flashtap", "--max-mistakes", "0"]).is_err());
        assert!(Args::try_parse_from(["flashtap", "--fps", "0"]).is_err());
    }

    #[test]
    fn test_fps_out_of_range_rejected() {
        for rate in ["1e-300", "0.5", "1001", "inf", "NaN", "-60"] {
            assert!(
                Args::try_parse_from(["flashtap", "--fps", rate]).is_err(),
                "--fps {rate} accepted"
            );
        }
        let args = Args::try_parse_from(["flashtap", "--fps", "1000"]).unwrap();
        assert_eq!(args.fps, 1000.0);
    }

    #[test]
    fn test_palette_alias() {
        let args = Args::try_parse_from(["flashtap", "--palette", "colourblind", "--seed", "9"]).unwrap();
        assert_eq!(args.palette, Palette::Colorblind);
        assert_eq!(args.seed, Some(9));
    }
}
