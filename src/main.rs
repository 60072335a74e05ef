//! Headless driver
//!
//! Runs a scripted session against the engine the way a host would: lifecycle
//! calls, a fling every half second, a HUD poll every 100 ms, and every
//! boundary event logged. Useful for watching the simulation with
//! `RUST_LOG=debug`.
//!
//! Usage: `gravity-2050 [storage-dir] [seconds] [theme]`
//!
//! A theme (`system`, `day` or `night`) is saved to the stored settings
//! before the engine starts.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use gravity_2050::persistence::FileStorage;
use gravity_2050::sim::{Direction8, SimConfig};
use gravity_2050::{Engine, EngineEvent, Settings, SurfaceInfo, Theme};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const FLING_EVERY_POLLS: u32 = 5;

const SCRIPT: [Direction8; 8] = [
    Direction8::Down,
    Direction8::Left,
    Direction8::Down,
    Direction8::Right,
    Direction8::DownLeft,
    Direction8::Up,
    Direction8::DownRight,
    Direction8::Down,
];

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("gravity-2050"));
    let seconds: u64 = match args.next() {
        Some(s) => s.parse().context("seconds must be a whole number")?,
        None => 30,
    };
    let theme: Option<Theme> = args.next().map(|s| s.parse()).transpose()?;

    let storage = FileStorage::new(&dir)
        .with_context(|| format!("cannot use storage directory {}", dir.display()))?;
    log::info!("Gravity 2050 (headless) storing data in {}", dir.display());

    if let Some(theme) = theme {
        let mut settings = Settings::load(&storage);
        settings.theme = theme;
        settings.save(&storage);
        log::info!("theme set to {theme}");
    }

    let mut engine = Engine::create(SimConfig::default(), Box::new(storage));
    engine.start();
    engine.surface_changed(Some(SurfaceInfo {
        width: 1080,
        height: 1920,
    }));
    engine.resume();
    engine.new_game();

    let end = Instant::now() + Duration::from_secs(seconds);
    let mut polls = 0u32;
    let mut script = SCRIPT.iter().cycle();

    while Instant::now() < end {
        thread::sleep(POLL_INTERVAL);
        polls += 1;

        if polls % FLING_EVERY_POLLS == 0 {
            if let Some(&direction) = script.next() {
                engine.nudge(direction);
            }
        }

        for event in engine.poll_events() {
            match event {
                EngineEvent::GameWin {
                    score,
                    new_high_score,
                } => {
                    log::info!("WIN score={score} new_high={new_high_score}; continuing");
                    engine.continue_playing();
                }
                EngineEvent::GameOver {
                    score,
                    new_high_score,
                } => {
                    log::info!("GAME OVER score={score} new_high={new_high_score}; restarting");
                    engine.new_game();
                }
                EngineEvent::GamePause => {
                    log::info!("paused; tapping to continue");
                    engine.tap(0.0, 0.0);
                }
                EngineEvent::Achievement { tier_value } => {
                    log::info!("achievement: {tier_value}");
                }
            }
        }

        if polls % 10 == 0 {
            let ui = engine.ui_data();
            let snapshot = engine.snapshot();
            log::info!(
                "score={} high={} angle={:.2} pressure={}% blocks={}",
                ui.score,
                ui.high_score,
                ui.grav_angle,
                ui.pressure,
                snapshot.block_count
            );
        }
    }

    engine.pause();
    engine.stop();
    engine.destroy();
    Ok(())
}
