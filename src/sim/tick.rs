//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically. Inputs are
//! applied between ticks, never in the middle of one.

use super::gravity::Direction8;
use super::merge::merge_all;
use super::metrics::PressureMeter;
use super::physics::{check_finite, confine_all, integrate, relax, resolve_contacts};
use super::state::{GameEvent, GamePhase, GameState, SpawnPolicy};
use crate::error::SimError;

/// One queued player or host input (deterministic)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickInput {
    Fling { dx: f32, dy: f32 },
    Nudge(Direction8),
    /// Tilt sensor angle (radians)
    Tilt(f32),
    Tap { x: f32, y: f32 },
    NewGame,
    PauseGame,
    Unpause,
    ContinuePlaying,
}

/// Apply one input at a tick boundary. Invalid gravity input is dropped.
pub fn apply_input(state: &mut GameState, input: TickInput) {
    let result = match input {
        TickInput::Fling { dx, dy } => state.fling(dx, dy),
        TickInput::Nudge(direction) => state.nudge(direction),
        TickInput::Tilt(angle) => state.tilt(angle),
        TickInput::Tap { x, y } => {
            state.tap(x, y);
            Ok(())
        }
        TickInput::NewGame => {
            state.new_game();
            Ok(())
        }
        TickInput::PauseGame => {
            state.pause_game();
            Ok(())
        }
        TickInput::Unpause => {
            state.unpause();
            Ok(())
        }
        TickInput::ContinuePlaying => {
            state.continue_playing();
            Ok(())
        }
    };
    if let Err(err) = result {
        log::debug!("{input:?}: {err}");
    }
}

/// Advance the game state by one fixed timestep.
///
/// Does nothing unless the game is `Playing`. A `NumericalFault` means the
/// state is corrupt and must be replaced with a new game.
pub fn tick(state: &mut GameState, dt: f32) -> Result<Vec<GameEvent>, SimError> {
    let mut events = Vec::new();
    if state.phase != GamePhase::Playing {
        return Ok(events);
    }

    state.time_ticks += 1;
    let params = state.config.physics;
    let boundary = state.config.boundary;

    // Spawn before the solver runs so the new block is separated this tick
    if let SpawnPolicy::Periodic { every_ticks } = state.config.spawn_policy {
        if every_ticks > 0 && state.time_ticks % every_ticks as u64 == 0 {
            if let Err(err) = state.spawn_random() {
                log::debug!("periodic spawn skipped: {err}");
            }
        }
    }

    state.gravity.step();
    integrate(
        &mut state.registry,
        state.gravity.current(),
        params.max_speed,
        dt,
    );
    let wall_depth = confine_all(&mut state.registry, &boundary, params.wall_restitution);
    let report = resolve_contacts(&mut state.registry, &mut state.grid, params.restitution);

    for record in merge_all(&mut state.registry, &report.merge_pairs) {
        state.score += record.points();
        state.highest_tier = state.highest_tier.max(Some(record.tier));
        if state.achievements.reach(record.tier) {
            log::info!("first {} this game", record.tier.value());
            events.push(GameEvent::Achievement { tier: record.tier });
        }
        events.push(GameEvent::Merged(record));
    }
    state.high_score = state.high_score.max(state.score);

    let jammed = relax(
        &mut state.registry,
        &mut state.grid,
        &boundary,
        params.solver_iterations,
    );
    check_finite(&state.registry)?;

    let block_area: f32 = state
        .registry
        .iter()
        .map(|b| std::f32::consts::PI * b.radius() * b.radius())
        .sum();
    state.pressure.record(PressureMeter::sample(
        block_area,
        boundary.area(),
        report.compression + wall_depth + jammed,
        state.registry.len(),
    ));

    let won = state
        .highest_tier
        .is_some_and(|t| t.rank() >= state.config.win_tier);
    if won && !state.extended {
        state.phase = GamePhase::Won;
        log::info!("game won with score {}", state.score);
        events.push(GameEvent::Won { score: state.score });
        return Ok(events);
    }

    if state.registry.is_full() && !state.registry.has_equal_tiers() {
        state.deadlock_ticks += 1;
    } else {
        state.deadlock_ticks = 0;
    }
    let deadlocked = state.deadlock_ticks >= state.config.deadlock_ticks;
    if deadlocked || state.pressure.is_critical() {
        state.phase = GamePhase::GameOver;
        log::info!(
            "game over ({}) with score {}",
            if deadlocked { "deadlock" } else { "pressure" },
            state.score
        );
        events.push(GameEvent::GameOver { score: state.score });
        return Ok(events);
    }

    Ok(events)
}
