//! Single-threaded game session
//!
//! Owns the simulation and everything around it: the input queue, the
//! high-score and settings collaborators, boundary events waiting to be
//! delivered, and the published snapshot. Deterministic for a given seed and
//! input sequence, which is what the engine thread drives and what tests use
//! directly.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use glam::Vec2;

use crate::consts::SIM_DT;
use crate::engine::{EngineEvent, SurfaceInfo, UiData};
use crate::error::SimError;
use crate::highscores::HighScores;
use crate::persistence::Storage;
use crate::settings::Settings;
use crate::sim::{GameEvent, GameState, SimConfig, Snapshot, Tier, TickInput, apply_input, tick};

/// Latest published snapshot. Readers clone the inner `Arc`.
pub type SnapshotSlot = Arc<RwLock<Arc<Snapshot>>>;

/// Read the current snapshot, even from a poisoned lock
pub fn read_snapshot(slot: &SnapshotSlot) -> Arc<Snapshot> {
    match slot.read() {
        Ok(guard) => Arc::clone(&guard),
        Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
}

pub struct Session {
    state: GameState,
    inputs: VecDeque<TickInput>,
    storage: Box<dyn Storage>,
    high_scores: HighScores,
    settings: Settings,
    surface: Option<SurfaceInfo>,
    events: Vec<EngineEvent>,
    published: SnapshotSlot,
}

impl Session {
    pub fn new(mut config: SimConfig, storage: Box<dyn Storage>, seed: u64) -> Self {
        let settings = Settings::load(storage.as_ref());
        let high_scores = HighScores::load(storage.as_ref());
        log::debug!(
            "theme {}, tilt control {}",
            settings.theme,
            if settings.tilt_enabled() { "on" } else { "off" }
        );
        if settings.tilt_enabled() {
            config.spawn_policy = settings.spawn_policy();
        }

        let mut state = GameState::new(config, seed);
        state.high_score = high_scores.best();
        let published = Arc::new(RwLock::new(Arc::new(state.snapshot(false))));

        Self {
            state,
            inputs: VecDeque::new(),
            storage,
            high_scores,
            settings,
            surface: None,
            events: Vec::new(),
            published,
        }
    }

    /// Queue an input for the next tick boundary
    pub fn push_input(&mut self, input: TickInput) {
        self.inputs.push_back(input);
    }

    /// Apply queued inputs. Returns whether there were any.
    pub fn apply_pending(&mut self) -> bool {
        if self.inputs.is_empty() {
            return false;
        }
        while let Some(input) = self.inputs.pop_front() {
            if input == TickInput::NewGame {
                self.state.high_score = self.high_scores.best();
            }
            apply_input(&mut self.state, input);
        }
        true
    }

    /// Apply pending inputs and publish without ticking (ticking gate closed)
    pub fn idle(&mut self) {
        if self.apply_pending() {
            self.publish();
        }
    }

    /// One tick boundary: inputs, one fixed step, events, snapshot
    pub fn step(&mut self) {
        self.apply_pending();
        match tick(&mut self.state, SIM_DT) {
            Ok(events) => self.handle_events(events),
            Err(err) => self.recover(err),
        }
        self.publish();
    }

    /// Run `ticks` steps back to back
    pub fn advance(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Host-initiated pause (app backgrounded or focus lost).
    /// Pauses a running game and asks the host to show its pause UI.
    pub fn request_pause(&mut self) {
        if self.state.pause_game() {
            self.events.push(EngineEvent::GamePause);
            self.publish();
        }
    }

    /// Attach or detach the drawing surface
    pub fn set_surface(&mut self, surface: Option<SurfaceInfo>) {
        if self.surface != surface {
            log::debug!("surface changed: {surface:?}");
            self.surface = surface;
            self.publish();
        }
    }

    /// Replace preferences, persist them, and apply the spawn policy they imply
    pub fn update_settings(&mut self, settings: Settings) {
        settings.save(self.storage.as_ref());
        self.state.config.spawn_policy = settings.spawn_policy();
        self.settings = settings;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn high_scores(&self) -> &HighScores {
        &self.high_scores
    }

    /// Start a game from an exact layout (scripted scenarios)
    pub fn new_game_with(&mut self, layout: &[(Tier, Vec2, Vec2)]) -> Result<(), SimError> {
        self.inputs.clear();
        self.state.high_score = self.high_scores.best();
        let result = self.state.new_game_with(layout);
        self.publish();
        result
    }

    /// Boundary events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        read_snapshot(&self.published)
    }

    /// Shared handle other threads can read snapshots through
    pub fn snapshot_slot(&self) -> SnapshotSlot {
        Arc::clone(&self.published)
    }

    pub fn ui_data(&self) -> UiData {
        UiData::from(self.snapshot().as_ref())
    }

    fn handle_events(&mut self, events: Vec<GameEvent>) {
        for event in events {
            match event {
                GameEvent::Won { score } => {
                    let new_high_score = self.record_score(score);
                    self.events.push(EngineEvent::GameWin {
                        score,
                        new_high_score,
                    });
                }
                GameEvent::GameOver { score } => {
                    let new_high_score = self.record_score(score);
                    self.events.push(EngineEvent::GameOver {
                        score,
                        new_high_score,
                    });
                }
                GameEvent::Achievement { tier } => {
                    self.events.push(EngineEvent::Achievement {
                        tier_value: tier.value(),
                    });
                }
                GameEvent::Merged(record) => {
                    log::trace!("merge -> {} at {:?}", record.tier.value(), record.pos);
                }
            }
        }
    }

    fn record_score(&mut self, score: u64) -> bool {
        let best_block = self.state.highest_tier.map_or(0, Tier::value);
        let new_high = self.high_scores.record(score, best_block);
        self.high_scores.save(self.storage.as_ref());
        self.state.high_score = self.state.high_score.max(self.high_scores.best());
        new_high
    }

    /// A corrupt tick never reaches a snapshot: restart from a fresh game
    fn recover(&mut self, err: SimError) {
        log::error!("{err}; starting a new game");
        self.inputs.clear();
        self.state.high_score = self.high_scores.best();
        self.state.new_game();
    }

    fn publish(&self) {
        let snapshot = Arc::new(self.state.snapshot(self.surface.is_some()));
        match self.published.write() {
            Ok(mut slot) => *slot = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;
    use crate::sim::{GamePhase, SpawnPolicy};

    fn tier(rank: u8) -> Tier {
        Tier::new(rank).unwrap()
    }

    fn session(config: SimConfig) -> (Session, MemoryStorage) {
        let storage = MemoryStorage::new();
        (Session::new(config, Box::new(storage.clone()), 5), storage)
    }

    #[test]
    fn test_inputs_wait_for_tick_boundary() {
        let (mut s, _) = session(SimConfig::default());
        s.push_input(TickInput::NewGame);
        assert_eq!(s.snapshot().phase, GamePhase::New);
        s.step();
        assert_eq!(s.snapshot().phase, GamePhase::Playing);
        assert_eq!(s.snapshot().tick, 1);
    }

    #[test]
    fn test_idle_applies_without_ticking() {
        let (mut s, _) = session(SimConfig::default());
        s.push_input(TickInput::NewGame);
        s.idle();
        let snap = s.snapshot();
        assert_eq!(snap.phase, GamePhase::Playing);
        assert_eq!(snap.tick, 0);
    }

    #[test]
    fn test_request_pause_emits_once() {
        let (mut s, _) = session(SimConfig::default());
        s.request_pause();
        assert!(s.drain_events().is_empty(), "nothing to pause yet");

        s.push_input(TickInput::NewGame);
        s.step();
        s.request_pause();
        s.request_pause();
        assert_eq!(s.drain_events(), vec![EngineEvent::GamePause]);
    }

    #[test]
    fn test_surface_controls_instances() {
        let (mut s, _) = session(SimConfig::default());
        s.push_input(TickInput::NewGame);
        s.step();
        assert!(s.snapshot().blocks.is_empty());
        s.set_surface(Some(SurfaceInfo {
            width: 1080,
            height: 1920,
        }));
        assert_eq!(s.snapshot().blocks.len(), s.snapshot().block_count);
    }

    #[test]
    fn test_numerical_fault_restarts_game() {
        let config = SimConfig {
            spawn_policy: SpawnPolicy::Manual,
            ..SimConfig::default()
        };
        let (mut s, _) = session(config);
        s.new_game_with(&[(tier(1), Vec2::new(100.0, 100.0), Vec2::new(f32::NAN, 0.0))])
            .unwrap();
        s.step();

        let snap = s.snapshot();
        assert_eq!(snap.phase, GamePhase::Playing);
        assert_eq!(snap.tick, 0, "fresh game after the fault");
        assert!(s.state().registry.iter().all(|b| b.is_finite()));
    }

    #[test]
    fn test_win_flags_new_high_score_once() {
        let config = SimConfig {
            win_tier: 2,
            spawn_policy: SpawnPolicy::Manual,
            ..SimConfig::default()
        };
        let (mut s, storage) = session(config);
        let pair = [
            (tier(1), Vec2::new(100.0, 100.0), Vec2::ZERO),
            (tier(1), Vec2::new(119.0, 100.0), Vec2::ZERO),
        ];

        s.new_game_with(&pair).unwrap();
        s.advance(5);
        let events = s.drain_events();
        assert!(events.contains(&EngineEvent::GameWin {
            score: 4,
            new_high_score: true
        }));
        assert!(storage.get("gravity_2050_highscores").is_some());

        s.new_game_with(&pair).unwrap();
        assert_eq!(s.ui_data().high_score, 4);
        s.advance(5);
        let events = s.drain_events();
        assert!(events.contains(&EngineEvent::GameWin {
            score: 4,
            new_high_score: false
        }));
    }

    #[test]
    fn test_deadlock_reports_game_over() {
        let config = SimConfig {
            max_blocks: 2,
            deadlock_ticks: 3,
            spawn_policy: SpawnPolicy::Manual,
            ..SimConfig::default()
        };
        let (mut s, _) = session(config);
        s.new_game_with(&[
            (tier(1), Vec2::new(100.0, 100.0), Vec2::ZERO),
            (tier(2), Vec2::new(300.0, 300.0), Vec2::ZERO),
        ])
        .unwrap();
        s.advance(10);

        assert_eq!(
            s.drain_events(),
            vec![EngineEvent::GameOver {
                score: 0,
                new_high_score: false
            }]
        );
        assert_eq!(s.snapshot().phase, GamePhase::GameOver);
    }
}
