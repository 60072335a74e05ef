//! Host-facing engine
//!
//! The host owns one `Engine`. While started, a simulation thread owns the
//! session: host calls become commands over a channel, drained at each tick
//! boundary, and boundary events flow back over a second channel. While
//! stopped the session is parked inside the engine and calls are applied
//! directly without ticking.
//!
//! Lifecycle calls are admission gates on ticking, never data mutations.
//! Out-of-order calls are logged and ignored.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::error::SimError;
use crate::persistence::Storage;
use crate::session::{Session, SnapshotSlot, read_snapshot};
use crate::settings::Settings;
use crate::sim::{Direction8, SimConfig, Snapshot, TickInput};

/// Notifications for the host UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    GameWin { score: u64, new_high_score: bool },
    GameOver { score: u64, new_high_score: bool },
    /// The game paused itself; show the pause UI
    GamePause,
    /// First block of this value in the current game
    Achievement { tier_value: u64 },
}

/// Values the host polls for its HUD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UiData {
    pub score: u64,
    pub high_score: u64,
    pub grav_angle: f32,
    /// 0..=100
    pub pressure: u32,
}

impl From<&Snapshot> for UiData {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            score: snapshot.score,
            high_score: snapshot.high_score,
            grav_angle: snapshot.grav_angle,
            pressure: snapshot.pressure,
        }
    }
}

/// Attached drawing surface, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
enum Command {
    Input(TickInput),
    Resume,
    Pause,
    Focus(bool),
    Surface(Option<SurfaceInfo>),
    Settings(Settings),
    Stop,
}

struct Worker {
    commands: Sender<Command>,
    handle: JoinHandle<Session>,
}

pub struct Engine {
    /// Session while no thread runs
    parked: Option<Session>,
    worker: Option<Worker>,
    /// Ticking gate (host resumed us)
    resumed: bool,
    destroyed: bool,
    snapshot: SnapshotSlot,
    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,
}

impl Engine {
    /// Build an engine with a random seed
    pub fn create(config: SimConfig, storage: Box<dyn Storage>) -> Self {
        Self::create_with_seed(config, storage, rand::random())
    }

    pub fn create_with_seed(config: SimConfig, storage: Box<dyn Storage>, seed: u64) -> Self {
        let session = Session::new(config, storage, seed);
        let (events_tx, events_rx) = channel();
        log::info!("engine created (seed {seed})");
        Self {
            snapshot: session.snapshot_slot(),
            parked: Some(session),
            worker: None,
            resumed: false,
            destroyed: false,
            events_tx,
            events_rx,
        }
    }

    /// Spawn the simulation thread. Idempotent.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let Some(session) = self.parked.take() else {
            misuse("start after destroy");
            return;
        };

        let (commands, rx) = channel();
        let events = self.events_tx.clone();
        let resumed = self.resumed;
        let spawned = thread::Builder::new()
            .name("gravity-sim".into())
            .spawn(move || run_loop(session, rx, events, resumed));

        match spawned {
            Ok(handle) => {
                log::info!("simulation thread started");
                self.worker = Some(Worker { commands, handle });
            }
            Err(err) => log::error!("failed to start simulation thread: {err}"),
        }
    }

    /// Open the ticking gate
    pub fn resume(&mut self) {
        if self.destroyed {
            misuse("resume after destroy");
            return;
        }
        self.resumed = true;
        self.send(Command::Resume);
    }

    /// Close the ticking gate; a running game pauses and the host is told
    pub fn pause(&mut self) {
        if self.destroyed {
            misuse("pause after destroy");
            return;
        }
        self.resumed = false;
        self.send(Command::Pause);
    }

    /// Join the simulation thread and park the session. Idempotent.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // A send error means the thread already exited; join still collects it
        let _ = worker.commands.send(Command::Stop);
        match worker.handle.join() {
            Ok(session) => {
                log::info!("simulation thread stopped");
                self.parked = Some(session);
            }
            Err(_) => log::error!("simulation thread panicked; session lost"),
        }
    }

    /// Release all simulation state. Later calls are ignored.
    pub fn destroy(&mut self) {
        if self.destroyed {
            misuse("destroy twice");
            return;
        }
        self.stop();
        self.parked = None;
        self.destroyed = true;
        log::info!("engine destroyed");
    }

    /// Window focus change; losing focus pauses a running game
    pub fn focus(&mut self, focused: bool) {
        self.send(Command::Focus(focused));
    }

    /// Attach (`Some`) or detach (`None`) the drawing surface
    pub fn surface_changed(&mut self, surface: Option<SurfaceInfo>) {
        self.send(Command::Surface(surface));
    }

    pub fn fling(&mut self, dx: f32, dy: f32) {
        self.send(Command::Input(TickInput::Fling { dx, dy }));
    }

    pub fn nudge(&mut self, direction: Direction8) {
        self.send(Command::Input(TickInput::Nudge(direction)));
    }

    pub fn tilt(&mut self, angle: f32) {
        self.send(Command::Input(TickInput::Tilt(angle)));
    }

    pub fn tap(&mut self, x: f32, y: f32) {
        self.send(Command::Input(TickInput::Tap { x, y }));
    }

    pub fn new_game(&mut self) {
        self.send(Command::Input(TickInput::NewGame));
    }

    pub fn pause_game(&mut self) {
        self.send(Command::Input(TickInput::PauseGame));
    }

    pub fn unpause(&mut self) {
        self.send(Command::Input(TickInput::Unpause));
    }

    pub fn continue_playing(&mut self) {
        self.send(Command::Input(TickInput::ContinuePlaying));
    }

    pub fn update_settings(&mut self, settings: Settings) {
        self.send(Command::Settings(settings));
    }

    /// HUD values from the latest snapshot
    pub fn ui_data(&self) -> UiData {
        UiData::from(self.snapshot().as_ref())
    }

    /// Latest complete snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        read_snapshot(&self.snapshot)
    }

    /// Drain every event produced since the last poll
    pub fn poll_events(&mut self) -> Vec<EngineEvent> {
        self.events_rx.try_iter().collect()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn send(&mut self, command: Command) {
        if self.destroyed {
            misuse("call after destroy");
            return;
        }
        if let Some(worker) = &self.worker {
            if worker.commands.send(command).is_err() {
                log::error!("simulation thread is gone");
            }
            return;
        }
        if let Some(session) = self.parked.as_mut() {
            handle_command(session, command, &mut self.resumed);
            session.idle();
            for event in session.drain_events() {
                let _ = self.events_tx.send(event);
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn misuse(what: &'static str) {
    log::warn!("{}", SimError::LifecycleMisuse(what));
}

/// Apply one command to the session. Returns false on `Stop`.
fn handle_command(session: &mut Session, command: Command, resumed: &mut bool) -> bool {
    match command {
        Command::Input(input) => session.push_input(input),
        Command::Resume => *resumed = true,
        Command::Pause => {
            *resumed = false;
            session.request_pause();
        }
        Command::Focus(focused) => {
            if !focused {
                session.request_pause();
            }
        }
        Command::Surface(surface) => session.set_surface(surface),
        Command::Settings(settings) => session.update_settings(settings),
        Command::Stop => return false,
    }
    true
}

/// Simulation thread body: commands, fixed ticks, events, sleep
fn run_loop(
    mut session: Session,
    commands: Receiver<Command>,
    events: Sender<EngineEvent>,
    mut resumed: bool,
) -> Session {
    let mut accumulator = 0.0f32;
    let mut last = Instant::now();

    loop {
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if !handle_command(&mut session, command, &mut resumed) {
                        return session;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return session,
            }
        }

        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32().min(0.1);
        last = now;

        if resumed {
            accumulator += dt;
            let mut substeps = 0;
            while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                session.step();
                accumulator -= SIM_DT;
                substeps += 1;
            }
            if substeps == MAX_SUBSTEPS {
                accumulator = accumulator.min(SIM_DT);
            }
        } else {
            accumulator = 0.0;
        }
        session.idle();

        for event in session.drain_events() {
            if events.send(event).is_err() {
                return session;
            }
        }

        let wait = Duration::from_secs_f32((SIM_DT - accumulator).max(0.001));
        match commands.recv_timeout(wait) {
            Ok(command) => {
                if !handle_command(&mut session, command, &mut resumed) {
                    return session;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;
    use crate::sim::GamePhase;

    fn engine() -> Engine {
        Engine::create_with_seed(SimConfig::default(), Box::new(MemoryStorage::new()), 77)
    }

    #[test]
    fn test_parked_engine_applies_inputs_without_ticking() {
        let mut e = engine();
        e.new_game();
        let snap = e.snapshot();
        assert_eq!(snap.phase, GamePhase::Playing);
        assert_eq!(snap.tick, 0);
    }

    #[test]
    fn test_host_pause_emits_game_pause() {
        let mut e = engine();
        e.new_game();
        e.pause();
        assert_eq!(e.poll_events(), vec![EngineEvent::GamePause]);
        assert_eq!(e.snapshot().phase, GamePhase::Paused);

        e.focus(false);
        assert!(e.poll_events().is_empty(), "already paused");
    }

    #[test]
    fn test_lifecycle_is_idempotent() {
        let mut e = engine();
        e.stop();
        e.start();
        e.start();
        assert!(e.is_running());
        e.stop();
        e.stop();
        assert!(!e.is_running());
        e.destroy();
        e.destroy();
        e.resume();
        e.fling(1.0, 0.0);
        e.start();
        assert!(!e.is_running());
    }

    #[test]
    fn test_thread_ticks_while_resumed() {
        let mut e = engine();
        e.start();
        e.new_game();
        e.resume();

        let deadline = Instant::now() + Duration::from_secs(5);
        while e.snapshot().tick < 5 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(e.snapshot().tick >= 5);

        e.stop();
        let frozen = e.snapshot();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(e.snapshot().tick, frozen.tick, "stopped engine does not tick");
    }
}
