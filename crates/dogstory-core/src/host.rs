//! Simulation host - the single execution context that owns the [`Game`].
//!
//! The game lives on one dedicated thread. Everything that touches it (ticks,
//! joins, moves, state and leaderboard queries) arrives as a command over an
//! `mpsc` channel and runs there in order, so a query can never observe a
//! session halfway through a tick and two ticks never overlap.
//!
//! With a tick period configured the loop waits on `recv_timeout` and ticks
//! whenever the period has elapsed, passing the measured time since the
//! previous tick. Without one, time only advances through explicit
//! [`SimulationClient::tick`] calls.
//!
//! Shutdown: [`SimulationHost::shutdown`] stops the loop, runs
//! [`Game::shutdown`] (observers' final save) and returns the game.
//!
//! A periodic tick whose only failure is an observer keeps the loop running.
//! A session failure stops it, after the shutdown hooks have run.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::components::{DogId, MoveCommand};
use crate::game::{Game, GameError, JoinInfo};
use crate::leaderboard::RetiredDog;
use crate::map::MapId;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostConfig {
    /// Automatic tick cadence; `None` means ticks are driven by clients
    pub tick_period: Option<Duration>,
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("simulation host is not running")]
    Disconnected,
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("failed to start simulation thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("simulation thread panicked")]
    Panicked,
}

/// Requests sent from clients to the simulation thread.
enum Command {
    Tick {
        dt: Duration,
        reply: Sender<Result<(), GameError>>,
    },
    Join {
        map_id: MapId,
        name: String,
        reply: Sender<Result<JoinInfo, GameError>>,
    },
    Move {
        map_id: MapId,
        dog_id: DogId,
        command: MoveCommand,
        reply: Sender<Result<(), GameError>>,
    },
    State {
        map_id: MapId,
        reply: Sender<Option<SessionState>>,
    },
    Records {
        start: usize,
        max_items: usize,
        reply: Sender<Vec<RetiredDog>>,
    },
    Shutdown,
}

/// Cloneable handle for talking to the simulation thread.
#[derive(Clone)]
pub struct SimulationClient {
    tx: Sender<Command>,
}

impl SimulationClient {
    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Command) -> Result<T, HostError> {
        let (reply, response) = mpsc::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| HostError::Disconnected)?;
        response.recv().map_err(|_| HostError::Disconnected)
    }

    /// Advance the game by `dt` right now, independent of any periodic ticks.
    pub fn tick(&self, dt: Duration) -> Result<(), HostError> {
        Ok(self.request(|reply| Command::Tick { dt, reply })??)
    }

    pub fn join(&self, map_id: &MapId, name: &str) -> Result<JoinInfo, HostError> {
        Ok(self.request(|reply| Command::Join {
            map_id: map_id.clone(),
            name: name.to_string(),
            reply,
        })??)
    }

    pub fn move_dog(
        &self,
        map_id: &MapId,
        dog_id: DogId,
        command: MoveCommand,
    ) -> Result<(), HostError> {
        Ok(self.request(|reply| Command::Move {
            map_id: map_id.clone(),
            dog_id,
            command,
            reply,
        })??)
    }

    pub fn state(&self, map_id: &MapId) -> Result<Option<SessionState>, HostError> {
        self.request(|reply| Command::State {
            map_id: map_id.clone(),
            reply,
        })
    }

    pub fn records(&self, start: usize, max_items: usize) -> Result<Vec<RetiredDog>, HostError> {
        self.request(|reply| Command::Records {
            start,
            max_items,
            reply,
        })
    }
}

/// Owner of the simulation thread.
pub struct SimulationHost {
    client: SimulationClient,
    thread: JoinHandle<Result<Game, HostError>>,
}

impl SimulationHost {
    /// Move `game` onto a new simulation thread and start its loop.
    pub fn spawn(game: Game, config: HostConfig) -> Result<Self, HostError> {
        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("simulation".into())
            .spawn(move || run_loop(game, rx, config))
            .map_err(HostError::Spawn)?;
        Ok(Self {
            client: SimulationClient { tx },
            thread,
        })
    }

    pub fn client(&self) -> SimulationClient {
        self.client.clone()
    }

    /// Whether the loop has ended on its own (a session failed a periodic tick).
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stop the loop, run the game's shutdown hooks and hand the game back.
    pub fn shutdown(self) -> Result<Game, HostError> {
        // The loop may already have exited after a failed session tick; join reports it
        let _ = self.client.tx.send(Command::Shutdown);
        self.join()
    }

    /// Wait for the loop to end without asking it to.
    pub fn join(self) -> Result<Game, HostError> {
        self.thread.join().map_err(|_| HostError::Panicked)?
    }
}

fn run_loop(mut game: Game, rx: Receiver<Command>, config: HostConfig) -> Result<Game, HostError> {
    log::info!(
        "Simulation host started ({})",
        match config.tick_period {
            Some(period) => format!("tick every {} ms", period.as_millis()),
            None => "manual ticks".to_string(),
        }
    );
    let mut last_tick = Instant::now();

    loop {
        if let Some(period) = config.tick_period {
            if last_tick.elapsed() >= period {
                let now = Instant::now();
                let dt = now - last_tick;
                last_tick = now;
                match game.tick(dt) {
                    Ok(()) => {}
                    // Sessions already advanced; a failed save is retried on a later tick
                    Err(GameError::Observer(e)) => {
                        log::warn!("Tick observer failed, host keeps running: {}", e);
                    }
                    Err(e) => {
                        log::error!("Periodic tick failed, stopping host: {}", e);
                        if let Err(shutdown_error) = game.shutdown() {
                            log::error!("Shutdown after failed tick: {}", shutdown_error);
                        }
                        return Err(e.into());
                    }
                }
            }
        }

        let received = match config.tick_period {
            Some(period) => rx.recv_timeout(period.saturating_sub(last_tick.elapsed())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Command::Shutdown) => break,
            Ok(command) => handle_command(&mut game, command),
            // Tick is due; handled at the top of the loop
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    log::info!("Simulation host stopping");
    game.shutdown()?;
    Ok(game)
}

/// Run one client request. A dropped reply receiver is ignored.
fn handle_command(game: &mut Game, command: Command) {
    match command {
        Command::Tick { dt, reply } => {
            let _ = reply.send(game.tick(dt));
        }
        Command::Join {
            map_id,
            name,
            reply,
        } => {
            let _ = reply.send(game.join(&map_id, &name));
        }
        Command::Move {
            map_id,
            dog_id,
            command,
            reply,
        } => {
            let _ = reply.send(game.move_dog(&map_id, dog_id, command));
        }
        Command::State { map_id, reply } => {
            let _ = reply.send(game.state(&map_id));
        }
        Command::Records {
            start,
            max_items,
            reply,
        } => {
            let _ = reply.send(game.records(start, max_items).to_vec());
        }
        Command::Shutdown => {}
    }
}
