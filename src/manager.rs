//! Registry of live games and the engine's command boundary.
//!
//! Every mutating call resolves a game id, takes that game's own mutex,
//! applies exactly one engine operation, and — on success only — publishes
//! a fresh [`GameSnapshot`] on a broadcast channel. The registry lock is
//! held only for insert/lookup, so gameplay on different games never
//! contends and a slow subscriber can never stall a move or a tick.

use crate::games::reversi::{
    Game, GameConfig, GameStatus, InvalidBoardSize, JoinError, MoveError, MoveOutcome, TimerEvent,
};
use crate::session::{GameId, PlayerDirectory, UserId};
use crate::snapshot::{GameSnapshot, GameSummary};
use derive_more::{Display, Error, From};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

/// Errors surfaced at the engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum EngineError {
    /// No game with the given id.
    #[display("game not found: {_0}")]
    GameNotFound(#[error(not(source))] GameId),
    /// Seat request refused.
    #[from]
    Join(JoinError),
    /// Move, resignation, or connection change refused.
    #[from]
    Move(MoveError),
    /// Game creation refused: unsupported board dimensions.
    #[from]
    InvalidBoard(InvalidBoardSize),
}

/// What kind of mutation a broadcast event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameEventKind {
    /// A successful client-driven mutation (join, start, move, resign,
    /// connection change).
    Updated,
    /// Scheduler-driven clock decrement with no threshold crossing.
    TimerTick,
    /// A low or critical time threshold was crossed.
    TimerWarning,
    /// A clock reached zero; the snapshot reflects the timeout action.
    TimerExpired,
}

/// A broadcast to every subscriber of the engine's event stream. The
/// transport layer fans these out to the game's members.
#[derive(Debug, Clone, Serialize)]
pub struct GameEvent {
    /// Which game changed.
    pub game_id: GameId,
    /// What changed.
    pub kind: GameEventKind,
    /// Complete post-mutation state; the only thing clients render from.
    pub snapshot: GameSnapshot,
}

/// Owns the id-to-game registry and serializes access per game.
///
/// Explicitly constructed and shared via `Arc`; never a process global.
#[derive(Debug)]
pub struct GameManager {
    games: RwLock<HashMap<GameId, Arc<Mutex<Game>>>>,
    directory: PlayerDirectory,
    events: broadcast::Sender<GameEvent>,
    next_id: AtomicU64,
}

impl GameManager {
    /// Creates an empty manager.
    #[instrument]
    pub fn new() -> Self {
        info!("creating game manager");
        let (events, _) = broadcast::channel(256);
        Self {
            games: RwLock::new(HashMap::new()),
            directory: PlayerDirectory::new(),
            events,
            next_id: AtomicU64::new(0),
        }
    }

    /// Subscribes to the engine's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Creates a fresh game in `Waiting` and returns its id.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidBoard`] for unsupported dimensions.
    #[instrument(skip(self))]
    pub fn create_game(&self, config: GameConfig) -> Result<GameId, EngineError> {
        let id = format!("game-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let game = Game::new(id.clone(), config)?;
        let mut games = self.games.write().expect("registry lock poisoned");
        games.insert(id.clone(), Arc::new(Mutex::new(game)));
        info!(game_id = %id, "game created");
        Ok(id)
    }

    /// Seats `user_id` in the game (or re-attaches them) and broadcasts
    /// the new roster.
    ///
    /// # Errors
    ///
    /// [`EngineError::GameNotFound`] or [`EngineError::Join`].
    #[instrument(skip(self))]
    pub fn join_game(
        &self,
        game_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> Result<GameSnapshot, EngineError> {
        let snapshot = self.with_game(game_id, |game| {
            game.add_or_update_player(user_id.to_owned(), display_name.to_owned())?;
            Ok(GameSnapshot::of(game))
        })?;
        self.directory.record(user_id, game_id);
        self.publish(GameEventKind::Updated, &snapshot);
        Ok(snapshot)
    }

    /// Re-attaches an already-seated player after a reload or reconnect
    /// without changing game state beyond the connection flag.
    ///
    /// # Errors
    ///
    /// [`EngineError::GameNotFound`], or [`EngineError::Move`] with
    /// `NotSeated` when the user never joined this game.
    #[instrument(skip(self))]
    pub fn resume_session(
        &self,
        game_id: &str,
        user_id: &str,
    ) -> Result<GameSnapshot, EngineError> {
        let snapshot = self.with_game(game_id, |game| {
            game.set_connected(user_id, true)?;
            Ok(GameSnapshot::of(game))
        })?;
        self.publish(GameEventKind::Updated, &snapshot);
        Ok(snapshot)
    }

    /// Starts the game once both seats are filled. A start request
    /// against an unready game is a logged no-op: the current snapshot is
    /// returned and nothing is broadcast.
    ///
    /// # Errors
    ///
    /// [`EngineError::GameNotFound`].
    #[instrument(skip(self))]
    pub fn start_game(&self, game_id: &str) -> Result<GameSnapshot, EngineError> {
        let (started, snapshot) = self.with_game(game_id, |game| {
            let started = match game.start() {
                Ok(()) => true,
                Err(reason) => {
                    warn!(game_id, %reason, "start ignored");
                    false
                }
            };
            Ok((started, GameSnapshot::of(game)))
        })?;
        if started {
            self.publish(GameEventKind::Updated, &snapshot);
        }
        Ok(snapshot)
    }

    /// Applies a move for `user_id`; the sole mutating gameplay entry
    /// point. A rejection is returned only to the caller and never
    /// broadcast: the opponent observes nothing until a move succeeds.
    ///
    /// # Errors
    ///
    /// [`EngineError::GameNotFound`] or [`EngineError::Move`].
    #[instrument(skip(self))]
    pub fn place_piece(
        &self,
        game_id: &str,
        user_id: &str,
        cell: usize,
    ) -> Result<(MoveOutcome, GameSnapshot), EngineError> {
        let (outcome, snapshot) = self.with_game(game_id, |game| {
            let outcome = game.place_piece(user_id, cell)?;
            Ok((outcome, GameSnapshot::of(game)))
        })?;
        self.publish(GameEventKind::Updated, &snapshot);
        self.release_members(&snapshot);
        Ok((outcome, snapshot))
    }

    /// Resigns the game for `user_id` and broadcasts the finish.
    ///
    /// # Errors
    ///
    /// [`EngineError::GameNotFound`] or [`EngineError::Move`].
    #[instrument(skip(self))]
    pub fn resign(&self, game_id: &str, user_id: &str) -> Result<GameSnapshot, EngineError> {
        let snapshot = self.with_game(game_id, |game| {
            game.resign(user_id)?;
            Ok(GameSnapshot::of(game))
        })?;
        self.publish(GameEventKind::Updated, &snapshot);
        self.release_members(&snapshot);
        Ok(snapshot)
    }

    /// Records a disconnect for `user_id`, pausing the turn owner's clock
    /// under a pause-on-disconnect policy.
    ///
    /// # Errors
    ///
    /// [`EngineError::GameNotFound`] or [`EngineError::Move`].
    #[instrument(skip(self))]
    pub fn disconnect(&self, game_id: &str, user_id: &str) -> Result<GameSnapshot, EngineError> {
        let snapshot = self.with_game(game_id, |game| {
            game.set_connected(user_id, false)?;
            Ok(GameSnapshot::of(game))
        })?;
        self.publish(GameEventKind::Updated, &snapshot);
        Ok(snapshot)
    }

    /// The current snapshot of a game, without broadcasting.
    ///
    /// # Errors
    ///
    /// [`EngineError::GameNotFound`].
    #[instrument(skip(self))]
    pub fn snapshot(&self, game_id: &str) -> Result<GameSnapshot, EngineError> {
        self.with_game(game_id, |game| Ok(GameSnapshot::of(game)))
    }

    /// Summaries of every unfinished game `user_id` is seated in.
    #[instrument(skip(self))]
    pub fn list_active_games(&self, user_id: &str) -> Vec<GameSummary> {
        self.directory
            .games_of(user_id)
            .iter()
            .filter_map(|game_id| self.get(game_id).ok())
            .map(|game| GameSummary::of(&game.lock().expect("game lock poisoned")))
            .filter(|summary| !summary.finished)
            .collect()
    }

    /// Ids of games that currently need scheduler ticks: active and
    /// timed.
    #[instrument(skip(self))]
    pub fn active_timed_game_ids(&self) -> Vec<GameId> {
        let games = self.games.read().expect("registry lock poisoned");
        games
            .iter()
            .filter(|(_, game)| {
                let game = game.lock().expect("game lock poisoned");
                *game.status() == GameStatus::Active && game.timers().is_some()
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Delivers one scheduler tick to a game under the same exclusion
    /// moves use, broadcasting the resulting tick/warning/expiry events.
    #[instrument(skip(self))]
    pub fn tick_game(&self, game_id: &str) {
        let Ok(game) = self.get(game_id) else {
            debug!(game_id, "tick for unknown game ignored");
            return;
        };
        let (events, snapshot) = {
            let mut game = game.lock().expect("game lock poisoned");
            let events = game.tick();
            (events, GameSnapshot::of(&game))
        };
        if events.is_empty() {
            // Plain decrement; clients still want the countdown.
            if snapshot.status == GameStatus::Active && snapshot.timers.is_some() {
                self.publish(GameEventKind::TimerTick, &snapshot);
            }
            return;
        }
        for event in events {
            let kind = match event {
                TimerEvent::LowTime(_) | TimerEvent::CriticalTime(_) => GameEventKind::TimerWarning,
                TimerEvent::Expired(_) => GameEventKind::TimerExpired,
            };
            self.publish(kind, &snapshot);
        }
        self.release_members(&snapshot);
    }

    /// Drops directory memberships once a game finishes; the directory
    /// only backs active-game discovery.
    fn release_members(&self, snapshot: &GameSnapshot) {
        if snapshot.status != GameStatus::Finished {
            return;
        }
        for player in &snapshot.players {
            self.directory.remove(&player.user_id, &snapshot.game_id);
        }
    }

    fn get(&self, game_id: &str) -> Result<Arc<Mutex<Game>>, EngineError> {
        let games = self.games.read().expect("registry lock poisoned");
        games
            .get(game_id)
            .cloned()
            .ok_or_else(|| EngineError::GameNotFound(game_id.to_owned()))
    }

    /// Runs `f` under the game's exclusive access. The registry lock is
    /// released before the game lock is taken.
    fn with_game<T>(
        &self,
        game_id: &str,
        f: impl FnOnce(&mut Game) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let game = self.get(game_id)?;
        let mut game = game.lock().expect("game lock poisoned");
        f(&mut game)
    }

    fn publish(&self, kind: GameEventKind, snapshot: &GameSnapshot) {
        // Nobody listening is fine; broadcast just drops the event.
        let _ = self.events.send(GameEvent {
            game_id: snapshot.game_id.clone(),
            kind,
            snapshot: snapshot.clone(),
        });
    }
}

impl Default for GameManager {
    fn default() -> Self {
        Self::new()
    }
}
