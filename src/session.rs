//! Durable client identities and their game memberships.
//!
//! The engine treats user identity as externally issued; this directory
//! only remembers which games a user belongs to so listing and discovery
//! can avoid scanning the whole registry.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

/// Unique identifier for a game.
pub type GameId = String;

/// Stable identifier for a client, externally issued.
pub type UserId = String;

/// Maps each user to the games they are seated in.
///
/// Append/lookup only during normal operation; never consulted or mutated
/// from inside a game's own exclusion boundary.
#[derive(Debug, Clone, Default)]
pub struct PlayerDirectory {
    memberships: Arc<Mutex<HashMap<UserId, HashSet<GameId>>>>,
}

impl PlayerDirectory {
    /// Creates an empty directory.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `user_id` is seated in `game_id`.
    #[instrument(skip(self))]
    pub fn record(&self, user_id: &str, game_id: &str) {
        let mut memberships = self.memberships.lock().expect("directory lock poisoned");
        memberships
            .entry(user_id.to_owned())
            .or_default()
            .insert(game_id.to_owned());
        debug!(user_id, game_id, "membership recorded");
    }

    /// Drops the membership of `user_id` in `game_id`, if present.
    #[instrument(skip(self))]
    pub fn remove(&self, user_id: &str, game_id: &str) {
        let mut memberships = self.memberships.lock().expect("directory lock poisoned");
        if let Some(games) = memberships.get_mut(user_id) {
            games.remove(game_id);
            if games.is_empty() {
                memberships.remove(user_id);
            }
        }
    }

    /// All games `user_id` is seated in, in no particular order.
    #[instrument(skip(self))]
    pub fn games_of(&self, user_id: &str) -> Vec<GameId> {
        let memberships = self.memberships.lock().expect("directory lock poisoned");
        memberships
            .get(user_id)
            .map(|games| games.iter().cloned().collect())
            .unwrap_or_default()
    }
}
