//! Periodic tick source for timed games.

use crate::manager::GameManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

/// Drives every active timed game with one tick per `interval`.
///
/// Each game is ticked under its own exclusive access, so a tick can
/// never interleave with a concurrent move against the same game, and a
/// slow game never delays ticks for the others beyond lock hold time.
/// Runs until the manager is dropped by every other holder, i.e. for the
/// life of the process in practice; spawn it with `tokio::spawn`.
#[instrument(skip(manager))]
pub async fn run_tick_loop(manager: Arc<GameManager>, interval: Duration) {
    info!(interval_ms = interval.as_millis() as u64, "tick scheduler running");
    // First tick one full interval from now; an immediate tick would
    // charge the starting player a second they never had.
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    // Catching up on missed ticks would drain clocks faster than
    // wall-clock time; skip them instead.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let game_ids = manager.active_timed_game_ids();
        if !game_ids.is_empty() {
            debug!(games = game_ids.len(), "ticking timed games");
        }
        for game_id in game_ids {
            manager.tick_game(&game_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::reversi::{GameConfig, TimeoutAction, TimerConfig, TimerPolicy};
    use crate::manager::GameEventKind;

    fn timed_config(initial_secs: u32) -> GameConfig {
        GameConfig {
            timer: Some(TimerConfig {
                policy: TimerPolicy::Fixed,
                initial_secs,
                low_warning_secs: 2,
                critical_warning_secs: 1,
                pause_on_disconnect: false,
                max_pause_secs: 0,
                timeout_action: TimeoutAction::Forfeit,
            }),
            ..GameConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_drains_active_clock() {
        let manager = Arc::new(GameManager::new());
        let id = manager.create_game(timed_config(30)).expect("create");
        manager.join_game(&id, "alice", "Alice").expect("join");
        manager.join_game(&id, "bob", "Bob").expect("join");
        manager.start_game(&id).expect("start");

        tokio::spawn(run_tick_loop(manager.clone(), Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(5_500)).await;

        let snapshot = manager.snapshot(&id).expect("snapshot");
        let timers = snapshot.timers.expect("timed game");
        assert_eq!(timers.black.remaining_secs, 25);
        assert_eq!(timers.white.remaining_secs, 30);
        assert!(timers.black.is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_expiry_forfeits() {
        let manager = Arc::new(GameManager::new());
        let id = manager.create_game(timed_config(3)).expect("create");
        manager.join_game(&id, "alice", "Alice").expect("join");
        manager.join_game(&id, "bob", "Bob").expect("join");
        manager.start_game(&id).expect("start");
        let mut events = manager.subscribe();

        tokio::spawn(run_tick_loop(manager.clone(), Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(4_500)).await;

        let snapshot = manager.snapshot(&id).expect("snapshot");
        assert_eq!(
            snapshot.status,
            crate::games::reversi::GameStatus::Finished
        );
        assert_eq!(
            snapshot.outcome,
            Some(crate::games::reversi::Outcome::Winner(
                crate::games::reversi::Piece::White
            ))
        );

        // Exactly one expiry event among the broadcasts.
        let mut expiries = 0;
        while let Ok(event) = events.try_recv() {
            if event.kind == GameEventKind::TimerExpired {
                expiries += 1;
            }
        }
        assert_eq!(expiries, 1);
    }
}
