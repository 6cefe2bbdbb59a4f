//! Per-player countdown clocks.
//!
//! A [`TimerPair`] holds one [`TimerState`] per color plus the shared,
//! immutable [`TimerConfig`]. An external scheduler drives the pair with
//! one [`TimerPair::tick`] call per interval (nominally 1s); only the turn
//! owner's clock ever consumes wall-clock time, so the two clocks never
//! double-count an interval. Ticks delivered while no clock is running are
//! no-ops, which tolerates scheduler jitter around turn changes and
//! reconnects.

use super::types::Piece;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Time-accounting policy for a timed game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "secs")]
pub enum TimerPolicy {
    /// One fixed bank of time for the whole game.
    Fixed,
    /// Fixed bank plus a bonus added to the mover's clock after each move.
    Increment(u32),
    /// The first N seconds of every turn are free before the bank drains.
    Delay(u32),
    /// The clock refills to a per-move allotment at the start of each turn.
    Correspondence(u32),
    /// No time accounting at all.
    Unlimited,
}

/// What happens to the game when a clock reaches zero.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeoutAction {
    /// The expired player loses; the game finishes immediately.
    Forfeit,
    /// The turn passes to the opponent; the expired clock refills.
    AutoPass,
    /// A move is chosen by strategy on the expired player's behalf.
    AutoMove,
}

/// Immutable clock configuration, fixed at game creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Accounting policy.
    pub policy: TimerPolicy,
    /// Starting bank per player, in seconds.
    pub initial_secs: u32,
    /// Threshold for the one-shot low-time warning.
    pub low_warning_secs: u32,
    /// Threshold for the one-shot critical-time warning.
    pub critical_warning_secs: u32,
    /// Pause the turn owner's clock when they disconnect.
    pub pause_on_disconnect: bool,
    /// Upper bound on a disconnect pause; afterwards the clock resumes
    /// unconditionally.
    pub max_pause_secs: u32,
    /// Policy applied when a clock expires.
    pub timeout_action: TimeoutAction,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            policy: TimerPolicy::Fixed,
            initial_secs: 300,
            low_warning_secs: 60,
            critical_warning_secs: 10,
            pause_on_disconnect: true,
            max_pause_secs: 120,
            timeout_action: TimeoutAction::Forfeit,
        }
    }
}

/// Phase of a single player's clock.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimerPhase {
    /// Not the turn owner; clock frozen.
    Idle,
    /// Turn owner; clock draining.
    Active,
    /// Turn owner disconnected under `pause_on_disconnect`.
    Paused,
    /// Reached zero. Terminal unless explicitly refilled by a
    /// non-forfeit timeout action.
    Expired,
}

/// Signal emitted by a tick. Each warning fires at most once per
/// threshold crossing; expiry fires exactly once per expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "piece")]
pub enum TimerEvent {
    /// Remaining time crossed the low-time threshold.
    LowTime(Piece),
    /// Remaining time crossed the critical-time threshold.
    CriticalTime(Piece),
    /// Remaining time reached zero.
    Expired(Piece),
}

/// Runtime clock state for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct TimerState {
    /// Seconds left in the bank. Clamped at zero, never negative.
    remaining_secs: u32,
    /// Current phase.
    phase: TimerPhase,
    /// Total wall-clock seconds spent paused across the game.
    total_paused_secs: u32,
    /// Seconds of pause budget left in the current pause episode.
    pause_remaining_secs: u32,
    /// Moves completed by this player.
    move_count: u32,
    /// Free seconds left this turn under a delay policy.
    delay_remaining_secs: u32,
    /// Latch: low-time warning already emitted for this allotment.
    warned_low: bool,
    /// Latch: critical-time warning already emitted for this allotment.
    warned_critical: bool,
    /// Wall-clock instant of the last state change.
    last_update: DateTime<Utc>,
}

impl TimerState {
    fn new(initial_secs: u32) -> Self {
        Self {
            remaining_secs: initial_secs,
            phase: TimerPhase::Idle,
            total_paused_secs: 0,
            pause_remaining_secs: 0,
            move_count: 0,
            delay_remaining_secs: 0,
            warned_low: false,
            warned_critical: false,
            last_update: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.last_update = Utc::now();
    }
}

/// Both players' clocks plus the shared configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPair {
    config: TimerConfig,
    black: TimerState,
    white: TimerState,
}

impl TimerPair {
    /// Creates an idle pair; call [`TimerPair::activate`] for the starting
    /// player once the game begins.
    #[instrument]
    pub fn new(config: TimerConfig) -> Self {
        Self {
            black: TimerState::new(config.initial_secs),
            white: TimerState::new(config.initial_secs),
            config,
        }
    }

    /// The shared configuration.
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// The clock for the given color.
    pub fn state(&self, piece: Piece) -> &TimerState {
        match piece {
            Piece::Black => &self.black,
            Piece::White => &self.white,
        }
    }

    fn state_mut(&mut self, piece: Piece) -> &mut TimerState {
        match piece {
            Piece::Black => &mut self.black,
            Piece::White => &mut self.white,
        }
    }

    /// Makes `piece` the running clock and idles the opponent's.
    ///
    /// Re-arms per-turn allotments: delay seconds under a delay policy, a
    /// fresh per-move bank (with re-armed warnings) under correspondence.
    #[instrument(skip(self))]
    pub fn activate(&mut self, piece: Piece) {
        let config = self.config;
        let opponent = self.state_mut(piece.opponent());
        if matches!(opponent.phase, TimerPhase::Active | TimerPhase::Paused) {
            opponent.phase = TimerPhase::Idle;
            opponent.touch();
        }
        let state = self.state_mut(piece);
        if state.phase == TimerPhase::Expired {
            return;
        }
        match config.policy {
            TimerPolicy::Delay(secs) => state.delay_remaining_secs = secs,
            TimerPolicy::Correspondence(secs) => {
                state.remaining_secs = secs;
                state.warned_low = false;
                state.warned_critical = false;
            }
            _ => {}
        }
        state.phase = TimerPhase::Active;
        state.touch();
        debug!(piece = %piece, remaining = state.remaining_secs, "clock activated");
    }

    /// Records a completed move by `piece`, applying the increment bonus
    /// before the active side swaps.
    #[instrument(skip(self))]
    pub fn on_move_made(&mut self, piece: Piece) {
        let config = self.config;
        let state = self.state_mut(piece);
        state.move_count += 1;
        if let TimerPolicy::Increment(bonus) = config.policy {
            state.remaining_secs += bonus;
            // A bonus can lift the clock back above a warning threshold;
            // the latch re-arms so the next crossing warns again.
            if state.remaining_secs > config.low_warning_secs {
                state.warned_low = false;
            }
            if state.remaining_secs > config.critical_warning_secs {
                state.warned_critical = false;
            }
        }
        state.touch();
    }

    /// Pauses the running clock for `piece` (disconnect path). No-op
    /// unless that clock is `Active` and the policy pauses on disconnect.
    #[instrument(skip(self))]
    pub fn pause(&mut self, piece: Piece) {
        let config = self.config;
        let state = self.state_mut(piece);
        if config.pause_on_disconnect && state.phase == TimerPhase::Active {
            state.phase = TimerPhase::Paused;
            state.pause_remaining_secs = config.max_pause_secs;
            state.touch();
            info!(piece = %piece, budget = config.max_pause_secs, "clock paused");
        }
    }

    /// Resumes a paused clock for `piece` (reconnect path).
    #[instrument(skip(self))]
    pub fn resume(&mut self, piece: Piece) {
        let state = self.state_mut(piece);
        if state.phase == TimerPhase::Paused {
            state.phase = TimerPhase::Active;
            state.pause_remaining_secs = 0;
            state.touch();
            info!(piece = %piece, "clock resumed");
        }
    }

    /// Refills `piece`'s clock to the initial bank and clears the expired
    /// phase. Used by non-forfeit timeout actions.
    #[instrument(skip(self))]
    pub fn refill(&mut self, piece: Piece) {
        let initial = self.config.initial_secs;
        let state = self.state_mut(piece);
        state.remaining_secs = initial;
        state.phase = TimerPhase::Idle;
        state.warned_low = false;
        state.warned_critical = false;
        state.touch();
    }

    /// Freezes both clocks at game end. Expired clocks stay expired.
    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        for piece in [Piece::Black, Piece::White] {
            let state = self.state_mut(piece);
            if matches!(state.phase, TimerPhase::Active | TimerPhase::Paused) {
                state.phase = TimerPhase::Idle;
                state.touch();
            }
        }
    }

    /// Advances `piece`'s clock by one interval.
    ///
    /// `Active`: consumes a delay second if one is left, otherwise drains
    /// the bank and emits threshold/expiry events. `Paused`: burns pause
    /// budget instead, auto-resuming when the budget is exhausted. Any
    /// other phase is a no-op.
    #[instrument(skip(self))]
    pub fn tick(&mut self, piece: Piece) -> Vec<TimerEvent> {
        let config = self.config;
        let state = self.state_mut(piece);
        let mut events = Vec::new();

        match state.phase {
            TimerPhase::Paused => {
                state.total_paused_secs += 1;
                state.pause_remaining_secs = state.pause_remaining_secs.saturating_sub(1);
                if state.pause_remaining_secs == 0 {
                    state.phase = TimerPhase::Active;
                    info!(piece = %piece, "pause budget exhausted, clock resumes");
                }
                state.touch();
            }
            TimerPhase::Active => {
                if matches!(config.policy, TimerPolicy::Unlimited) {
                    return events;
                }
                if state.delay_remaining_secs > 0 {
                    state.delay_remaining_secs -= 1;
                    state.touch();
                    return events;
                }
                state.remaining_secs = state.remaining_secs.saturating_sub(1);
                state.touch();
                if state.remaining_secs == 0 {
                    state.phase = TimerPhase::Expired;
                    info!(piece = %piece, "clock expired");
                    events.push(TimerEvent::Expired(piece));
                    return events;
                }
                // The latches are independent: a short allotment can
                // cross both thresholds on the same tick.
                if !state.warned_low && state.remaining_secs <= config.low_warning_secs {
                    state.warned_low = true;
                    events.push(TimerEvent::LowTime(piece));
                }
                if !state.warned_critical && state.remaining_secs <= config.critical_warning_secs {
                    state.warned_critical = true;
                    events.push(TimerEvent::CriticalTime(piece));
                }
            }
            TimerPhase::Idle | TimerPhase::Expired => {}
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_config() -> TimerConfig {
        TimerConfig {
            policy: TimerPolicy::Fixed,
            initial_secs: 5,
            low_warning_secs: 3,
            critical_warning_secs: 1,
            pause_on_disconnect: true,
            max_pause_secs: 2,
            timeout_action: TimeoutAction::Forfeit,
        }
    }

    #[test]
    fn test_tick_ignored_while_idle() {
        let mut pair = TimerPair::new(short_config());
        assert!(pair.tick(Piece::Black).is_empty());
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 5);
    }

    #[test]
    fn test_warnings_fire_once() {
        let mut pair = TimerPair::new(short_config());
        pair.activate(Piece::Black);
        assert!(pair.tick(Piece::Black).is_empty()); // 4
        let events = pair.tick(Piece::Black); // 3 - low
        assert_eq!(events, vec![TimerEvent::LowTime(Piece::Black)]);
        assert!(pair.tick(Piece::Black).is_empty()); // 2 - latched
        let events = pair.tick(Piece::Black); // 1 - critical
        assert_eq!(events, vec![TimerEvent::CriticalTime(Piece::Black)]);
        let events = pair.tick(Piece::Black); // 0 - expired
        assert_eq!(events, vec![TimerEvent::Expired(Piece::Black)]);
        assert_eq!(*pair.state(Piece::Black).phase(), TimerPhase::Expired);
        // Further ticks are no-ops on an expired clock.
        assert!(pair.tick(Piece::Black).is_empty());
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 0);
    }

    #[test]
    fn test_short_allotment_crosses_both_thresholds() {
        let mut config = short_config();
        config.initial_secs = 2;
        config.low_warning_secs = 5;
        let mut pair = TimerPair::new(config);
        pair.activate(Piece::Black);
        // One tick lands below both thresholds; both warnings fire.
        let events = pair.tick(Piece::Black);
        assert_eq!(
            events,
            vec![
                TimerEvent::LowTime(Piece::Black),
                TimerEvent::CriticalTime(Piece::Black)
            ]
        );
        let events = pair.tick(Piece::Black);
        assert_eq!(events, vec![TimerEvent::Expired(Piece::Black)]);
    }

    #[test]
    fn test_increment_adds_to_mover() {
        let mut config = short_config();
        config.policy = TimerPolicy::Increment(7);
        let mut pair = TimerPair::new(config);
        pair.activate(Piece::Black);
        pair.tick(Piece::Black);
        pair.on_move_made(Piece::Black);
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 11);
        assert_eq!(*pair.state(Piece::Black).move_count(), 1);
    }

    #[test]
    fn test_delay_ticks_are_free() {
        let mut config = short_config();
        config.policy = TimerPolicy::Delay(2);
        let mut pair = TimerPair::new(config);
        pair.activate(Piece::Black);
        pair.tick(Piece::Black);
        pair.tick(Piece::Black);
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 5);
        pair.tick(Piece::Black);
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 4);
    }

    #[test]
    fn test_correspondence_refills_each_turn() {
        let mut config = short_config();
        config.policy = TimerPolicy::Correspondence(10);
        let mut pair = TimerPair::new(config);
        pair.activate(Piece::Black);
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 10);
        pair.tick(Piece::Black);
        pair.activate(Piece::White);
        pair.activate(Piece::Black);
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 10);
    }

    #[test]
    fn test_unlimited_never_drains() {
        let mut config = short_config();
        config.policy = TimerPolicy::Unlimited;
        let mut pair = TimerPair::new(config);
        pair.activate(Piece::Black);
        for _ in 0..100 {
            assert!(pair.tick(Piece::Black).is_empty());
        }
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 5);
    }

    #[test]
    fn test_pause_budget_exhaustion_resumes() {
        let mut pair = TimerPair::new(short_config());
        pair.activate(Piece::Black);
        pair.pause(Piece::Black);
        assert_eq!(*pair.state(Piece::Black).phase(), TimerPhase::Paused);
        pair.tick(Piece::Black); // budget 1, no time drained
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 5);
        pair.tick(Piece::Black); // budget 0 - resumes
        assert_eq!(*pair.state(Piece::Black).phase(), TimerPhase::Active);
        assert_eq!(*pair.state(Piece::Black).total_paused_secs(), 2);
        pair.tick(Piece::Black);
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 4);
    }

    #[test]
    fn test_pause_only_affects_running_clock() {
        let mut pair = TimerPair::new(short_config());
        pair.activate(Piece::Black);
        pair.pause(Piece::White);
        assert_eq!(*pair.state(Piece::White).phase(), TimerPhase::Idle);
    }

    #[test]
    fn test_activate_swaps_running_clock() {
        let mut pair = TimerPair::new(short_config());
        pair.activate(Piece::Black);
        pair.activate(Piece::White);
        assert_eq!(*pair.state(Piece::Black).phase(), TimerPhase::Idle);
        assert_eq!(*pair.state(Piece::White).phase(), TimerPhase::Active);
        // Only the running clock drains.
        pair.tick(Piece::White);
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 5);
        assert_eq!(*pair.state(Piece::White).remaining_secs(), 4);
    }

    #[test]
    fn test_refill_clears_expiry() {
        let mut pair = TimerPair::new(short_config());
        pair.activate(Piece::Black);
        for _ in 0..5 {
            pair.tick(Piece::Black);
        }
        assert_eq!(*pair.state(Piece::Black).phase(), TimerPhase::Expired);
        pair.refill(Piece::Black);
        assert_eq!(*pair.state(Piece::Black).phase(), TimerPhase::Idle);
        assert_eq!(*pair.state(Piece::Black).remaining_secs(), 5);
    }
}
