//! Turn-based match state machine
//!
//! Owns the match phase, the turn, and both score counters. All transitions
//! run on the server main loop; this module never talks to the network, it
//! returns effects that the caller turns into broadcasts and scheduled
//! tasks.
//!
//! The countdown is the one long-lived operation. Ticks arrive from a
//! spawned timer task tagged with a generation number; the controller bumps
//! the generation whenever a countdown starts or is cancelled, so a tick
//! from a superseded countdown can never fire a stale transition even if its
//! message was already queued when the task was aborted.

use log::{debug, info};
use shared::{PlayerRole, COUNTDOWN_START, MAX_PLAYERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    WaitingForPlayers,
    CountingDown { remaining: u32 },
    Active,
    Ended,
}

/// What the caller must do after a roster-size change or a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterEffect {
    None,
    /// Spawn a fresh countdown task and broadcast the initial remaining
    /// count. Any previous task must be aborted first.
    StartCountdown { generation: u64, remaining: u32 },
    /// Roster dropped below two: back to waiting, scores zeroed.
    ResetToWaiting {
        cancelled_countdown: bool,
        aborted_match: bool,
    },
}

/// Outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEffect {
    /// Tick from a superseded countdown; drop it.
    Stale,
    Progress { remaining: u32 },
    Activated { turn: PlayerRole },
}

pub struct MatchController {
    phase: MatchPhase,
    current_turn: PlayerRole,
    score_p1: u32,
    score_p2: u32,
    countdown_generation: u64,
}

impl MatchController {
    pub fn new() -> Self {
        Self {
            phase: MatchPhase::WaitingForPlayers,
            current_turn: PlayerRole::Player1,
            score_p1: 0,
            score_p2: 0,
            countdown_generation: 0,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == MatchPhase::Active
    }

    pub fn current_turn(&self) -> PlayerRole {
        self.current_turn
    }

    pub fn scores(&self) -> (u32, u32) {
        (self.score_p1, self.score_p2)
    }

    /// Re-evaluates readiness after a connect or disconnect.
    ///
    /// Below two participants everything resets: the countdown (if any) is
    /// invalidated, a running match is aborted without a score change, and
    /// both counters go back to zero. Reaching two participants from the
    /// waiting state starts the countdown.
    pub fn roster_changed(&mut self, count: usize) -> RosterEffect {
        if count < MAX_PLAYERS {
            if self.phase == MatchPhase::WaitingForPlayers {
                return RosterEffect::None;
            }

            let cancelled_countdown = matches!(self.phase, MatchPhase::CountingDown { .. });
            let aborted_match = self.phase == MatchPhase::Active;

            // Invalidate any queued ticks before anything else.
            self.countdown_generation += 1;
            self.phase = MatchPhase::WaitingForPlayers;
            self.current_turn = PlayerRole::Player1;
            self.score_p1 = 0;
            self.score_p2 = 0;

            info!(
                "Roster dropped to {}; waiting for players (countdown cancelled: {}, match aborted: {})",
                count, cancelled_countdown, aborted_match
            );

            RosterEffect::ResetToWaiting {
                cancelled_countdown,
                aborted_match,
            }
        } else if self.phase == MatchPhase::WaitingForPlayers {
            self.start_countdown()
        } else {
            RosterEffect::None
        }
    }

    fn start_countdown(&mut self) -> RosterEffect {
        self.countdown_generation += 1;
        self.phase = MatchPhase::CountingDown {
            remaining: COUNTDOWN_START,
        };
        info!("Both players connected; match starts in {}s", COUNTDOWN_START);

        RosterEffect::StartCountdown {
            generation: self.countdown_generation,
            remaining: COUNTDOWN_START,
        }
    }

    /// Advances the countdown by one second.
    ///
    /// Ticks carrying any generation other than the current one are stale
    /// and ignored, which is what guarantees that at most one countdown
    /// sequence can ever activate the match.
    pub fn countdown_tick(&mut self, generation: u64) -> TickEffect {
        if generation != self.countdown_generation {
            return TickEffect::Stale;
        }

        let remaining = match self.phase {
            MatchPhase::CountingDown { remaining } => remaining,
            _ => return TickEffect::Stale,
        };

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            // No further ticks from this countdown are valid.
            self.countdown_generation += 1;
            self.phase = MatchPhase::Active;
            self.current_turn = PlayerRole::Player1;
            info!("Match active; {} to act", self.current_turn.label());
            TickEffect::Activated {
                turn: self.current_turn,
            }
        } else {
            self.phase = MatchPhase::CountingDown { remaining };
            TickEffect::Progress { remaining }
        }
    }

    /// Flips the turn. Called exactly once per completed non-winning click.
    pub fn switch_turn(&mut self) -> PlayerRole {
        self.current_turn = self.current_turn.opponent();
        self.current_turn
    }

    /// Ends the match with a winner and bumps their counter by one.
    /// Only honored while the match is active; returns the updated scores.
    pub fn report_win(&mut self, winner: PlayerRole) -> Option<(u32, u32)> {
        if self.phase != MatchPhase::Active {
            debug!("Win report for {} ignored outside active match", winner.label());
            return None;
        }

        self.phase = MatchPhase::Ended;
        match winner {
            PlayerRole::Player1 => self.score_p1 += 1,
            PlayerRole::Player2 => self.score_p2 += 1,
        }

        Some((self.score_p1, self.score_p2))
    }

    /// Handles a restart request after a finished match. Scores carry over;
    /// the next phase depends on how many participants are still connected.
    /// Returns `None` when the match is not in the ended state.
    pub fn restart(&mut self, count: usize) -> Option<RosterEffect> {
        if self.phase != MatchPhase::Ended {
            debug!("Restart request ignored in {:?}", self.phase);
            return None;
        }

        self.phase = MatchPhase::WaitingForPlayers;
        self.current_turn = PlayerRole::Player1;

        if count >= MAX_PLAYERS {
            Some(self.start_countdown())
        } else {
            Some(RosterEffect::None)
        }
    }
}

impl Default for MatchController {
    fn default() -> Self {
        Self::new()
    }
}
