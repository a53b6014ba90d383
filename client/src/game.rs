//! Client-side replica of the authoritative game state
//!
//! Every field is a read-only copy pushed from the server. Replicated
//! updates are delivered per-variable with no cross-variable ordering
//! guarantee, so each packet handler touches only its own field and is
//! idempotent: applying the same broadcast twice, or a score update before
//! the matching turn switch, always converges to the same replica.

use log::debug;
use shared::{checkerboard_color, GridPos, Packet, PlayerRole, PlayerState, TileColor};
use std::collections::HashMap;

/// The replica's view of the match phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseView {
    Connecting,
    Waiting,
    Countdown(u32),
    Active,
    Ended(PlayerRole),
}

#[derive(Debug)]
pub struct ClientGameState {
    pub client_id: Option<u32>,
    pub role: Option<PlayerRole>,
    pub phase: PhaseView,
    pub turn: PlayerRole,
    pub scores: (u32, u32),
    /// Transient tile feedback; base colors are derived, not replicated.
    pub transients: HashMap<GridPos, TileColor>,
    pub players: Vec<PlayerState>,
    pub host_address: Option<String>,
    pub disconnect_reason: Option<String>,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            client_id: None,
            role: None,
            phase: PhaseView::Connecting,
            turn: PlayerRole::Player1,
            scores: (0, 0),
            transients: HashMap::new(),
            players: Vec::new(),
            host_address: None,
            disconnect_reason: None,
        }
    }

    /// Applies one replicated update from the server.
    pub fn apply_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id, role } => {
                self.client_id = Some(client_id);
                self.role = Some(role);
                if self.phase == PhaseView::Connecting {
                    self.phase = PhaseView::Waiting;
                }
            }

            Packet::Disconnected { reason } => {
                self.disconnect_reason = Some(reason);
            }

            Packet::HostAddress { address } => {
                self.host_address = Some(address);
            }

            Packet::CountdownTick { remaining } => {
                self.phase = PhaseView::Countdown(remaining);
            }

            Packet::CountdownCancelled | Packet::WaitingForPlayers => {
                self.phase = PhaseView::Waiting;
            }

            Packet::MatchStarted { turn } => {
                self.phase = PhaseView::Active;
                self.turn = turn;
            }

            Packet::TurnChanged { turn } => {
                self.turn = turn;
            }

            Packet::ScoreUpdate { player1, player2 } => {
                self.scores = (player1, player2);
            }

            Packet::GameEnded { winner } => {
                self.phase = PhaseView::Ended(winner);
            }

            Packet::MatchReset => {
                self.transients.clear();
                // The end-of-match panel goes away; readiness broadcasts
                // decide what comes next.
                if matches!(self.phase, PhaseView::Ended(_)) {
                    self.phase = PhaseView::Waiting;
                }
            }

            Packet::TilesReset => {
                self.transients.clear();
            }

            Packet::TileColorUpdate { pos, color } => {
                self.transients.insert(pos, color);
            }

            Packet::ApplyPush { target, dir, force } => {
                // Authoritative push; the next snapshot will confirm it, but
                // nudging the local copy keeps motion smooth in between.
                if let Some(player) = self.players.iter_mut().find(|p| p.id == target) {
                    player.vel_x += dir.0 * force;
                    player.vel_y += dir.1 * force;
                }
            }

            Packet::GameState { players, .. } => {
                self.players = players;
            }

            other => {
                debug!("Ignoring non-replication packet: {:?}", other);
            }
        }
    }

    /// Displayed color of a tile: transient feedback or the checkerboard.
    pub fn tile_color(&self, pos: GridPos) -> TileColor {
        self.transients
            .get(&pos)
            .copied()
            .unwrap_or_else(|| checkerboard_color(pos))
    }

    pub fn is_my_turn(&self) -> bool {
        self.role == Some(self.turn)
    }

    pub fn movement_allowed(&self) -> bool {
        self.phase == PhaseView::Active
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}
