//! Text rendering of the replicated game state
//!
//! The board is printed top row first so the screen matches the world's
//! y axis. Base colors are never sent over the wire; only the transient
//! feedback overrides are.

use crate::game::{ClientGameState, PhaseView};
use shared::{GridPos, PlayerRole, TileColor, GRID_SIZE};

fn tile_char(color: TileColor) -> char {
    match color {
        TileColor::White => '.',
        TileColor::Black => '#',
        TileColor::Yellow => 'y',
        TileColor::Orange => 'o',
        TileColor::Red => 'r',
        TileColor::Green => 'G',
    }
}

/// Scores above 99 are displayed capped, as "+99".
pub fn format_score(score: u32) -> String {
    if score > 99 {
        "+99".to_string()
    } else {
        score.to_string()
    }
}

pub fn render_board(state: &ClientGameState) -> String {
    let mut out = String::new();
    for y in (0..GRID_SIZE).rev() {
        for x in 0..GRID_SIZE {
            out.push(tile_char(state.tile_color(GridPos::new(x, y))));
            out.push(' ');
        }
        out.pop();
        out.push('\n');
    }
    out
}

pub fn render_status(state: &ClientGameState) -> String {
    let mut lines = Vec::new();

    if let Some(address) = &state.host_address {
        lines.push(format!("HOST - {}", address));
    }
    if let Some(role) = state.role {
        lines.push(format!("You are {}", role.label()));
    }

    lines.push(format!(
        "{}: {}  {}: {}",
        PlayerRole::Player1.label(),
        format_score(state.scores.0),
        PlayerRole::Player2.label(),
        format_score(state.scores.1),
    ));

    let phase_line = match state.phase {
        PhaseView::Connecting => "Connecting...".to_string(),
        PhaseView::Waiting => "Waiting for players...".to_string(),
        PhaseView::Countdown(n) => format!("Game starts in {}...", n),
        PhaseView::Active => format!("{} TURN", state.turn.label()),
        PhaseView::Ended(winner) => format!("{} WON", winner.label()),
    };
    lines.push(phase_line);

    lines.join("\n")
}

/// Full frame: status block, board, and player positions.
pub fn render_frame(state: &ClientGameState) -> String {
    let mut out = render_status(state);
    out.push('\n');
    out.push('\n');
    out.push_str(&render_board(state));
    for player in &state.players {
        out.push_str(&format!(
            "{} at ({:.1}, {:.1})\n",
            player.role.label(),
            player.x,
            player.y
        ));
    }
    out
}
