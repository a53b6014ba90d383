use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
pub const GRID_SIZE: i32 = 6;
pub const MAX_PLAYERS: usize = 2;
pub const COUNTDOWN_START: u32 = 3;
pub const PLAYER_SPEED: f32 = 3.0;
pub const PUSH_FORCE_SELF: f32 = 1.0;
pub const PUSH_FORCE_OTHER: f32 = 4.0;
pub const PUSH_DAMPING: f32 = 0.9;
pub const WORLD_HALF_EXTENT: f32 = 8.0;

/// Which of the two fixed seats a participant occupies.
/// The first admitted identity takes `Player1`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerRole {
    Player1,
    Player2,
}

impl PlayerRole {
    pub fn opponent(self) -> PlayerRole {
        match self {
            PlayerRole::Player1 => PlayerRole::Player2,
            PlayerRole::Player2 => PlayerRole::Player1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlayerRole::Player1 => "PLAYER 1",
            PlayerRole::Player2 => "PLAYER 2",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            PlayerRole::Player1 => "cyan",
            PlayerRole::Player2 => "magenta",
        }
    }
}

/// A cell coordinate on the 6x6 board.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn in_bounds(self) -> bool {
        (0..GRID_SIZE).contains(&self.x) && (0..GRID_SIZE).contains(&self.y)
    }

    pub fn manhattan_distance(self, other: GridPos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// The full tile palette: checkerboard base colors plus click feedback.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TileColor {
    White,
    Black,
    Yellow,
    Orange,
    Red,
    Green,
}

/// Base color of a tile, fixed at grid generation.
pub fn checkerboard_color(pos: GridPos) -> TileColor {
    if (pos.x + pos.y) % 2 == 0 {
        TileColor::White
    } else {
        TileColor::Black
    }
}

/// Proximity feedback for a non-winning click. The winning cell is checked
/// before this is consulted, so `distance` is always >= 1 here.
pub fn feedback_color(distance: i32) -> TileColor {
    if distance == 1 {
        TileColor::Yellow
    } else if distance > 3 {
        TileColor::Red
    } else {
        TileColor::Orange
    }
}

/// Fixed diagonal spawn corner for a role, in world units centered on the
/// board (half extent of a 6-wide grid).
pub fn spawn_position(role: PlayerRole) -> (f32, f32) {
    let offset = (GRID_SIZE - 1) as f32 / 2.0;
    match role {
        PlayerRole::Player1 => (-offset, offset),
        PlayerRole::Player2 => (offset, -offset),
    }
}

/// Replicated per-player snapshot entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerState {
    pub id: u32,
    pub role: PlayerRole,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
}

/// Collision observed by the owning client, validated by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum CollisionKind {
    /// Contact with the hazard region: a loss for the reporting role.
    Hazard,
    /// Contact with the other player: request an authoritative push.
    PlayerContact { target: u32, dir: (f32, f32) },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // Client -> server
    Connect {
        client_version: u32,
    },
    Input {
        sequence: u32,
        move_x: f32,
        move_y: f32,
    },
    ClickTile {
        pos: GridPos,
    },
    CollisionReport {
        kind: CollisionKind,
    },
    RestartRequest,
    Disconnect,

    // Server -> client. Each broadcast is independently deliverable; replicas
    // must not assume any cross-packet ordering.
    Connected {
        client_id: u32,
        role: PlayerRole,
    },
    Disconnected {
        reason: String,
    },
    HostAddress {
        address: String,
    },
    CountdownTick {
        remaining: u32,
    },
    CountdownCancelled,
    MatchStarted {
        turn: PlayerRole,
    },
    TurnChanged {
        turn: PlayerRole,
    },
    ScoreUpdate {
        player1: u32,
        player2: u32,
    },
    GameEnded {
        winner: PlayerRole,
    },
    MatchReset,
    WaitingForPlayers,
    TilesReset,
    TileColorUpdate {
        pos: GridPos,
        color: TileColor,
    },
    ApplyPush {
        target: u32,
        dir: (f32, f32),
        force: f32,
    },
    GameState {
        timestamp: u64,
        players: Vec<PlayerState>,
    },
}
