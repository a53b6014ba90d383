//! Server-side player agents
//!
//! The authority's copy of each player's body: spawn placement on the fixed
//! diagonal corners, free-roam movement while the match is active, and push
//! impulses dispatched from validated collision reports.

use crate::utils::normalize_vector;
use shared::{
    spawn_position, PlayerRole, PlayerState, PLAYER_SPEED, PUSH_DAMPING, WORLD_HALF_EXTENT,
};

#[derive(Debug, Clone)]
pub struct PlayerAgent {
    pub id: u32,
    pub role: PlayerRole,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    /// Kinematic bodies ignore impulses; the flag survives respawns.
    pub kinematic: bool,
    input: (f32, f32),
    last_input_sequence: u32,
}

impl PlayerAgent {
    pub fn new(id: u32, role: PlayerRole) -> Self {
        let (x, y) = spawn_position(role);
        Self {
            id,
            role,
            x,
            y,
            vel_x: 0.0,
            vel_y: 0.0,
            kinematic: false,
            input: (0.0, 0.0),
            last_input_sequence: 0,
        }
    }

    /// Puts the agent back on its spawn corner with all motion cleared.
    /// Only position and velocities are touched; the kinematic flag keeps
    /// its prior value.
    pub fn place_at_spawn(&mut self) {
        let (x, y) = spawn_position(self.role);
        self.x = x;
        self.y = y;
        self.vel_x = 0.0;
        self.vel_y = 0.0;
        self.input = (0.0, 0.0);
    }

    /// Records the latest movement direction. Datagrams can arrive out of
    /// order; older sequences are dropped.
    pub fn set_input(&mut self, sequence: u32, move_x: f32, move_y: f32) {
        if sequence < self.last_input_sequence {
            return;
        }
        self.last_input_sequence = sequence;
        self.input = (move_x.clamp(-1.0, 1.0), move_y.clamp(-1.0, 1.0));
    }

    pub fn apply_impulse(&mut self, dir: (f32, f32), force: f32) {
        if self.kinematic {
            return;
        }
        self.vel_x += dir.0 * force;
        self.vel_y += dir.1 * force;
    }

    /// Advances the agent one tick. Steering input only applies while
    /// movement is allowed (match active); push velocity always integrates
    /// and decays so an ended match still settles.
    pub fn integrate(&mut self, dt: f32, movement_allowed: bool) {
        if movement_allowed {
            let (nx, ny) = normalize_vector(self.input.0, self.input.1);
            self.x += nx * PLAYER_SPEED * dt;
            self.y += ny * PLAYER_SPEED * dt;
        }

        self.x += self.vel_x * dt;
        self.y += self.vel_y * dt;
        self.vel_x *= PUSH_DAMPING;
        self.vel_y *= PUSH_DAMPING;

        self.x = self.x.clamp(-WORLD_HALF_EXTENT, WORLD_HALF_EXTENT);
        self.y = self.y.clamp(-WORLD_HALF_EXTENT, WORLD_HALF_EXTENT);
    }

    pub fn snapshot(&self) -> PlayerState {
        PlayerState {
            id: self.id,
            role: self.role,
            x: self.x,
            y: self.y,
            vel_x: self.vel_x,
            vel_y: self.vel_y,
        }
    }
}
