//! Console command parsing and movement input tracking

use shared::{GridPos, Packet};
use std::fmt;

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Click(GridPos),
    Move { dx: f32, dy: f32 },
    Stop,
    Restart,
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Empty,
    UnknownCommand(String),
    BadArguments(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::UnknownCommand(cmd) => write!(f, "unknown command: {}", cmd),
            ParseError::BadArguments(usage) => write!(f, "usage: {}", usage),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses one line of console input.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().ok_or(ParseError::Empty)?;

    match cmd.to_ascii_lowercase().as_str() {
        "click" => {
            let x = parts
                .next()
                .and_then(|s| s.parse::<i32>().ok())
                .ok_or_else(|| ParseError::BadArguments("click <x> <y>".to_string()))?;
            let y = parts
                .next()
                .and_then(|s| s.parse::<i32>().ok())
                .ok_or_else(|| ParseError::BadArguments("click <x> <y>".to_string()))?;
            Ok(Command::Click(GridPos::new(x, y)))
        }
        "move" => {
            let dx = parts
                .next()
                .and_then(|s| s.parse::<f32>().ok())
                .ok_or_else(|| ParseError::BadArguments("move <dx> <dy>".to_string()))?;
            let dy = parts
                .next()
                .and_then(|s| s.parse::<f32>().ok())
                .ok_or_else(|| ParseError::BadArguments("move <dx> <dy>".to_string()))?;
            Ok(Command::Move { dx, dy })
        }
        "stop" => Ok(Command::Stop),
        "restart" => Ok(Command::Restart),
        "quit" | "exit" => Ok(Command::Quit),
        "help" => Ok(Command::Help),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}

pub const HELP_TEXT: &str = "\
Commands:
  click <x> <y>   click a tile (your turn only)
  move <dx> <dy>  set movement direction
  stop            stop moving
  restart         request a rematch after the game ends
  help            show this help
  quit            disconnect and exit";

/// Tracks the current movement direction and stamps outgoing input packets
/// with a monotonically increasing sequence number.
#[derive(Debug, Default)]
pub struct InputManager {
    sequence: u32,
    current: (f32, f32),
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_direction(&mut self, dx: f32, dy: f32) {
        self.current = (dx, dy);
    }

    pub fn direction(&self) -> (f32, f32) {
        self.current
    }

    pub fn has_movement(&self) -> bool {
        self.current.0 != 0.0 || self.current.1 != 0.0
    }

    pub fn next_input_packet(&mut self) -> Packet {
        self.sequence += 1;
        Packet::Input {
            sequence: self.sequence,
            move_x: self.current.0,
            move_y: self.current.1,
        }
    }
}
