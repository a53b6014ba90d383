//! # Find-the-Object Game Client
//!
//! Console client for the two-player hidden-object game. All game state
//! lives on the server; this crate keeps a read-only replica that is updated
//! from broadcasts ([`game`]), parses console commands into packets
//! ([`input`]), renders the replica as text ([`rendering`]), and runs the
//! UDP event loop tying them together ([`network`]).

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
