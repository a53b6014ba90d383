//! # Find-the-Object Game Server
//!
//! Authoritative server for a two-player turn-based hidden-object match.
//! The server owns every piece of canonical game state: the roster of
//! connected participants, the match phase and scores, the 6x6 board with
//! its hidden cell, and both player bodies. Clients hold read-only replicas
//! that are updated exclusively through state broadcasts; no client input is
//! trusted without validation here.
//!
//! ## Module Organization
//!
//! - [`roster`] — admission gate (two seats, join order assigns roles) and
//!   participant tracking with timeout eviction.
//! - [`match_state`] — the match state machine: readiness gating, the
//!   cancellable countdown, turn order, scores and restarts.
//! - [`grid`] — board tiles, hidden-object placement and click outcomes.
//! - [`player`] — server-side player agents: spawns, movement, pushes.
//! - [`discovery`] — host address resolution for display on clients.
//! - [`network`] — UDP plumbing and the single-writer event loop tying the
//!   above together.
//!
//! ## Authority Model
//!
//! One loop processes every inbound packet and every timer event in
//! sequence. Click handling, turn switching and score updates therefore
//! appear atomic to observers: a second click cannot interleave with the
//! tile-reset/feedback/turn-switch of the first. The only long-lived
//! suspended operation is the start-of-match countdown, which runs as a
//! separate timer task that is always aborted before a new one starts and
//! whose ticks are generation-checked before they may transition the match.

pub mod discovery;
pub mod grid;
pub mod match_state;
pub mod network;
pub mod player;
pub mod roster;
pub mod utils;
