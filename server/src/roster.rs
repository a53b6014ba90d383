//! Participant admission and roster tracking
//!
//! The roster is the single record of who is connected. It enforces the
//! two-player cap at admission time, assigns seats by join order (the first
//! admitted identity becomes Player 1), and tracks per-participant activity
//! so silent connections can be evicted. Only the server main loop mutates
//! it, so every readiness evaluation sees one consistent snapshot.

use log::info;
use shared::{PlayerRole, MAX_PLAYERS};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Why a join request was turned away. The caller replies with the reason
/// and closes the connection; the server itself keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    ServerFull,
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionError::ServerFull => write!(f, "server is full"),
        }
    }
}

impl std::error::Error for AdmissionError {}

/// A connected identity holding one of the two seats.
#[derive(Debug)]
pub struct Participant {
    pub id: u32,
    pub role: PlayerRole,
    pub addr: SocketAddr,
    pub last_seen: Instant,
}

impl Participant {
    fn new(id: u32, role: PlayerRole, addr: SocketAddr) -> Self {
        Self {
            id,
            role,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

pub struct Roster {
    participants: HashMap<u32, Participant>,
    next_id: u32,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            participants: HashMap::new(),
            next_id: 1,
        }
    }

    /// Admission gate: approves the join iff a seat is free.
    ///
    /// The free seat is whichever role no current participant holds, so a
    /// reconnecting player can take over Player 1 if that seat opened up.
    pub fn admit(&mut self, addr: SocketAddr) -> Result<(u32, PlayerRole), AdmissionError> {
        if self.participants.len() >= MAX_PLAYERS {
            return Err(AdmissionError::ServerFull);
        }

        let role = if self
            .participants
            .values()
            .any(|p| p.role == PlayerRole::Player1)
        {
            PlayerRole::Player2
        } else {
            PlayerRole::Player1
        };

        let id = self.next_id;
        self.next_id += 1;

        info!("Participant {} admitted from {} as {}", id, addr, role.label());
        self.participants.insert(id, Participant::new(id, role, addr));

        Ok((id, role))
    }

    pub fn remove(&mut self, id: &u32) -> bool {
        if let Some(participant) = self.participants.remove(id) {
            info!("Participant {} ({}) left", participant.id, participant.role.label());
            true
        } else {
            false
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.participants
            .iter()
            .find(|(_, p)| p.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn role_of(&self, id: u32) -> Option<PlayerRole> {
        self.participants.get(&id).map(|p| p.role)
    }

    pub fn addr_of(&self, id: u32) -> Option<SocketAddr> {
        self.participants.get(&id).map(|p| p.addr)
    }

    /// Marks the participant as recently active.
    pub fn refresh(&mut self, id: u32) {
        if let Some(participant) = self.participants.get_mut(&id) {
            participant.last_seen = Instant::now();
        }
    }

    /// Evicts participants that went silent. Returns the removed ids so the
    /// caller can tear down their agents and re-evaluate readiness.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .participants
            .iter()
            .filter(|(_, p)| p.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for id in &timed_out {
            self.remove(id);
        }

        timed_out
    }

    /// All participant ids and addresses, for broadcasting.
    pub fn addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.participants
            .iter()
            .map(|(id, p)| (*id, p.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}
