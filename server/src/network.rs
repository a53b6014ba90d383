//! Server network layer: UDP plumbing and the authority event loop
//!
//! All canonical state lives here behind a single `tokio::select!` loop:
//! admission, click evaluation, turn switching, score updates and restarts
//! all execute sequentially on this loop, so observers can never see a
//! half-applied click. The countdown runs as a separate aborted-on-restart
//! timer task whose ticks are re-validated against a generation number
//! before they can transition the match.

use crate::discovery;
use crate::grid::{ClickOutcome, GridState};
use crate::match_state::{MatchController, MatchPhase, RosterEffect, TickEffect};
use crate::player::PlayerAgent;
use crate::roster::Roster;
use crate::utils::{get_timestamp, normalize_vector};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    CollisionKind, GridPos, Packet, PlayerRole, PlayerState, TileColor, PROTOCOL_VERSION,
    PUSH_FORCE_OTHER,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Messages sent from background tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
    },
    /// One second of countdown elapsed. The generation identifies which
    /// countdown the tick belongs to; stale generations are discarded.
    CountdownTick {
        generation: u64,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the main loop to the network sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    BroadcastPacket { packet: Packet },
}

/// Authoritative server owning match, board and player state
pub struct Server {
    socket: Arc<UdpSocket>,
    roster: Arc<RwLock<Roster>>,
    match_ctrl: MatchController,
    grid: GridState,
    agents: HashMap<u32, PlayerAgent>,
    rng: StdRng,
    host_address: String,
    tick_duration: Duration,
    countdown_task: Option<JoinHandle<()>>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let host_address = discovery::resolve_local_address();

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        let mut rng = StdRng::from_entropy();
        let grid = GridState::new(&mut rng);

        Ok(Server {
            socket,
            roster: Arc::new(RwLock::new(Roster::new())),
            match_ctrl: MatchController::new(),
            grid,
            agents: HashMap::new(),
            rng,
            host_address,
            tick_duration,
            countdown_task: None,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Spawns the task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let roster = Arc::clone(&self.roster);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let addrs = {
                            let roster_guard = roster.read().await;
                            roster_guard.addrs()
                        };

                        for (client_id, addr) in addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to participant {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that evicts silent clients
    fn spawn_timeout_checker(&self) {
        let roster = Arc::clone(&self.roster);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut sweep = interval(Duration::from_secs(1));

            loop {
                sweep.tick().await;

                let timed_out = {
                    let mut roster_guard = roster.write().await;
                    roster_guard.check_timeouts(CLIENT_TIMEOUT)
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast(&self, packet: Packet) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Starts a countdown timer task, aborting any previous one first so
    /// two sequences can never tick side by side.
    fn start_countdown(&mut self, generation: u64, remaining: u32) {
        if let Some(task) = self.countdown_task.take() {
            task.abort();
        }

        self.broadcast(Packet::CountdownTick { remaining });

        let server_tx = self.server_tx.clone();
        self.countdown_task = Some(tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if server_tx
                    .send(ServerMessage::CountdownTick { generation })
                    .is_err()
                {
                    break;
                }
            }
        }));
    }

    fn cancel_countdown(&mut self) {
        if let Some(task) = self.countdown_task.take() {
            task.abort();
        }
    }

    /// Resamples the hidden cell, clears feedback and respawns both agents,
    /// then tells every replica to do the same.
    fn reset_board_and_agents(&mut self) {
        self.grid.reset_transients();
        self.grid.place_hidden_object(&mut self.rng);
        for agent in self.agents.values_mut() {
            agent.place_at_spawn();
        }

        self.broadcast(Packet::TilesReset);
        self.broadcast(Packet::MatchReset);
    }

    fn apply_roster_effect(&mut self, effect: RosterEffect) {
        match effect {
            RosterEffect::None => {}
            RosterEffect::StartCountdown {
                generation,
                remaining,
            } => {
                self.start_countdown(generation, remaining);
            }
            RosterEffect::ResetToWaiting {
                cancelled_countdown,
                aborted_match,
            } => {
                self.cancel_countdown();
                if cancelled_countdown {
                    self.broadcast(Packet::CountdownCancelled);
                }
                if aborted_match {
                    info!("Match aborted: a participant left mid-match");
                }

                self.reset_board_and_agents();
                let (player1, player2) = self.match_ctrl.scores();
                self.broadcast(Packet::ScoreUpdate { player1, player2 });
                self.broadcast(Packet::WaitingForPlayers);
            }
        }
    }

    /// Tears down a departed participant's agent and re-evaluates readiness.
    /// The roster entry itself must already be gone.
    async fn handle_departure(&mut self, client_id: u32) {
        self.agents.remove(&client_id);
        let count = {
            let roster = self.roster.read().await;
            roster.len()
        };
        let effect = self.match_ctrl.roster_changed(count);
        self.apply_roster_effect(effect);
    }

    async fn handle_connect(&mut self, client_version: u32, addr: SocketAddr) {
        info!("Join request from {} (version: {})", addr, client_version);

        if client_version != PROTOCOL_VERSION {
            self.send_packet(
                Packet::Disconnected {
                    reason: "protocol version mismatch".to_string(),
                },
                addr,
            );
            return;
        }

        // A reconnect from a known address replaces the old seat.
        let existing = {
            let roster = self.roster.read().await;
            roster.find_by_addr(addr)
        };
        if let Some(existing_id) = existing {
            info!("Replacing existing participant {} from {}", existing_id, addr);
            {
                let mut roster = self.roster.write().await;
                roster.remove(&existing_id);
            }
            self.handle_departure(existing_id).await;
        }

        let admitted = {
            let mut roster = self.roster.write().await;
            roster.admit(addr)
        };

        match admitted {
            Ok((client_id, role)) => {
                self.agents.insert(client_id, PlayerAgent::new(client_id, role));

                self.send_packet(Packet::Connected { client_id, role }, addr);
                self.send_packet(
                    Packet::HostAddress {
                        address: self.host_address.clone(),
                    },
                    addr,
                );

                // Replay the replicated state so the newcomer does not
                // depend on broadcasts it never saw.
                let (player1, player2) = self.match_ctrl.scores();
                self.send_packet(Packet::ScoreUpdate { player1, player2 }, addr);
                self.send_packet(
                    Packet::TurnChanged {
                        turn: self.match_ctrl.current_turn(),
                    },
                    addr,
                );
                match self.match_ctrl.phase() {
                    MatchPhase::WaitingForPlayers => {
                        self.send_packet(Packet::WaitingForPlayers, addr)
                    }
                    MatchPhase::CountingDown { remaining } => {
                        self.send_packet(Packet::CountdownTick { remaining }, addr)
                    }
                    MatchPhase::Active => self.send_packet(
                        Packet::MatchStarted {
                            turn: self.match_ctrl.current_turn(),
                        },
                        addr,
                    ),
                    MatchPhase::Ended => {}
                }

                let count = {
                    let roster = self.roster.read().await;
                    roster.len()
                };
                let effect = self.match_ctrl.roster_changed(count);
                self.apply_roster_effect(effect);
            }
            Err(e) => {
                warn!("Join from {} denied: {}", addr, e);
                self.send_packet(
                    Packet::Disconnected {
                        reason: e.to_string(),
                    },
                    addr,
                );
            }
        }
    }

    fn handle_win(&mut self, winner: PlayerRole) {
        if let Some((player1, player2)) = self.match_ctrl.report_win(winner) {
            info!("{} wins the round ({} - {})", winner.label(), player1, player2);
            self.broadcast(Packet::ScoreUpdate { player1, player2 });
            self.broadcast(Packet::GameEnded { winner });
        }
    }

    fn handle_click(&mut self, client_id: u32, role: PlayerRole, pos: GridPos) {
        if !self.match_ctrl.is_active() {
            debug!("Click from participant {} ignored: match not active", client_id);
            return;
        }
        if role != self.match_ctrl.current_turn() {
            debug!("Click from {} ignored: not their turn", role.label());
            return;
        }

        match self.grid.evaluate_click(pos) {
            None => {
                debug!("Click at ({}, {}) ignored: out of bounds", pos.x, pos.y);
            }
            Some(ClickOutcome::Found) => {
                self.grid.apply_feedback(pos, TileColor::Green);
                self.broadcast(Packet::TilesReset);
                self.broadcast(Packet::TileColorUpdate {
                    pos,
                    color: TileColor::Green,
                });
                self.handle_win(role);
            }
            Some(ClickOutcome::Feedback(color)) => {
                self.grid.apply_feedback(pos, color);
                self.broadcast(Packet::TilesReset);
                self.broadcast(Packet::TileColorUpdate { pos, color });

                let turn = self.match_ctrl.switch_turn();
                self.broadcast(Packet::TurnChanged { turn });
            }
        }
    }

    fn handle_collision(&mut self, client_id: u32, role: PlayerRole, kind: CollisionKind) {
        match kind {
            CollisionKind::Hazard => {
                if self.match_ctrl.is_active() {
                    info!("{} hit the hazard region", role.label());
                    self.handle_win(role.opponent());
                } else {
                    debug!("Hazard report from {} ignored: match not active", client_id);
                }
            }
            CollisionKind::PlayerContact { target, dir } => {
                if !self.agents.contains_key(&target) {
                    debug!("Push request for unknown agent {}", target);
                    return;
                }

                // The push is computed once here and replicated, never
                // recomputed per client.
                let dir = normalize_vector(dir.0, dir.1);
                if let Some(agent) = self.agents.get_mut(&target) {
                    agent.apply_impulse(dir, PUSH_FORCE_OTHER);
                }
                self.broadcast(Packet::ApplyPush {
                    target,
                    dir,
                    force: PUSH_FORCE_OTHER,
                });
            }
        }
    }

    async fn handle_restart(&mut self) {
        let count = {
            let roster = self.roster.read().await;
            roster.len()
        };

        match self.match_ctrl.restart(count) {
            Some(effect) => {
                info!("Restarting match (scores preserved)");
                self.reset_board_and_agents();
                self.apply_roster_effect(effect);
            }
            None => {
                debug!("Restart request ignored: no finished match to restart");
            }
        }
    }

    /// Processes one inbound packet on the main loop.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Connect { client_version } = packet {
            self.handle_connect(client_version, addr).await;
            return;
        }

        // Everything else requires a seat.
        let client_id = {
            let roster = self.roster.read().await;
            roster.find_by_addr(addr)
        };
        let client_id = match client_id {
            Some(id) => id,
            None => {
                debug!("Packet from unknown address {}", addr);
                return;
            }
        };
        let role = {
            let mut roster = self.roster.write().await;
            roster.refresh(client_id);
            roster.role_of(client_id)
        };
        let role = match role {
            Some(role) => role,
            None => return,
        };

        match packet {
            Packet::Input {
                sequence,
                move_x,
                move_y,
            } => {
                // Movement is free-roam but gated solely on the active flag.
                if !self.match_ctrl.is_active() {
                    return;
                }
                if let Some(agent) = self.agents.get_mut(&client_id) {
                    agent.set_input(sequence, move_x, move_y);
                }
            }

            Packet::ClickTile { pos } => {
                self.handle_click(client_id, role, pos);
            }

            Packet::CollisionReport { kind } => {
                self.handle_collision(client_id, role, kind);
            }

            Packet::RestartRequest => {
                self.handle_restart().await;
            }

            Packet::Disconnect => {
                {
                    let mut roster = self.roster.write().await;
                    roster.remove(&client_id);
                }
                self.handle_departure(client_id).await;
            }

            _ => {
                warn!("Unexpected packet type from participant at {}", addr);
            }
        }
    }

    fn handle_countdown_tick(&mut self, generation: u64) {
        match self.match_ctrl.countdown_tick(generation) {
            TickEffect::Stale => {
                debug!("Discarding stale countdown tick (generation {})", generation);
            }
            TickEffect::Progress { remaining } => {
                self.broadcast(Packet::CountdownTick { remaining });
            }
            TickEffect::Activated { turn } => {
                self.cancel_countdown();
                self.broadcast(Packet::MatchStarted { turn });
            }
        }
    }

    /// Advances agent positions and broadcasts the snapshot.
    async fn tick(&mut self, dt: f32) {
        let movement_allowed = self.match_ctrl.is_active();
        for agent in self.agents.values_mut() {
            agent.integrate(dt, movement_allowed);
        }

        let empty = {
            let roster = self.roster.read().await;
            roster.is_empty()
        };
        if empty {
            return;
        }

        let players: Vec<PlayerState> = self.agents.values().map(|a| a.snapshot()).collect();
        self.broadcast(Packet::GameState {
            timestamp: get_timestamp(),
            players,
        });
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Participant {} timed out", client_id);
                            self.handle_departure(client_id).await;
                        },
                        Some(ServerMessage::CountdownTick { generation }) => {
                            self.handle_countdown_tick(generation);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.tick(dt).await;
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::COUNTDOWN_START;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    async fn test_server() -> Server {
        Server::new("127.0.0.1:0", Duration::from_millis(33))
            .await
            .expect("Failed to bind test server")
    }

    async fn connect(server: &mut Server, port: u16) {
        server
            .handle_packet(
                Packet::Connect {
                    client_version: PROTOCOL_VERSION,
                },
                addr(port),
            )
            .await;
    }

    /// Drives the match controller to the active state without waiting for
    /// real countdown seconds. Ticks are fed straight to the handler the way
    /// the timer task would; wrong generations are stale no-ops, so probing
    /// a small range is safe.
    fn force_active(server: &mut Server) {
        assert!(matches!(
            server.match_ctrl.phase(),
            MatchPhase::CountingDown { .. }
        ));

        for generation in 0..8 {
            for _ in 0..COUNTDOWN_START {
                server.handle_countdown_tick(generation);
                if server.match_ctrl.is_active() {
                    return;
                }
            }
        }
        panic!("Countdown never activated the match");
    }

    #[tokio::test]
    async fn test_two_joins_fill_roster_and_start_countdown() {
        let mut server = test_server().await;

        connect(&mut server, 9001).await;
        assert_eq!(server.roster.read().await.len(), 1);
        assert_eq!(server.match_ctrl.phase(), MatchPhase::WaitingForPlayers);

        connect(&mut server, 9002).await;
        assert_eq!(server.roster.read().await.len(), 2);
        assert_eq!(
            server.match_ctrl.phase(),
            MatchPhase::CountingDown {
                remaining: COUNTDOWN_START
            }
        );
        assert_eq!(server.agents.len(), 2);
    }

    #[tokio::test]
    async fn test_third_join_is_denied() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;
        connect(&mut server, 9002).await;
        connect(&mut server, 9003).await;

        assert_eq!(server.roster.read().await.len(), 2);
        assert_eq!(server.agents.len(), 2);
        assert!(server.roster.read().await.find_by_addr(addr(9003)).is_none());
    }

    #[tokio::test]
    async fn test_version_mismatch_is_rejected() {
        let mut server = test_server().await;
        server
            .handle_packet(Packet::Connect { client_version: 99 }, addr(9001))
            .await;

        assert!(server.roster.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_winning_click_scores_and_ends_match() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;
        connect(&mut server, 9002).await;
        force_active(&mut server);
        assert!(server.match_ctrl.is_active());

        let hidden = server.grid.hidden();
        server
            .handle_packet(Packet::ClickTile { pos: hidden }, addr(9001))
            .await;

        assert_eq!(server.match_ctrl.phase(), MatchPhase::Ended);
        assert_eq!(server.match_ctrl.scores(), (1, 0));
    }

    #[tokio::test]
    async fn test_missed_click_switches_turn() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;
        connect(&mut server, 9002).await;
        force_active(&mut server);

        let hidden = server.grid.hidden();
        let miss = GridPos::new((hidden.x + 1) % shared::GRID_SIZE, hidden.y);

        assert_eq!(server.match_ctrl.current_turn(), PlayerRole::Player1);
        server
            .handle_packet(Packet::ClickTile { pos: miss }, addr(9001))
            .await;

        assert!(server.match_ctrl.is_active());
        assert_eq!(server.match_ctrl.current_turn(), PlayerRole::Player2);
        assert_eq!(server.match_ctrl.scores(), (0, 0));
        assert!(server.grid.tile(miss).unwrap().transient.is_some());
    }

    #[tokio::test]
    async fn test_out_of_turn_click_is_ignored() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;
        connect(&mut server, 9002).await;
        force_active(&mut server);

        let hidden = server.grid.hidden();
        // Player 2 clicks the hidden cell on Player 1's turn: no effect.
        server
            .handle_packet(Packet::ClickTile { pos: hidden }, addr(9002))
            .await;

        assert!(server.match_ctrl.is_active());
        assert_eq!(server.match_ctrl.scores(), (0, 0));
        assert_eq!(server.match_ctrl.current_turn(), PlayerRole::Player1);
    }

    #[tokio::test]
    async fn test_click_before_active_is_ignored() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;
        connect(&mut server, 9002).await;
        // Still counting down.

        let hidden = server.grid.hidden();
        server
            .handle_packet(Packet::ClickTile { pos: hidden }, addr(9001))
            .await;

        assert_eq!(server.match_ctrl.scores(), (0, 0));
        assert!(!server.match_ctrl.is_active());
    }

    #[tokio::test]
    async fn test_disconnect_mid_countdown_resets_to_waiting() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;
        connect(&mut server, 9002).await;
        assert!(matches!(
            server.match_ctrl.phase(),
            MatchPhase::CountingDown { .. }
        ));

        server.handle_packet(Packet::Disconnect, addr(9002)).await;

        assert_eq!(server.match_ctrl.phase(), MatchPhase::WaitingForPlayers);
        assert_eq!(server.roster.read().await.len(), 1);
        assert_eq!(server.agents.len(), 1);
        assert_eq!(server.match_ctrl.scores(), (0, 0));
        assert!(server.countdown_task.is_none());
    }

    #[tokio::test]
    async fn test_hazard_report_awards_opponent() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;
        connect(&mut server, 9002).await;
        force_active(&mut server);

        // Player 1 falls onto the hazard: Player 2 wins.
        server
            .handle_packet(
                Packet::CollisionReport {
                    kind: CollisionKind::Hazard,
                },
                addr(9001),
            )
            .await;

        assert_eq!(server.match_ctrl.phase(), MatchPhase::Ended);
        assert_eq!(server.match_ctrl.scores(), (0, 1));
    }

    #[tokio::test]
    async fn test_push_applies_authoritative_impulse() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;
        connect(&mut server, 9002).await;
        force_active(&mut server);

        let target = server.roster.read().await.find_by_addr(addr(9002)).unwrap();
        server
            .handle_packet(
                Packet::CollisionReport {
                    kind: CollisionKind::PlayerContact {
                        target,
                        dir: (2.0, 0.0),
                    },
                },
                addr(9001),
            )
            .await;

        let agent = server.agents.get(&target).unwrap();
        // Direction was normalized before the force was applied.
        assert!((agent.vel_x - PUSH_FORCE_OTHER).abs() < 0.001);
        assert_eq!(agent.vel_y, 0.0);
    }

    #[tokio::test]
    async fn test_restart_after_win_resamples_and_respawns() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;
        connect(&mut server, 9002).await;
        force_active(&mut server);

        let hidden = server.grid.hidden();
        server
            .handle_packet(Packet::ClickTile { pos: hidden }, addr(9001))
            .await;
        assert_eq!(server.match_ctrl.phase(), MatchPhase::Ended);

        server.handle_packet(Packet::RestartRequest, addr(9001)).await;

        // Roster is still full, so the restart goes straight to a countdown.
        assert!(matches!(
            server.match_ctrl.phase(),
            MatchPhase::CountingDown { .. }
        ));
        assert_eq!(server.match_ctrl.scores(), (1, 0));
        assert!(server.grid.tiles().iter().all(|t| t.transient.is_none()));

        for agent in server.agents.values() {
            let (sx, sy) = shared::spawn_position(agent.role);
            assert_eq!(agent.x, sx);
            assert_eq!(agent.y, sy);
        }
    }

    #[tokio::test]
    async fn test_restart_ignored_while_active() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;
        connect(&mut server, 9002).await;
        force_active(&mut server);

        server.handle_packet(Packet::RestartRequest, addr(9001)).await;
        assert!(server.match_ctrl.is_active());
    }

    #[tokio::test]
    async fn test_zero_input_halts_agent() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;
        connect(&mut server, 9002).await;
        force_active(&mut server);

        server
            .handle_packet(
                Packet::Input {
                    sequence: 1,
                    move_x: 1.0,
                    move_y: 0.0,
                },
                addr(9001),
            )
            .await;

        let id = server.roster.read().await.find_by_addr(addr(9001)).unwrap();
        server.agents.get_mut(&id).unwrap().integrate(0.1, true);
        let moved_to = server.agents.get(&id).unwrap().x;
        assert!(moved_to > -2.5);

        // A released key arrives as an explicit zero vector.
        server
            .handle_packet(
                Packet::Input {
                    sequence: 2,
                    move_x: 0.0,
                    move_y: 0.0,
                },
                addr(9001),
            )
            .await;

        server.agents.get_mut(&id).unwrap().integrate(0.1, true);
        assert_eq!(server.agents.get(&id).unwrap().x, moved_to);
    }

    #[tokio::test]
    async fn test_movement_input_ignored_while_waiting() {
        let mut server = test_server().await;
        connect(&mut server, 9001).await;

        server
            .handle_packet(
                Packet::Input {
                    sequence: 1,
                    move_x: 1.0,
                    move_y: 0.0,
                },
                addr(9001),
            )
            .await;

        let id = server.roster.read().await.find_by_addr(addr(9001)).unwrap();
        let agent = server.agents.get_mut(&id).unwrap();
        let before = agent.x;
        agent.integrate(1.0, true);
        assert_eq!(agent.x, before);
    }
}
