//! UDP client loop: console commands in, state broadcasts out

use crate::game::{ClientGameState, PhaseView};
use crate::input::{parse_command, Command, InputManager, HELP_TEXT};
use crate::rendering::{render_frame, render_status};
use log::{debug, error, info, warn};
use shared::{Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::interval;

const INPUT_RESEND_INTERVAL: Duration = Duration::from_millis(50);
const RECV_BUFFER_SIZE: usize = 2048;

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    game_state: ClientGameState,
    input: InputManager,
}

impl Client {
    pub async fn new(server_addr: SocketAddr) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(server_addr).await?;

        Ok(Self {
            socket,
            server_addr,
            game_state: ClientGameState::new(),
            input: InputManager::new(),
        })
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), std::io::Error> {
        match bincode::serialize(packet) {
            Ok(data) => {
                self.socket.send(&data).await?;
                Ok(())
            }
            Err(e) => {
                error!("Failed to serialize packet: {}", e);
                Ok(())
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> Option<Packet> {
        match command {
            Command::Click(pos) => {
                if self.game_state.phase != PhaseView::Active {
                    println!("No game in progress.");
                    None
                } else if !self.game_state.is_my_turn() {
                    println!("Not your turn.");
                    None
                } else {
                    Some(Packet::ClickTile { pos })
                }
            }
            // Direction changes are sent right away so the server sees a
            // release even though the resend timer skips zero vectors.
            Command::Move { dx, dy } => {
                self.input.set_direction(dx, dy);
                Some(self.input.next_input_packet())
            }
            Command::Stop => {
                self.input.set_direction(0.0, 0.0);
                Some(self.input.next_input_packet())
            }
            Command::Restart => {
                if matches!(self.game_state.phase, PhaseView::Ended(_)) {
                    Some(Packet::RestartRequest)
                } else {
                    println!("The game has not ended.");
                    None
                }
            }
            Command::Help => {
                println!("{}", HELP_TEXT);
                None
            }
            // Quit is handled by the caller so it can break the loop.
            Command::Quit => None,
        }
    }

    /// Whether a packet changes anything worth redrawing for. Position
    /// snapshots arrive every tick and would flood the console.
    fn should_render(packet: &Packet) -> bool {
        !matches!(packet, Packet::GameState { .. } | Packet::ApplyPush { .. })
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to {}", self.server_addr);
        self.send_packet(&Packet::Connect {
            client_version: PROTOCOL_VERSION,
        })
        .await?;

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut input_timer = interval(INPUT_RESEND_INTERVAL);

        println!("Type 'help' for commands.");

        loop {
            tokio::select! {
                result = self.socket.recv(&mut buf) => {
                    let len = result?;
                    match bincode::deserialize::<Packet>(&buf[..len]) {
                        Ok(packet) => {
                            let disconnected = matches!(packet, Packet::Disconnected { .. });
                            let redraw = Self::should_render(&packet);
                            self.game_state.apply_packet(packet);

                            if disconnected {
                                let reason = self
                                    .game_state
                                    .disconnect_reason
                                    .as_deref()
                                    .unwrap_or("unknown");
                                println!("Disconnected by server: {}", reason);
                                break;
                            }
                            if redraw {
                                println!("\n{}", render_frame(&self.game_state));
                            }
                        }
                        Err(e) => warn!("Discarding malformed packet: {}", e),
                    }
                }

                line = lines.next_line() => {
                    let line = match line? {
                        Some(line) => line,
                        None => break, // stdin closed
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_command(&line) {
                        Ok(Command::Quit) => {
                            self.send_packet(&Packet::Disconnect).await?;
                            info!("Disconnecting");
                            break;
                        }
                        Ok(command) => {
                            if let Some(packet) = self.handle_command(command) {
                                self.send_packet(&packet).await?;
                            }
                        }
                        Err(e) => {
                            println!("{}", e);
                            println!("Type 'help' for commands.");
                        }
                    }
                }

                _ = input_timer.tick() => {
                    if self.game_state.movement_allowed() && self.input.has_movement() {
                        let packet = self.input.next_input_packet();
                        debug!("Sending input: {:?}", packet);
                        self.send_packet(&packet).await?;
                    }
                }
            }
        }

        println!("{}", render_status(&self.game_state));
        Ok(())
    }
}
