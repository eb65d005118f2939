//! The authoritative multi-room server core.
//!
//! [`Server`] is the inbound boundary: the transport attributes each
//! decoded command to a connected player and hands it over; outbound
//! events stream back through the per-player receiver obtained at
//! registration. Rooms run as independent actor tasks; the registry maps
//! are the only state shared between them.

pub mod channels;
pub mod config;
pub mod error;
pub mod registry;
pub mod room;

use std::sync::Arc;
use std::time::Duration;

use common::config::RoomConfig;
use common::event::client::Command;
use common::event::server::Event;
use common::players::Player;
use common::Difficulty;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use channels::Channels;
use config::Config;
use error::RoomError;
use registry::{Registry, RoomHandle};
use room::{Room, RoomCommand, RoomStatus};

#[derive(Clone)]
pub struct Server {
    channels: Channels,
    registry: Arc<Registry>,
    config: Arc<Config>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Server {
            channels: Channels::default(),
            registry: Arc::new(Registry::default()),
            config: Arc::new(config),
        }
    }

    pub fn from_config() -> Self {
        let config = match config::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                error!("error loading config: {e}");
                info!("using default config");
                Config::default()
            }
        };
        Self::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a connection, returning the stream of events addressed to
    /// it.
    pub fn register_client(&self, player_id: Uuid) -> mpsc::Receiver<Event> {
        self.channels.register(player_id)
    }

    /// A connection dropped: silence its queue and leave whatever room it
    /// was in.
    pub async fn disconnect(&self, player_id: Uuid) {
        self.channels.remove(player_id);
        let tx = self
            .registry
            .room_of(player_id)
            .and_then(|room_id| self.registry.room_sender(&room_id));
        if let Some(tx) = tx {
            let _ = tx
                .send(RoomCommand::Leave {
                    player_id,
                    is_admin: false,
                })
                .await;
        }
    }

    /// The inbound command boundary.
    pub async fn handle(&self, player_id: Uuid, command: Command) {
        match command {
            Command::CreateRoom { nick_name, config } => {
                self.create(player_id, nick_name, config, false, Vec::new())
                    .await;
            }
            Command::JoinRoom { room_id, nick_name } => {
                let Some(tx) = self.registry.room_sender(&room_id) else {
                    return self.room_error(player_id, RoomError::NotFound(room_id)).await;
                };
                self.leave_current(player_id).await;
                let player = Player::human(player_id, nick_name, 0);
                let _ = tx.send(RoomCommand::Join { player }).await;
            }
            Command::QuickGame { nick_name } => {
                if let Some(tx) = self.registry.open_public_room() {
                    self.leave_current(player_id).await;
                    let player = Player::human(player_id, nick_name, 0);
                    let _ = tx.send(RoomCommand::Join { player }).await;
                } else {
                    self.create(player_id, nick_name, RoomConfig::default(), true, Vec::new())
                        .await;
                }
            }
            Command::SetQuickGameConfig {
                room_id,
                nick_name,
                config,
            } => {
                let Some(tx) = self.registry.room_sender(&room_id) else {
                    return self.room_error(player_id, RoomError::NotFound(room_id)).await;
                };
                let _ = tx.send(RoomCommand::Vote { nick_name, config }).await;
            }
            Command::CreateBotRoom {
                nick_name,
                config,
                difficulties,
            } => {
                self.create(player_id, nick_name, config, false, difficulties)
                    .await;
            }
            Command::LeaveRoom { is_admin, .. } => {
                self.forward(
                    player_id,
                    RoomCommand::Leave {
                        player_id,
                        is_admin,
                    },
                )
                .await;
            }
            Command::StartPrivateGame { room_id } => {
                let Some(tx) = self.registry.room_sender(&room_id) else {
                    return self.room_error(player_id, RoomError::NotFound(room_id)).await;
                };
                let _ = tx.send(RoomCommand::StartPrivate { player_id }).await;
            }
            Command::GetRoomState { room_id } => {
                let Some(tx) = self.registry.room_sender(&room_id) else {
                    return self.room_error(player_id, RoomError::NotFound(room_id)).await;
                };
                let _ = tx.send(RoomCommand::GetState { player_id }).await;
            }
            Command::CompleteTurn {
                action,
                selected_cards,
            } => {
                self.forward(
                    player_id,
                    RoomCommand::Turn {
                        player_id,
                        action,
                        selected_cards,
                    },
                )
                .await;
            }
            Command::CallYaniv => {
                self.forward(player_id, RoomCommand::CallYaniv { player_id })
                    .await;
            }
            Command::SlapDown { card } => {
                self.forward(player_id, RoomCommand::SlapDown { player_id, card })
                    .await;
            }
            Command::PlayerWantsToPlayAgain { .. } => {
                self.forward(player_id, RoomCommand::PlayAgain { player_id })
                    .await;
            }
        }
    }

    /// Open a room and seat the creator.
    async fn create(
        &self,
        creator: Uuid,
        nick_name: String,
        config: RoomConfig,
        public: bool,
        bots: Vec<Difficulty>,
    ) {
        self.leave_current(creator).await;

        let bot_think = Duration::from_millis(self.config.bot_think_millis);
        let channels = self.channels.clone();
        let registry = self.registry.clone();
        let tx = {
            let mut sender = None;
            registry.clone().insert_room(|code| {
                let status = Arc::new(RoomStatus::default());
                let room = Room::new(
                    code,
                    public,
                    config,
                    bots,
                    bot_think,
                    channels,
                    registry,
                    status.clone(),
                );
                let tx = room.spawn();
                sender = Some(tx.clone());
                RoomHandle { tx, status, public }
            });
            sender.expect("insert_room always builds the handle")
        };

        let player = Player::human(creator, nick_name, 0);
        let _ = tx.send(RoomCommand::Join { player }).await;
    }

    /// Route a command to the room the player currently occupies.
    async fn forward(&self, player_id: Uuid, command: RoomCommand) {
        let tx = self
            .registry
            .room_of(player_id)
            .and_then(|room_id| self.registry.room_sender(&room_id));
        match tx {
            Some(tx) => {
                let _ = tx.send(command).await;
            }
            None => self.room_error(player_id, RoomError::NotInRoom).await,
        }
    }

    /// Make the player leave their current room before joining elsewhere.
    async fn leave_current(&self, player_id: Uuid) {
        let tx = self
            .registry
            .room_of(player_id)
            .and_then(|room_id| self.registry.room_sender(&room_id));
        if let Some(tx) = tx {
            let _ = tx
                .send(RoomCommand::Leave {
                    player_id,
                    is_admin: false,
                })
                .await;
        }
    }

    async fn room_error(&self, player_id: Uuid, err: RoomError) {
        self.channels
            .send(
                player_id,
                Event::RoomError {
                    message: err.to_string(),
                },
            )
            .await;
    }
}
