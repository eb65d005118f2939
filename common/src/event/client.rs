//! Commands the transport delivers into the core, one per client request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RoomConfig;
use crate::{Card, Difficulty};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    CreateRoom {
        nick_name: String,
        config: RoomConfig,
    },
    JoinRoom {
        room_id: String,
        nick_name: String,
    },
    QuickGame {
        nick_name: String,
    },
    SetQuickGameConfig {
        room_id: String,
        nick_name: String,
        config: RoomConfig,
    },
    CreateBotRoom {
        nick_name: String,
        config: RoomConfig,
        difficulties: Vec<Difficulty>,
    },
    LeaveRoom {
        nick_name: String,
        is_admin: bool,
    },
    StartPrivateGame {
        room_id: String,
    },
    GetRoomState {
        room_id: String,
    },
    CompleteTurn {
        action: TurnAction,
        selected_cards: Vec<Card>,
    },
    CallYaniv,
    SlapDown {
        card: Card,
    },
    PlayerWantsToPlayAgain {
        player_id: Uuid,
    },
}

/// Where the replacement card comes from after a discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum TurnAction {
    Deck,
    Pickup { pickup_index: usize },
}
