use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Difficulty;

/// A seat in a room. Bots carry a synthetic id and a difficulty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub nick_name: String,
    pub avatar_index: u8,
    pub is_bot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

impl Player {
    pub fn human(id: Uuid, nick_name: impl Into<String>, avatar_index: u8) -> Self {
        Player {
            id,
            nick_name: nick_name.into(),
            avatar_index,
            is_bot: false,
            difficulty: None,
        }
    }

    pub fn bot(nick_name: impl Into<String>, avatar_index: u8, difficulty: Difficulty) -> Self {
        Player {
            id: Uuid::new_v4(),
            nick_name: nick_name.into(),
            avatar_index,
            is_bot: true,
            difficulty: Some(difficulty),
        }
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Player {}

/// Where a player stands in the current match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerStatus {
    Active,
    Lost,
    Winner,
    PlayAgain,
    Leave,
}

/// Scoreboard entry broadcast with round and match results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub status: PlayerStatus,
    pub score: i32,
    pub player_name: String,
    pub avatar_index: u8,
}

impl PlayerStats {
    pub fn new(player: &Player) -> Self {
        PlayerStats {
            status: PlayerStatus::Active,
            score: 0,
            player_name: player.nick_name.clone(),
            avatar_index: player.avatar_index,
        }
    }
}

/// Whether a room is still gathering players or already playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    Waiting,
    Started,
}
