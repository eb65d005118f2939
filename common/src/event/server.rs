//! Events the core emits back through the transport.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RoomConfig;
use crate::players::{Player, PlayerStats, RoomPhase};
use crate::Card;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // -- lobby --
    RoomCreated {
        room_id: String,
        config: RoomConfig,
        players: Vec<Player>,
    },
    PlayerJoined {
        room_id: String,
        player: Player,
        players: Vec<Player>,
    },
    PlayerLeft {
        room_id: String,
        player_id: Uuid,
        players: Vec<Player>,
    },
    VotesConfig {
        room_id: String,
        votes: HashMap<String, RoomConfig>,
    },
    RoomError {
        message: String,
    },
    StartGame {
        room_id: String,
        config: RoomConfig,
        players: Vec<Player>,
    },
    /// Reply to a `get_room_state` request.
    RoomState {
        room_id: String,
        config: RoomConfig,
        players: Vec<Player>,
        game_state: RoomPhase,
    },

    // -- game --
    GameInitialized {
        players: Vec<Player>,
        hands: HashMap<Uuid, Vec<Card>>,
        pickup_cards: Vec<Card>,
        current_player_id: Uuid,
        /// Milliseconds before the first turn timer arms.
        start_delay: u64,
    },
    NewRound {
        round: u32,
        hands: HashMap<Uuid, Vec<Card>>,
        pickup_cards: Vec<Card>,
        current_player_id: Uuid,
        players_stats: HashMap<Uuid, PlayerStats>,
        start_delay: u64,
    },
    TurnStarted {
        current_player_id: Uuid,
        /// Seconds until the turn times out.
        time_remaining: u64,
    },
    PlayerDrew {
        player_id: Uuid,
        source: DrawSource,
        hands: HashMap<Uuid, Vec<Card>>,
        pickup_cards: Vec<Card>,
        /// The card gained, when the source yields one (deck and pickup).
        card: Option<Card>,
        /// Positions of the discarded cards within the prior sorted hand.
        selected_cards_positions: Vec<usize>,
        /// Hand size before the discard.
        amount_before: usize,
        /// Whose turn it is after this draw.
        current_player_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        slap_down_active_for: Option<Uuid>,
    },
    DeckReshuffled,
    RoundEnded {
        winner_id: Uuid,
        players_stats: HashMap<Uuid, PlayerStats>,
        yaniv_caller: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        assaf_caller: Option<Uuid>,
        player_hands: HashMap<Uuid, Vec<Card>>,
        round_players: Vec<Uuid>,
        /// Signed score increments per player, the ×50 reduction listed
        /// as its own `-50` entry.
        players_round_score: HashMap<Uuid, Vec<i32>>,
        /// Players eliminated by this round, earliest first.
        losers: Vec<Uuid>,
    },
    /// A human seat was eliminated while bots play on.
    HumanLost,
    GameEnded {
        winner: Uuid,
        final_scores: HashMap<Uuid, i32>,
        players_stats: HashMap<Uuid, PlayerStats>,
        /// Final standings, winner first, leavers last.
        places: Vec<Uuid>,
    },
    SetPlayersStatsData {
        room_id: String,
        player_id: Uuid,
        players_stats: HashMap<Uuid, PlayerStats>,
    },
    GameError {
        message: String,
    },
}

/// How the drawing player replaced their discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawSource {
    Deck,
    Pickup,
    Slap,
}
