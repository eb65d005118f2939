//! Mutable per-room game state: seats, hands, the draw stack and the pile.
//!
//! While a round runs, the deck, every hand, the pickup pile and the discard
//! heap together partition the 54-card deck. Every mutation below preserves
//! that partition.

use std::collections::HashMap;

use common::config::RoomConfig;
use common::players::{Player, PlayerStats, PlayerStatus};
use common::{sort_hand, Card, Deck, HAND_SIZE};
use tracing::error;
use uuid::Uuid;

pub struct GameState {
    /// Seating order, fixed for the lifetime of the match.
    pub players: Vec<Player>,
    /// Index into `players` of whose turn it is. Always an active seat.
    pub current: usize,
    pub deck: Deck,
    /// The set discarded on the previous turn. Pickups come from its ends.
    pub pickup_cards: Vec<Card>,
    /// Face-down discards superseded from the pile; reshuffled into the
    /// deck when the draw stack empties.
    pub discard_heap: Vec<Card>,
    pub hands: HashMap<Uuid, Vec<Card>>,
    pub stats: HashMap<Uuid, PlayerStats>,
    /// Eliminated players, earliest first.
    pub loser_order: Vec<Uuid>,
    pub round: u32,
    pub config: RoomConfig,
    /// Winner of the previous round; opens the next one.
    pub last_winner: Option<Uuid>,
    /// Whoever assaffed most recently, for the final tie-break.
    pub last_assaf_caller: Option<Uuid>,
}

impl GameState {
    pub fn new(players: Vec<Player>, config: RoomConfig) -> Self {
        let stats = players
            .iter()
            .map(|p| (p.id, PlayerStats::new(p)))
            .collect();
        GameState {
            players,
            current: 0,
            deck: Deck::from_cards(Vec::new()),
            pickup_cards: Vec::new(),
            discard_heap: Vec::new(),
            hands: HashMap::new(),
            stats,
            loser_order: Vec::new(),
            round: 1,
            config,
            last_winner: None,
            last_assaf_caller: None,
        }
    }

    /// Deal a fresh round from `deck`: one card opens the pile, then
    /// [`HAND_SIZE`] cards to every active seat, hands sorted.
    pub fn deal_from(&mut self, deck: Deck) {
        self.deck = deck;
        self.discard_heap.clear();
        self.hands.clear();

        let first = self.deck.draw().expect("a full deck opens every round");
        self.pickup_cards = vec![first];

        let active: Vec<Uuid> = self.active_ids();
        for id in active {
            let mut hand = Vec::with_capacity(HAND_SIZE);
            for _ in 0..HAND_SIZE {
                hand.push(self.deck.draw().expect("a full deck covers every deal"));
            }
            sort_hand(&mut hand);
            self.hands.insert(id, hand);
        }

        self.rotate_to_opener();
    }

    /// The previous round's winner opens; their next active neighbour does
    /// when they are gone. The first round opens at seat zero.
    fn rotate_to_opener(&mut self) {
        self.current = self
            .last_winner
            .and_then(|id| self.players.iter().position(|p| p.id == id))
            .unwrap_or(0);
        if self.status_of(self.players[self.current].id) != PlayerStatus::Active {
            self.advance_turn();
        }
    }

    pub fn status_of(&self, id: Uuid) -> PlayerStatus {
        self.stats
            .get(&id)
            .map(|s| s.status)
            .unwrap_or(PlayerStatus::Leave)
    }

    pub fn set_status(&mut self, id: Uuid, status: PlayerStatus) {
        if let Some(stats) = self.stats.get_mut(&id) {
            stats.status = status;
        }
    }

    pub fn active_ids(&self) -> Vec<Uuid> {
        self.players
            .iter()
            .filter(|p| self.status_of(p.id) == PlayerStatus::Active)
            .map(|p| p.id)
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.active_ids().len()
    }

    pub fn current_player(&self) -> &Player {
        &self.players[self.current]
    }

    pub fn current_player_id(&self) -> Uuid {
        self.players[self.current].id
    }

    /// Move `current` to the next active seat, cyclically.
    pub fn advance_turn(&mut self) {
        for _ in 0..self.players.len() {
            self.current = (self.current + 1) % self.players.len();
            if self.status_of(self.players[self.current].id) == PlayerStatus::Active {
                return;
            }
        }
        error!("no active seat to advance to");
    }

    pub fn hand(&self, id: Uuid) -> &[Card] {
        self.hands.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn hand_len(&self, id: Uuid) -> usize {
        self.hands.get(&id).map(Vec::len).unwrap_or(0)
    }

    /// Whether `selected` is a sub-multiset of the player's hand.
    pub fn hand_contains(&self, id: Uuid, selected: &[Card]) -> bool {
        let Some(hand) = self.hands.get(&id) else {
            return false;
        };
        let mut used = vec![false; hand.len()];
        selected.iter().all(|card| {
            match hand
                .iter()
                .enumerate()
                .position(|(i, c)| c == card && !used[i])
            {
                Some(i) => {
                    used[i] = true;
                    true
                }
                None => false,
            }
        })
    }

    /// Indices of `selected` within the player's current (sorted) hand,
    /// ascending. Duplicates consume distinct positions.
    pub fn positions_in_hand(&self, id: Uuid, selected: &[Card]) -> Vec<usize> {
        let Some(hand) = self.hands.get(&id) else {
            return Vec::new();
        };
        let mut used = vec![false; hand.len()];
        let mut positions = Vec::with_capacity(selected.len());
        for card in selected {
            if let Some(i) = hand
                .iter()
                .enumerate()
                .position(|(i, c)| c == card && !used[i])
            {
                used[i] = true;
                positions.push(i);
            }
        }
        positions.sort_unstable();
        positions
    }

    pub fn remove_from_hand(&mut self, id: Uuid, selected: &[Card]) {
        let Some(hand) = self.hands.get_mut(&id) else {
            error!(%id, "removing cards from a missing hand");
            return;
        };
        for card in selected {
            match hand.iter().position(|c| c == card) {
                Some(i) => {
                    hand.remove(i);
                }
                None => error!(%id, %card, "selected card missing from hand"),
            }
        }
    }

    pub fn add_to_hand(&mut self, id: Uuid, card: Card) {
        let Some(hand) = self.hands.get_mut(&id) else {
            error!(%id, "adding a card to a missing hand");
            return;
        };
        hand.push(card);
        sort_hand(hand);
    }

    /// Replace the pile with a freshly discarded set, retiring the old pile
    /// to the heap.
    pub fn replace_pile(&mut self, replacement: Vec<Card>) {
        self.discard_heap.append(&mut self.pickup_cards);
        self.pickup_cards = replacement;
    }

    /// Take the pile card at `index`, retire the rest of the old pile, and
    /// install the replacement set.
    pub fn take_from_pile(&mut self, index: usize, replacement: Vec<Card>) -> Card {
        let taken = self.pickup_cards.remove(index);
        self.discard_heap.append(&mut self.pickup_cards);
        self.pickup_cards = replacement;
        taken
    }

    /// Pop the next card, reshuffling the heap back into the deck first when
    /// the draw stack is empty. The bool reports that a reshuffle happened.
    pub fn draw_card(&mut self) -> Option<(Card, bool)> {
        let mut reshuffled = false;
        if self.deck.is_empty() {
            if self.discard_heap.is_empty() {
                return None;
            }
            let mut deck = Deck::from_cards(std::mem::take(&mut self.discard_heap));
            deck.shuffle(&mut rand::thread_rng());
            self.deck = deck;
            reshuffled = true;
        }
        self.deck.draw().map(|card| (card, reshuffled))
    }

    /// Retire a departing player's hand to the heap.
    pub fn discard_hand(&mut self, id: Uuid) {
        if let Some(hand) = self.hands.remove(&id) {
            self.discard_heap.extend(hand);
        }
    }

    /// Drop leavers and reset everyone else for a rematch.
    pub fn reset_match(&mut self) {
        let leavers: Vec<Uuid> = self
            .stats
            .iter()
            .filter(|(_, s)| s.status == PlayerStatus::Leave)
            .map(|(id, _)| *id)
            .collect();
        self.players.retain(|p| !leavers.contains(&p.id));
        self.stats.retain(|id, _| !leavers.contains(id));
        for stats in self.stats.values_mut() {
            stats.status = PlayerStatus::Active;
            stats.score = 0;
        }
        self.loser_order.clear();
        self.round = 1;
        self.current = 0;
        self.last_winner = None;
        self.last_assaf_caller = None;
    }

    /// Total cards tracked across the deck, hands, pile and heap.
    pub fn cards_in_play(&self) -> usize {
        self.deck.len()
            + self.pickup_cards.len()
            + self.discard_heap.len()
            + self.hands.values().map(Vec::len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use common::Suit;
    use uuid::Uuid;

    use super::*;

    fn state_with_two() -> GameState {
        let players = vec![
            Player::human(Uuid::from_u128(1), "a", 0),
            Player::human(Uuid::from_u128(2), "b", 1),
        ];
        let mut state = GameState::new(players, RoomConfig::default());
        state.deal_from(Deck::full());
        state
    }

    #[test]
    fn dealing_partitions_the_deck() {
        let state = state_with_two();
        assert_eq!(state.cards_in_play(), common::DECK_SIZE);
        assert_eq!(state.pickup_cards.len(), 1);
        assert_eq!(state.hand_len(Uuid::from_u128(1)), HAND_SIZE);
        assert_eq!(state.hand_len(Uuid::from_u128(2)), HAND_SIZE);
    }

    #[test]
    fn taking_from_the_pile_retires_the_rest() {
        let mut state = state_with_two();
        state.pickup_cards = vec![
            Card::new(Suit::Hearts, 3),
            Card::new(Suit::Hearts, 4),
            Card::new(Suit::Hearts, 5),
        ];
        let taken = state.take_from_pile(2, vec![Card::new(Suit::Clubs, 9)]);
        assert_eq!(taken, Card::new(Suit::Hearts, 5));
        assert_eq!(state.pickup_cards, vec![Card::new(Suit::Clubs, 9)]);
        assert!(state.discard_heap.contains(&Card::new(Suit::Hearts, 3)));
        assert!(state.discard_heap.contains(&Card::new(Suit::Hearts, 4)));
    }

    #[test]
    fn drawing_from_an_empty_deck_recycles_the_heap() {
        let mut state = state_with_two();
        let drained: Vec<Card> = std::iter::from_fn(|| state.deck.draw()).collect();
        state.discard_heap.extend(drained);

        let (card, reshuffled) = state.draw_card().unwrap();
        assert!(reshuffled);
        assert!(!state.discard_heap.iter().any(|c| *c == card));
    }

    #[test]
    fn duplicate_selections_consume_distinct_positions() {
        let mut state = state_with_two();
        let id = Uuid::from_u128(1);
        state.hands.insert(
            id,
            vec![
                Card::new(Suit::Spades, 4),
                Card::new(Suit::Hearts, 4),
                Card::new(Suit::Clubs, 7),
            ],
        );
        let positions = state.positions_in_hand(
            id,
            &[Card::new(Suit::Hearts, 4), Card::new(Suit::Spades, 4)],
        );
        assert_eq!(positions, vec![0, 1]);
        assert!(state.hand_contains(
            id,
            &[Card::new(Suit::Spades, 4), Card::new(Suit::Clubs, 7)]
        ));
        assert!(!state.hand_contains(
            id,
            &[Card::new(Suit::Clubs, 7), Card::new(Suit::Clubs, 7)]
        ));
    }
}
