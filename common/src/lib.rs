pub mod combos;
pub mod config;
pub mod event;
pub mod players;
pub mod stream;

use std::fmt;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Cards dealt to each player at the start of a round.
pub const HAND_SIZE: usize = 5;

/// 52 standard cards plus the two jokers.
pub const DECK_SIZE: usize = 54;

/// Rank reserved for jokers. The suit is kept only to tell the two apart.
pub const JOKER_RANK: u8 = 0;

/// Suits in hand-sorting order: ties on rank break in this declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

pub const SUITS: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

/// A single card. `rank` runs 1 (ace) to 13 (king), with [`JOKER_RANK`] for
/// the two jokers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: u8,
}

impl Card {
    pub const fn new(suit: Suit, rank: u8) -> Self {
        Card { suit, rank }
    }

    pub const fn joker(suit: Suit) -> Self {
        Card {
            suit,
            rank: JOKER_RANK,
        }
    }

    pub const fn is_joker(&self) -> bool {
        self.rank == JOKER_RANK
    }

    /// Point value towards a hand total: joker 0, ace 1, face value up to
    /// ten, court cards 10.
    pub const fn value(&self) -> u32 {
        match self.rank {
            JOKER_RANK => 0,
            r @ 1..=10 => r as u32,
            _ => 10,
        }
    }
}

impl PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Card {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.rank, self.suit).cmp(&(other.rank, other.suit))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_joker() {
            return write!(f, "Joker");
        }
        let rank = match self.rank {
            1 => "A".to_string(),
            11 => "J".to_string(),
            12 => "Q".to_string(),
            13 => "K".to_string(),
            r => r.to_string(),
        };
        let suit = match self.suit {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        };
        write!(f, "{rank}{suit}")
    }
}

/// Sum of card values in a hand.
pub fn hand_value(cards: &[Card]) -> u32 {
    cards.iter().map(Card::value).sum()
}

/// Canonical hand order: ascending rank, suit tiebreak in [`Suit`] order.
pub fn sort_hand(cards: &mut [Card]) {
    cards.sort_unstable();
}

/// The draw stack. A LIFO pile over a `Vec`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck(Vec<Card>);

impl Deck {
    /// The full 54-card deck, unshuffled.
    pub fn full() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in SUITS {
            for rank in 1..=13 {
                cards.push(Card::new(suit, rank));
            }
        }
        cards.push(Card::joker(Suit::Spades));
        cards.push(Card::joker(Suit::Hearts));
        Deck(cards)
    }

    /// Rebuild the draw stack from recovered discards.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Deck(cards)
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.0.pop()
    }

    pub fn shuffle<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        self.0.shuffle(rng);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn cards(&self) -> &[Card] {
        &self.0
    }
}

/// Bot strength, chosen per seat when creating a bot room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_deck_has_54_cards_and_two_jokers() {
        let deck = Deck::full();
        assert_eq!(deck.len(), DECK_SIZE);
        let jokers = deck.cards().iter().filter(|c| c.is_joker()).count();
        assert_eq!(jokers, 2);
    }

    #[test]
    fn card_values() {
        assert_eq!(Card::joker(Suit::Spades).value(), 0);
        assert_eq!(Card::new(Suit::Hearts, 1).value(), 1);
        assert_eq!(Card::new(Suit::Hearts, 7).value(), 7);
        assert_eq!(Card::new(Suit::Hearts, 10).value(), 10);
        assert_eq!(Card::new(Suit::Hearts, 11).value(), 10);
        assert_eq!(Card::new(Suit::Hearts, 13).value(), 10);
    }

    #[test]
    fn hand_sorts_by_rank_then_suit() {
        let mut hand = vec![
            Card::new(Suit::Clubs, 3),
            Card::new(Suit::Spades, 3),
            Card::new(Suit::Hearts, 1),
            Card::joker(Suit::Hearts),
            Card::new(Suit::Diamonds, 3),
        ];
        sort_hand(&mut hand);
        assert_eq!(
            hand,
            vec![
                Card::joker(Suit::Hearts),
                Card::new(Suit::Hearts, 1),
                Card::new(Suit::Spades, 3),
                Card::new(Suit::Hearts, 3),
                Card::new(Suit::Diamonds, 3),
            ]
        );
    }
}
