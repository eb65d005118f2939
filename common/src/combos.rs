//! Legality of discarded card combinations.
//!
//! A selection is either a set (one shared rank, jokers standing in for any
//! rank) or a run (one suit, consecutive ranks, jokers filling gaps).

use crate::Card;

/// Minimum length of a run. Kept as a named constant because source material
/// disagrees on whether two-card runs exist at all.
pub const MIN_RUN_LEN: usize = 3;

/// Which end of the last discarded set a card may be slapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlapSide {
    Left,
    Right,
    None,
}

/// Whether `cards` form a legal discard.
///
/// `before_pickup` applies the stricter rule used when the selection
/// initiates a pickup: two distinct cards can never count as a run there.
pub fn is_valid_selection(cards: &[Card], before_pickup: bool) -> bool {
    if cards.is_empty() {
        return false;
    }
    if cards.len() == 1 {
        return true;
    }
    if is_rank_set(cards) {
        return true;
    }
    if before_pickup && cards.len() == 2 {
        return false;
    }
    run_window(cards).is_some()
}

/// Normalised order for a valid selection.
///
/// Sets come back unchanged; runs come back ascending with jokers placed
/// into their gaps, so that "first" and "last" are well defined for pickups
/// and slap-downs. Invalid selections yield `None`.
pub fn sequence_arrangement(cards: &[Card]) -> Option<Vec<Card>> {
    if cards.is_empty() {
        return None;
    }
    if cards.len() == 1 || is_rank_set(cards) {
        return Some(cards.to_vec());
    }

    let (start, naturals) = run_window(cards)?;
    let mut jokers: Vec<Card> = cards.iter().copied().filter(Card::is_joker).collect();

    let mut arranged = Vec::with_capacity(cards.len());
    let mut naturals = naturals.into_iter().peekable();
    for rank in start..start + cards.len() as u8 {
        match naturals.peek() {
            Some(card) if card.rank == rank => {
                arranged.push(naturals.next().expect("peeked"));
            }
            _ => match jokers.pop() {
                Some(joker) => arranged.push(joker),
                None => return None,
            },
        }
    }

    Some(arranged)
}

/// Whether `drawn` extends the last discarded set, and on which side.
///
/// Jokers inside the discarded set disqualify the slap, except for the
/// single-joker-on-joker case (rank equality covers it).
pub fn slap_down_valid_from(last: &[Card], drawn: Card) -> SlapSide {
    match last {
        [] => SlapSide::None,
        [single] => {
            if drawn.rank == single.rank {
                SlapSide::Right
            } else {
                SlapSide::None
            }
        }
        _ => {
            if last.iter().any(Card::is_joker) {
                return SlapSide::None;
            }
            let rank = last[0].rank;
            if last.iter().all(|c| c.rank == rank) {
                return if drawn.rank == rank {
                    SlapSide::Right
                } else {
                    SlapSide::None
                };
            }
            slap_onto_run(last, drawn)
        }
    }
}

/// `index` must name one of the two ends of the pile.
pub fn can_pickup(pile_len: usize, index: usize) -> bool {
    pile_len >= 1 && (index == 0 || index == pile_len - 1)
}

/// True when every non-joker shares one rank. All-joker selections count:
/// jokers substitute any rank.
fn is_rank_set(cards: &[Card]) -> bool {
    let mut naturals = cards.iter().filter(|c| !c.is_joker());
    match naturals.next() {
        Some(first) => naturals.all(|c| c.rank == first.rank),
        None => true,
    }
}

/// The starting rank of the arithmetic progression the cards cover, plus the
/// non-jokers sorted ascending, when `cards` form a feasible run.
fn run_window(cards: &[Card]) -> Option<(u8, Vec<Card>)> {
    let len = cards.len();
    if len < MIN_RUN_LEN || len > 13 {
        return None;
    }

    let mut naturals: Vec<Card> = cards.iter().copied().filter(|c| !c.is_joker()).collect();
    let first = *naturals.first()?;
    if naturals.iter().any(|c| c.suit != first.suit) {
        return None;
    }

    naturals.sort_unstable_by_key(|c| c.rank);
    if naturals.windows(2).any(|w| w[0].rank == w[1].rank) {
        return None;
    }

    let min = naturals[0].rank;
    let max = naturals[naturals.len() - 1].rank;
    let len = len as u8;
    if max - min + 1 > len {
        return None;
    }

    // Anchor the window at the lowest natural, shifting down when it would
    // run past the king.
    let start = if min + len - 1 > 13 { 13 - len + 1 } else { min };
    Some((start, naturals))
}

fn slap_onto_run(last: &[Card], drawn: Card) -> SlapSide {
    let suit = last[0].suit;
    if last.len() < MIN_RUN_LEN || last.iter().any(|c| c.suit != suit) {
        return SlapSide::None;
    }

    let mut ranks: Vec<u8> = last.iter().map(|c| c.rank).collect();
    ranks.sort_unstable();
    let consecutive = ranks.windows(2).all(|w| w[1] == w[0] + 1);
    if !consecutive || drawn.suit != suit || drawn.is_joker() {
        return SlapSide::None;
    }

    let min = ranks[0];
    let max = ranks[ranks.len() - 1];
    if min > 1 && drawn.rank == min - 1 {
        SlapSide::Left
    } else if max < 13 && drawn.rank == max + 1 {
        SlapSide::Right
    } else {
        SlapSide::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Suit, JOKER_RANK};

    fn c(suit: Suit, rank: u8) -> Card {
        Card::new(suit, rank)
    }

    #[test]
    fn empty_selection_is_invalid() {
        assert!(!is_valid_selection(&[], false));
        assert!(!is_valid_selection(&[], true));
    }

    #[test]
    fn single_card_is_valid() {
        assert!(is_valid_selection(&[c(Suit::Hearts, 7)], true));
        assert!(is_valid_selection(&[Card::joker(Suit::Spades)], true));
    }

    #[test]
    fn same_rank_sets_are_valid() {
        let pair = [c(Suit::Hearts, 9), c(Suit::Clubs, 9)];
        assert!(is_valid_selection(&pair, true));

        let with_joker = [
            c(Suit::Hearts, 9),
            Card::joker(Suit::Spades),
            c(Suit::Diamonds, 9),
        ];
        assert!(is_valid_selection(&with_joker, true));

        let both_jokers = [Card::joker(Suit::Spades), Card::joker(Suit::Hearts)];
        assert!(is_valid_selection(&both_jokers, true));
    }

    #[test]
    fn two_distinct_cards_are_rejected_at_pickup_time() {
        let two = [c(Suit::Hearts, 4), c(Suit::Hearts, 5)];
        assert!(!is_valid_selection(&two, true));
        // ...and still fail the run minimum outside pickup.
        assert!(!is_valid_selection(&two, false));
    }

    #[test]
    fn runs_need_one_suit_and_consecutive_ranks() {
        let run = [c(Suit::Hearts, 4), c(Suit::Hearts, 6), c(Suit::Hearts, 5)];
        assert!(is_valid_selection(&run, true));

        let mixed_suit = [c(Suit::Hearts, 4), c(Suit::Clubs, 5), c(Suit::Hearts, 6)];
        assert!(!is_valid_selection(&mixed_suit, true));

        let gap_too_wide = [c(Suit::Hearts, 4), c(Suit::Hearts, 6), c(Suit::Hearts, 8)];
        assert!(!is_valid_selection(&gap_too_wide, true));

        let duplicate = [c(Suit::Hearts, 4), c(Suit::Hearts, 4), c(Suit::Hearts, 5)];
        assert!(!is_valid_selection(&duplicate, true));
    }

    #[test]
    fn joker_fills_a_run_gap() {
        // S3: 3♦ 5♦ Joker arranges as 3♦ Joker 5♦.
        let cards = [
            c(Suit::Diamonds, 3),
            c(Suit::Diamonds, 5),
            Card::joker(Suit::Spades),
        ];
        assert!(is_valid_selection(&cards, true));

        let arranged = sequence_arrangement(&cards).unwrap();
        assert_eq!(
            arranged,
            vec![
                c(Suit::Diamonds, 3),
                Card::joker(Suit::Spades),
                c(Suit::Diamonds, 5),
            ]
        );
    }

    #[test]
    fn leftover_joker_extends_past_the_window() {
        // Q K Joker has no internal gap; the joker lands below the queen.
        let cards = [
            c(Suit::Spades, 12),
            c(Suit::Spades, 13),
            Card::joker(Suit::Hearts),
        ];
        let arranged = sequence_arrangement(&cards).unwrap();
        assert_eq!(arranged[0].rank, JOKER_RANK);
        assert_eq!(arranged[1], c(Suit::Spades, 12));
        assert_eq!(arranged[2], c(Suit::Spades, 13));

        // A 2 Joker extends upwards instead.
        let cards = [
            c(Suit::Clubs, 1),
            c(Suit::Clubs, 2),
            Card::joker(Suit::Hearts),
        ];
        let arranged = sequence_arrangement(&cards).unwrap();
        assert_eq!(arranged[0], c(Suit::Clubs, 1));
        assert_eq!(arranged[1], c(Suit::Clubs, 2));
        assert_eq!(arranged[2].rank, JOKER_RANK);
    }

    #[test]
    fn arrangement_of_a_set_is_identity() {
        let set = [c(Suit::Hearts, 9), c(Suit::Clubs, 9), c(Suit::Spades, 9)];
        assert_eq!(sequence_arrangement(&set).unwrap(), set.to_vec());
    }

    #[test]
    fn arrangement_of_invalid_selection_is_none() {
        let bad = [c(Suit::Hearts, 2), c(Suit::Clubs, 9)];
        assert_eq!(sequence_arrangement(&bad), None);
    }

    #[test]
    fn slap_onto_single_matches_rank_only() {
        let last = [c(Suit::Hearts, 10)];
        assert_eq!(
            slap_down_valid_from(&last, c(Suit::Clubs, 10)),
            SlapSide::Right
        );
        // Ten and king are both worth ten points but do not match.
        assert_eq!(
            slap_down_valid_from(&last, c(Suit::Clubs, 13)),
            SlapSide::None
        );

        let joker = [Card::joker(Suit::Spades)];
        assert_eq!(
            slap_down_valid_from(&joker, Card::joker(Suit::Hearts)),
            SlapSide::Right
        );
        assert_eq!(
            slap_down_valid_from(&joker, c(Suit::Clubs, 1)),
            SlapSide::None
        );
    }

    #[test]
    fn slap_onto_set_matches_rank() {
        let last = [c(Suit::Hearts, 4), c(Suit::Clubs, 4)];
        assert_eq!(
            slap_down_valid_from(&last, c(Suit::Spades, 4)),
            SlapSide::Right
        );
        assert_eq!(
            slap_down_valid_from(&last, c(Suit::Spades, 5)),
            SlapSide::None
        );
    }

    #[test]
    fn slap_onto_run_extends_either_end() {
        // S4: 5♣ 6♣ 7♣ accepts 8♣ on the right.
        let last = [c(Suit::Clubs, 5), c(Suit::Clubs, 6), c(Suit::Clubs, 7)];
        assert_eq!(
            slap_down_valid_from(&last, c(Suit::Clubs, 8)),
            SlapSide::Right
        );
        assert_eq!(
            slap_down_valid_from(&last, c(Suit::Clubs, 4)),
            SlapSide::Left
        );
        assert_eq!(
            slap_down_valid_from(&last, c(Suit::Hearts, 8)),
            SlapSide::None
        );
        assert_eq!(
            slap_down_valid_from(&last, c(Suit::Clubs, 9)),
            SlapSide::None
        );
    }

    #[test]
    fn slap_never_runs_off_the_rank_range() {
        let low = [c(Suit::Clubs, 1), c(Suit::Clubs, 2), c(Suit::Clubs, 3)];
        assert_eq!(
            slap_down_valid_from(&low, c(Suit::Clubs, 4)),
            SlapSide::Right
        );

        let high = [c(Suit::Clubs, 11), c(Suit::Clubs, 12), c(Suit::Clubs, 13)];
        assert_eq!(
            slap_down_valid_from(&high, c(Suit::Clubs, 10)),
            SlapSide::Left
        );
    }

    #[test]
    fn jokers_in_the_discard_disqualify_slaps() {
        let last = [
            c(Suit::Clubs, 5),
            Card::joker(Suit::Spades),
            c(Suit::Clubs, 7),
        ];
        assert_eq!(
            slap_down_valid_from(&last, c(Suit::Clubs, 8)),
            SlapSide::None
        );

        let pair_with_joker = [c(Suit::Clubs, 5), Card::joker(Suit::Spades)];
        assert_eq!(
            slap_down_valid_from(&pair_with_joker, c(Suit::Hearts, 5)),
            SlapSide::None
        );
    }

    #[test]
    fn pickup_only_from_the_ends() {
        assert!(can_pickup(1, 0));
        assert!(can_pickup(3, 0));
        assert!(can_pickup(3, 2));
        assert!(!can_pickup(3, 1));
        assert!(!can_pickup(0, 0));
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        fn arb_card() -> impl Strategy<Value = Card> {
            (0u8..4, 0u8..=13).prop_map(|(s, rank)| {
                let suit = crate::SUITS[s as usize];
                Card::new(suit, rank)
            })
        }

        proptest! {
            // Every arrangement the normaliser accepts must be a valid
            // selection, and valid under reordering of the input.
            #[test]
            fn arrangement_round_trips(cards in prop::collection::vec(arb_card(), 1..6)) {
                if let Some(arranged) = sequence_arrangement(&cards) {
                    prop_assert!(is_valid_selection(&arranged, false));
                    prop_assert_eq!(arranged.len(), cards.len());

                    let mut reversed = cards.clone();
                    reversed.reverse();
                    let again = sequence_arrangement(&reversed);
                    prop_assert!(again.is_some());
                }
            }

            // A slap verdict must leave the extended pile a valid selection.
            #[test]
            fn slap_locality(cards in prop::collection::vec(arb_card(), 1..5), drawn in arb_card()) {
                if let Some(arranged) = sequence_arrangement(&cards) {
                    match slap_down_valid_from(&arranged, drawn) {
                        SlapSide::Left => {
                            let mut extended = vec![drawn];
                            extended.extend_from_slice(&arranged);
                            prop_assert!(is_valid_selection(&extended, false));
                        }
                        SlapSide::Right => {
                            let mut extended = arranged.clone();
                            extended.push(drawn);
                            prop_assert!(is_valid_selection(&extended, false));
                        }
                        SlapSide::None => {}
                    }
                }
            }
        }
    }
}
