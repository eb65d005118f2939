//! Discardable combinations the policy can see in a hand.

use std::collections::HashMap;

use common::combos::{self, MIN_RUN_LEN};
use common::{hand_value, Card, Difficulty, SUITS};
use itertools::Itertools;

/// How many jokers a synthesized run may contain. Easy bots never look for
/// runs at all.
pub fn joker_budget(difficulty: Difficulty) -> Option<usize> {
    match difficulty {
        Difficulty::Easy => None,
        Difficulty::Medium => Some(0),
        Difficulty::Hard => Some(1),
    }
}

/// Non-joker cards grouped by rank.
pub fn rank_groups(hand: &[Card]) -> HashMap<u8, Vec<Card>> {
    let mut groups: HashMap<u8, Vec<Card>> = HashMap::new();
    for card in hand.iter().filter(|c| !c.is_joker()) {
        groups.entry(card.rank).or_default().push(*card);
    }
    groups
}

/// The equal-rank set worth the most points, if any set of two exists.
pub fn best_set(hand: &[Card]) -> Option<Vec<Card>> {
    rank_groups(hand)
        .into_values()
        .filter(|group| group.len() >= 2)
        .max_by_key(|group| hand_value(group))
}

/// Every maximal run discardable right now, jokers filling internal gaps
/// within the difficulty's budget.
pub fn runs_in_hand(hand: &[Card], difficulty: Difficulty) -> Vec<Vec<Card>> {
    let Some(budget) = joker_budget(difficulty) else {
        return Vec::new();
    };
    let jokers: Vec<Card> = hand
        .iter()
        .copied()
        .filter(Card::is_joker)
        .take(budget)
        .collect();

    let mut runs = Vec::new();
    for suit in SUITS {
        let mut suited: Vec<Card> = hand
            .iter()
            .copied()
            .filter(|c| c.suit == suit && !c.is_joker())
            .collect();
        suited.sort_unstable_by_key(|c| c.rank);
        suited.dedup_by_key(|c| c.rank);

        for i in 0..suited.len() {
            let mut run = vec![suited[i]];
            let mut spare = jokers.clone();
            let mut last_rank = suited[i].rank;
            for &next in &suited[i + 1..] {
                let gap = (next.rank - last_rank - 1) as usize;
                if gap > spare.len() {
                    break;
                }
                for _ in 0..gap {
                    run.push(spare.pop().expect("gap fits the spare jokers"));
                }
                run.push(next);
                last_rank = next.rank;
            }
            if run.len() >= MIN_RUN_LEN {
                runs.push(run);
            }
        }
    }
    runs
}

/// The longest run in hand, worth the most points on ties.
pub fn best_run(hand: &[Card], difficulty: Difficulty) -> Option<Vec<Card>> {
    runs_in_hand(hand, difficulty)
        .into_iter()
        .max_by_key(|run| (run.len(), hand_value(run)))
}

/// Two held cards that form a run of three with `top`, within the joker
/// budget. The pair worth keeping when planning around a pickup.
pub fn run_partners(hand: &[Card], top: Card, difficulty: Difficulty) -> Option<(Card, Card)> {
    if top.is_joker() {
        return None;
    }
    let budget = joker_budget(difficulty)?;

    for (&a, &b) in hand.iter().tuple_combinations() {
        let jokers = [a, b].iter().filter(|c| c.is_joker()).count();
        if jokers > budget || jokers == 2 {
            continue;
        }
        let cards = [top, a, b];
        let naturals: Vec<Card> = cards.iter().copied().filter(|c| !c.is_joker()).collect();
        let same_rank = naturals.windows(2).all(|w| w[0].rank == w[1].rank);
        if same_rank {
            continue;
        }
        if combos::is_valid_selection(&cards, false) {
            return Some((a, b));
        }
    }
    None
}

/// Whether `hand` holds a natural of this suit at any of the given ranks.
pub fn holds_suited(hand: &[Card], suit: common::Suit, ranks: &[u8]) -> bool {
    hand.iter()
        .any(|c| !c.is_joker() && c.suit == suit && ranks.contains(&c.rank))
}

#[cfg(test)]
mod tests {
    use common::Suit;

    use super::*;

    fn c(suit: Suit, rank: u8) -> Card {
        Card::new(suit, rank)
    }

    #[test]
    fn easy_bots_see_no_runs() {
        let hand = [
            c(Suit::Hearts, 4),
            c(Suit::Hearts, 5),
            c(Suit::Hearts, 6),
            c(Suit::Clubs, 13),
        ];
        assert!(runs_in_hand(&hand, Difficulty::Easy).is_empty());
        assert_eq!(runs_in_hand(&hand, Difficulty::Medium).len(), 1);
    }

    #[test]
    fn medium_rejects_joker_runs_hard_allows_one() {
        let hand = [
            c(Suit::Hearts, 4),
            Card::joker(Suit::Spades),
            c(Suit::Hearts, 6),
            c(Suit::Clubs, 13),
        ];
        assert!(runs_in_hand(&hand, Difficulty::Medium).is_empty());

        let runs = runs_in_hand(&hand, Difficulty::Hard);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].len(), 3);
        assert!(runs[0].iter().any(Card::is_joker));
    }

    #[test]
    fn best_run_prefers_longer_then_richer() {
        let hand = [
            c(Suit::Hearts, 4),
            c(Suit::Hearts, 5),
            c(Suit::Hearts, 6),
            c(Suit::Hearts, 7),
            c(Suit::Clubs, 1),
        ];
        let run = best_run(&hand, Difficulty::Medium).unwrap();
        assert_eq!(run.len(), 4);
    }

    #[test]
    fn best_set_takes_the_richest_group() {
        let hand = [
            c(Suit::Hearts, 3),
            c(Suit::Clubs, 3),
            c(Suit::Hearts, 10),
            c(Suit::Spades, 10),
        ];
        let set = best_set(&hand).unwrap();
        assert_eq!(set[0].rank, 10);
    }

    #[test]
    fn run_partners_plan_around_the_top() {
        let hand = [
            c(Suit::Hearts, 4),
            c(Suit::Hearts, 6),
            c(Suit::Clubs, 13),
        ];
        let (a, b) = run_partners(&hand, c(Suit::Hearts, 5), Difficulty::Medium).unwrap();
        assert_eq!([a, b], [c(Suit::Hearts, 4), c(Suit::Hearts, 6)]);

        assert!(run_partners(&hand, c(Suit::Diamonds, 5), Difficulty::Medium).is_none());
        assert!(run_partners(&hand, c(Suit::Hearts, 5), Difficulty::Easy).is_none());
    }
}
