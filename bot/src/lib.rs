//! The bot opponent.
//!
//! Purely functional over `(hand, pile, difficulty)`; nothing here touches
//! game state. Discard selection walks an ordered rule list; the pickup
//! decision runs one simulated turn per pile edge and compares scores.
//!
//! Difficulty gates how far the bot plans: easy never synthesizes runs,
//! medium synthesizes joker-free runs, hard spends up to one joker.

pub mod candidates;
mod pickup;

use common::event::client::TurnAction;
use common::{hand_value, Card, Difficulty};
use tracing::trace;

use candidates::{best_run, best_set, rank_groups, run_partners};
pub use pickup::decide_pickup;

/// A complete bot turn: where to draw from, and what to shed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotMove {
    pub action: TurnAction,
    pub selected_cards: Vec<Card>,
}

/// Bots end the round the moment they legally can.
pub fn should_call_yaniv(hand: &[Card], threshold: u32) -> bool {
    hand_value(hand) <= threshold
}

/// Decide a full turn for the bot.
pub fn take_turn(hand: &[Card], pile: &[Card], difficulty: Difficulty) -> BotMove {
    match decide_pickup(hand, pile, difficulty) {
        Some(index) => {
            let selected_cards = choose_cards(hand, std::slice::from_ref(&pile[index]), difficulty);
            trace!(?selected_cards, index, "bot picks up from the pile");
            BotMove {
                action: TurnAction::Pickup {
                    pickup_index: index,
                },
                selected_cards,
            }
        }
        None => {
            let selected_cards = choose_cards(hand, pile, difficulty);
            trace!(?selected_cards, "bot draws from the deck");
            BotMove {
                action: TurnAction::Deck,
                selected_cards,
            }
        }
    }
}

/// Pick the cards to discard this turn, given what the pile shows.
///
/// Rules fire in priority order; the first that produces a discard wins.
pub fn choose_cards(hand: &[Card], pile: &[Card], difficulty: Difficulty) -> Vec<Card> {
    let top = pile.first().copied();

    protect_planned_run(hand, top, difficulty)
        .or_else(|| free_joker_grab(hand, top))
        .or_else(|| long_run(hand, difficulty))
        .or_else(|| avoid_breaking_extension(hand, top, difficulty))
        .or_else(|| keep_completing_pair(hand, top))
        .or_else(|| low_top_dump(hand, top))
        .or_else(|| best_set_discard(hand))
        .unwrap_or_else(|| fallback(hand))
}

/// The top plus two held cards make a run: discard around the plan.
fn protect_planned_run(hand: &[Card], top: Option<Card>, difficulty: Difficulty) -> Option<Vec<Card>> {
    let top = top?;
    let (a, b) = run_partners(hand, top, difficulty)?;
    let discard = hand
        .iter()
        .copied()
        .filter(|c| !c.is_joker() && *c != a && *c != b)
        .max_by_key(|c| c.rank)?;
    Some(vec![discard])
}

/// A joker on the pile is free; shed any safe card to take it.
fn free_joker_grab(hand: &[Card], top: Option<Card>) -> Option<Vec<Card>> {
    if !top.is_some_and(|c| c.is_joker()) {
        return None;
    }
    let groups = rank_groups(hand);
    hand.iter()
        .copied()
        .filter(|c| !c.is_joker())
        .filter(|c| groups.get(&c.rank).is_none_or(|g| g.len() == 1))
        .max_by_key(|c| c.rank)
        .or_else(|| {
            hand.iter()
                .copied()
                .filter(|c| !c.is_joker())
                .max_by_key(|c| c.rank)
        })
        .map(|c| vec![c])
}

/// A ready run in hand goes out whole.
fn long_run(hand: &[Card], difficulty: Difficulty) -> Option<Vec<Card>> {
    best_run(hand, difficulty)
}

/// The top would extend a held partial run: discard elsewhere and keep the
/// extension alive.
fn avoid_breaking_extension(
    hand: &[Card],
    top: Option<Card>,
    difficulty: Difficulty,
) -> Option<Vec<Card>> {
    let top = top?;
    if top.is_joker() || candidates::joker_budget(difficulty).is_none() {
        return None;
    }

    let suited: Vec<u8> = hand
        .iter()
        .filter(|c| !c.is_joker() && c.suit == top.suit)
        .map(|c| c.rank)
        .collect();
    let has = |r: i16| (1..=13).contains(&r) && suited.contains(&(r as u8));
    let t = top.rank as i16;
    let extends = (has(t - 1) && has(t - 2)) || (has(t + 1) && has(t + 2)) || (has(t - 1) && has(t + 1));
    if !extends {
        return None;
    }

    let discard = hand
        .iter()
        .copied()
        .filter(|c| !c.is_joker())
        .filter(|c| c.rank != top.rank)
        .filter(|c| !(c.suit == top.suit && c.rank.abs_diff(top.rank) <= 2))
        .max_by_key(|c| c.rank)?;
    Some(vec![discard])
}

/// The top matches a held rank: keep the forming set, shed another one or
/// the highest loose card.
fn keep_completing_pair(hand: &[Card], top: Option<Card>) -> Option<Vec<Card>> {
    let top = top?;
    if top.is_joker() {
        return None;
    }
    let groups = rank_groups(hand);
    if !groups.contains_key(&top.rank) {
        return None;
    }

    let other_set = groups
        .iter()
        .filter(|(rank, group)| **rank != top.rank && group.len() >= 2)
        .max_by_key(|(_, group)| hand_value(group))
        .map(|(_, group)| group.clone());
    if let Some(set) = other_set {
        return Some(set);
    }

    let discard = hand
        .iter()
        .copied()
        .filter(|c| !c.is_joker() && c.rank != top.rank)
        .filter(|c| groups.get(&c.rank).is_none_or(|g| g.len() == 1))
        .max_by_key(|c| c.rank)?;
    Some(vec![discard])
}

/// A cheap top is worth taking next turn: dump a high card that does not
/// touch it.
fn low_top_dump(hand: &[Card], top: Option<Card>) -> Option<Vec<Card>> {
    let top = top?;
    if top.is_joker() || top.value() > 2 {
        return None;
    }
    let discard = hand
        .iter()
        .copied()
        .filter(|c| !c.is_joker())
        .filter(|c| c.rank != top.rank)
        .filter(|c| !(c.suit == top.suit && c.rank.abs_diff(top.rank) <= 2))
        .max_by_key(|c| c.rank)?;
    Some(vec![discard])
}

/// Shed the richest set; a fistful of aces yields to a high singleton.
fn best_set_discard(hand: &[Card]) -> Option<Vec<Card>> {
    let set = best_set(hand)?;
    if set.iter().all(|c| c.rank == 1) {
        let groups = rank_groups(hand);
        let singleton = hand
            .iter()
            .copied()
            .filter(|c| !c.is_joker() && c.rank != 1)
            .filter(|c| groups.get(&c.rank).is_none_or(|g| g.len() == 1))
            .max_by_key(|c| c.rank);
        if let Some(card) = singleton {
            return Some(vec![card]);
        }
    }
    Some(set)
}

/// Nothing better: the highest non-joker goes.
fn fallback(hand: &[Card]) -> Vec<Card> {
    hand.iter()
        .copied()
        .filter(|c| !c.is_joker())
        .max_by_key(|c| c.rank)
        .map(|c| vec![c])
        .unwrap_or_else(|| vec![hand[0]])
}
