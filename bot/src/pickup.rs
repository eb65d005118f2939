//! The pickup decision: one simulated turn per eligible pile edge.

use common::{hand_value, sort_hand, Card, Difficulty};

use crate::candidates::{holds_suited, rank_groups, run_partners};
use crate::choose_cards;

/// Decide which pile end to take, if any. `None` means draw from the deck.
///
/// Each candidate edge is scored by simulating the turn that would follow:
/// what the policy would discard next, and what the hand looks like after.
pub fn decide_pickup(hand: &[Card], pile: &[Card], difficulty: Difficulty) -> Option<usize> {
    if pile.is_empty() {
        return None;
    }

    let mut edges = vec![0];
    if pile.len() > 1 {
        edges.push(pile.len() - 1);
    }

    // a joker on an edge is free points, no simulation needed
    if let Some(&edge) = edges.iter().find(|&&i| pile[i].is_joker()) {
        return Some(edge);
    }

    let skip_score = {
        let discard = choose_cards(hand, pile, difficulty);
        let remaining = without(hand, &discard);
        base_score(&remaining)
    };

    let mut best: Option<(i32, usize)> = None;
    for &edge in &edges {
        let score = evaluate_pickup(hand, pile[edge], difficulty);
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, edge));
        }
    }

    match best {
        Some((score, edge)) if score > skip_score => Some(edge),
        _ => None,
    }
}

/// Score one simulated turn after taking `picked`.
fn evaluate_pickup(hand: &[Card], picked: Card, difficulty: Difficulty) -> i32 {
    let mut new_hand = hand.to_vec();
    new_hand.push(picked);
    sort_hand(&mut new_hand);

    // the inner policy sees the candidate as the pile top; one ply only
    let sim_discard = choose_cards(&new_hand, std::slice::from_ref(&picked), difficulty);
    let remaining = without(&new_hand, &sim_discard);

    let mut score = base_score(&remaining);

    // a run of three stays reachable when a same-suit neighbour survives
    let reachable = remaining.iter().any(|c| {
        !c.is_joker() && *c != picked && c.suit == picked.suit && c.rank.abs_diff(picked.rank) <= 2
    });
    if reachable {
        score += 120;
    }

    // the plan is dead if the simulated discard throws a partner card
    let planned_partner_discarded = sim_discard.iter().any(|c| {
        !c.is_joker() && c.suit == picked.suit && c.rank.abs_diff(picked.rank) <= 2
    });
    if planned_partner_discarded {
        score -= 200;
    }

    // an immediate run of three is gold, unless the discard breaks it
    if let Some((a, b)) = run_partners(hand, picked, difficulty) {
        if sim_discard.contains(&a) || sim_discard.contains(&b) {
            score -= 600;
        } else {
            score += 800;
        }
    }

    // completing a pair only to throw its rank away defeats the pickup
    let had_rank = hand
        .iter()
        .any(|c| !c.is_joker() && c.rank == picked.rank);
    if had_rank && sim_discard.iter().any(|c| c.rank == picked.rank) {
        score -= 10_000;
    }

    if picked.value() <= 2 {
        score += low_card_bonus(picked, &remaining, difficulty);
    }

    score
}

/// Hand quality after the simulated discard: fewer points is better, and
/// surviving groups keep future discards cheap.
fn base_score(remaining: &[Card]) -> i32 {
    let mut score = 1000 - hand_value(remaining) as i32;
    for group in rank_groups(remaining).values() {
        if group.len() >= 3 {
            score += 90;
        } else if group.len() == 2 {
            score += 40;
        }
    }
    score
}

/// Aces and twos are worth grabbing outright, more so when they connect to
/// same-suit neighbours.
fn low_card_bonus(picked: Card, remaining: &[Card], difficulty: Difficulty) -> i32 {
    let mut bonus = 300 * (3 - picked.value() as i32);

    let suit = picked.suit;
    match picked.rank {
        1 => {
            if holds_suited(remaining, suit, &[2]) {
                bonus += 220;
            }
            let low_bridge = holds_suited(remaining, suit, &[2])
                || (difficulty == Difficulty::Hard && remaining.iter().any(Card::is_joker));
            if holds_suited(remaining, suit, &[3]) && low_bridge {
                bonus += 160;
            }
        }
        2 => {
            if holds_suited(remaining, suit, &[1]) {
                bonus += 220;
            }
            if holds_suited(remaining, suit, &[3]) {
                bonus += 180;
            }
        }
        _ => {}
    }

    bonus
}

/// The hand minus one copy of each discarded card.
fn without(hand: &[Card], discard: &[Card]) -> Vec<Card> {
    let mut remaining = hand.to_vec();
    for card in discard {
        if let Some(i) = remaining.iter().position(|c| c == card) {
            remaining.remove(i);
        }
    }
    remaining
}
