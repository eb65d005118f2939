//! Round resolution: Yaniv vs Assaf, score deltas, the ×50 bonus reduction,
//! eliminations and final standings.

use std::collections::HashMap;

use common::hand_value;
use common::players::PlayerStatus;
use itertools::Itertools;
use uuid::Uuid;

use crate::state::GameState;

/// A 50-point rebate every time a running total lands on a nonzero
/// multiple of 50.
pub const BONUS_REDUCTION: i32 = 50;

/// Penalty paid by a Yaniv caller who gets assaffed.
pub const ASSAF_PENALTY: i32 = 30;

pub struct RoundOutcome {
    pub winner: Uuid,
    pub yaniv_caller: Uuid,
    /// The opponent who assaffed the caller, when the call backfired.
    pub assaf_caller: Option<Uuid>,
    /// Signed increments per player; the reduction appears as its own `-50`.
    pub deltas: HashMap<Uuid, Vec<i32>>,
    /// Players pushed over the limit this round, earliest in loser order.
    pub eliminated: Vec<Uuid>,
    /// Hands as they stood when the round ended, by seat order.
    pub round_players: Vec<Uuid>,
}

/// Score the round triggered by `caller`'s Yaniv. The caller's hand value
/// has already been checked against the threshold.
pub fn resolve_round(state: &mut GameState, caller: Uuid) -> RoundOutcome {
    let caller_value = hand_value(state.hand(caller));

    // Lowest opposing hand, first in seat order on ties.
    let lowest_opponent = state
        .players
        .iter()
        .filter(|p| p.id != caller && state.status_of(p.id) == PlayerStatus::Active)
        .map(|p| (p.id, hand_value(state.hand(p.id))))
        .min_by_key(|&(_, v)| v);

    // The caller must be strictly lowest; any opponent at or below their
    // value assafs them.
    let (winner, assaf_caller) = match lowest_opponent {
        Some((opponent, value)) if value <= caller_value => (opponent, Some(opponent)),
        _ => (caller, None),
    };

    let round_players: Vec<Uuid> = state
        .players
        .iter()
        .filter(|p| state.status_of(p.id) == PlayerStatus::Active)
        .map(|p| p.id)
        .collect();

    let mut deltas = HashMap::with_capacity(round_players.len());
    for &id in &round_players {
        let add = if id == caller && winner == caller {
            0
        } else if id == caller {
            ASSAF_PENALTY + caller_value as i32
        } else {
            hand_value(state.hand(id)) as i32
        };

        let mut increments = vec![add];
        if let Some(stats) = state.stats.get_mut(&id) {
            stats.score += add;
            if stats.score != 0 && stats.score % BONUS_REDUCTION == 0 {
                stats.score -= BONUS_REDUCTION;
                increments.push(-BONUS_REDUCTION);
            }
        }
        deltas.insert(id, increments);
    }

    // Same-round eliminations break ties in descending id so the loser
    // order is deterministic.
    let eliminated: Vec<Uuid> = round_players
        .iter()
        .copied()
        .filter(|id| {
            state
                .stats
                .get(id)
                .is_some_and(|s| s.score > state.config.max_match_points)
        })
        .sorted_by(|a, b| b.cmp(a))
        .collect();

    for &id in &eliminated {
        state.set_status(id, PlayerStatus::Lost);
        state.loser_order.push(id);
    }

    state.last_winner = Some(winner);
    state.last_assaf_caller = assaf_caller;

    RoundOutcome {
        winner,
        yaniv_caller: caller,
        assaf_caller,
        deltas,
        eliminated,
        round_players,
    }
}

/// Match winner and final standings once fewer than two seats stay active.
///
/// Standings are the reversed loser order with the winner prepended when
/// absent and leavers appended last.
pub fn final_standings(state: &GameState) -> (Uuid, Vec<Uuid>) {
    let active = state.active_ids();

    let winner = match active.as_slice() {
        [only] => *only,
        _ => lowest_scorer(state),
    };

    let mut places: Vec<Uuid> = state.loser_order.iter().rev().copied().collect();
    if !places.contains(&winner) {
        places.insert(0, winner);
    }
    for player in &state.players {
        if state.status_of(player.id) == PlayerStatus::Leave && !places.contains(&player.id) {
            places.push(player.id);
        }
    }

    (winner, places)
}

/// When the final round empties the table, the lowest total wins; the
/// assaf caller is preferred on ties, then seat order.
fn lowest_scorer(state: &GameState) -> Uuid {
    let candidates: Vec<(Uuid, i32)> = state
        .players
        .iter()
        .filter(|p| state.status_of(p.id) != PlayerStatus::Leave)
        .filter_map(|p| state.stats.get(&p.id).map(|s| (p.id, s.score)))
        .collect();

    let Some(&(first, best)) = candidates.first() else {
        // everyone left; nothing sensible remains to report
        return state
            .players
            .first()
            .map(|p| p.id)
            .unwrap_or_else(Uuid::nil);
    };

    let best = candidates.iter().map(|&(_, s)| s).min().unwrap_or(best);
    let tied: Vec<Uuid> = candidates
        .iter()
        .filter(|&&(_, s)| s == best)
        .map(|&(id, _)| id)
        .collect();

    if let Some(assaf) = state.last_assaf_caller {
        if tied.contains(&assaf) {
            return assaf;
        }
    }
    tied.first().copied().unwrap_or(first)
}
