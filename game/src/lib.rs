//! The per-room turn engine.
//!
//! [`Engine`] is a synchronous state machine owned by a room's driving task.
//! Commands mutate it directly; outbound events queue in order and are
//! drained with [`Engine::poll`]. Waiting periods expose their deadline via
//! [`Engine::wait_deadline`], and the driver reports expiry through
//! [`Engine::handle_deadline`]. A superseded state drops its deadline, so a
//! stale firing cannot act on the wrong turn.

pub mod error;
pub mod scoring;
pub mod state;

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use common::combos::{self, SlapSide};
use common::config::RoomConfig;
use common::event::client::TurnAction;
use common::event::server::{DrawSource, Event};
use common::players::{Player, PlayerStatus};
use common::{hand_value, Card, Deck};
use tracing::{debug, error, info};
use uuid::Uuid;

use error::GameError;
use scoring::RoundOutcome;
use state::GameState;

/// How long a slap-down stays possible after drawing from the deck.
pub const SLAP_DOWN_WINDOW: Duration = Duration::from_secs(3);

/// Extra result-display time when the round eliminated someone.
pub const ELIMINATION_DISPLAY_DELAY: Duration = Duration::from_millis(3250);

/// Delay before the first turn of the first round, scaled by seat count.
pub fn first_deal_delay(players: usize) -> Duration {
    Duration::from_millis(2100 + 500 * players as u64)
}

/// Delay before the first turn of every later round.
pub fn next_deal_delay(players: usize) -> Duration {
    Duration::from_millis(2600 + 700 * players as u64)
}

/// Result-display time between `round_ended` and the next deal.
fn round_display_delay(active: usize, eliminated: bool) -> Duration {
    let mut delay = Duration::from_millis(2000 * active as u64 - 1);
    if eliminated {
        delay += ELIMINATION_DISPLAY_DELAY;
    }
    delay
}

/// Who an engine event is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    One(Uuid),
}

/// An event queued for the transport, with its recipient.
#[derive(Debug)]
pub struct Outgoing {
    pub target: Target,
    pub event: Event,
}

enum Phase {
    /// The deal is on screen; the first turn timer arms when this elapses.
    StartDelay { until: Instant },
    /// The current player must act before the deadline.
    AwaitingTurn { deadline: Instant },
    /// Round results are on screen; the next deal follows.
    RoundDisplay { until: Instant },
    /// The match ended; seats may vote to play again.
    MatchEnded { votes: HashSet<Uuid> },
}

#[derive(Clone, Copy)]
struct SlapWindow {
    player: Uuid,
    card: Card,
    deadline: Instant,
}

pub struct Engine {
    room_id: String,
    state: GameState,
    phase: Phase,
    /// Runs concurrently with the next player's turn.
    slap: Option<SlapWindow>,
    out: VecDeque<Outgoing>,
    /// Pre-arranged decks for upcoming deals; shuffled decks otherwise.
    rigged: VecDeque<Deck>,
}

impl Engine {
    /// Start a match with a freshly shuffled deck.
    pub fn new(room_id: String, players: Vec<Player>, config: RoomConfig, now: Instant) -> Self {
        let mut deck = Deck::full();
        deck.shuffle(&mut rand::thread_rng());
        Self::from_deck(room_id, players, config, deck, now)
    }

    /// Start a match dealing from `deck` as given. Deterministic; the seam
    /// the scenario tests drive.
    pub fn from_deck(
        room_id: String,
        players: Vec<Player>,
        config: RoomConfig,
        deck: Deck,
        now: Instant,
    ) -> Self {
        let mut state = GameState::new(players, config);
        state.deal_from(deck);

        let delay = first_deal_delay(state.active_count());
        let mut engine = Engine {
            room_id,
            state,
            phase: Phase::StartDelay { until: now + delay },
            slap: None,
            out: VecDeque::new(),
            rigged: VecDeque::new(),
        };

        info!(room = %engine.room_id, players = engine.state.players.len(), "game initialized");
        engine.broadcast(Event::GameInitialized {
            players: engine.state.players.clone(),
            hands: engine.state.hands.clone(),
            pickup_cards: engine.state.pickup_cards.clone(),
            current_player_id: engine.state.current_player_id(),
            start_delay: delay.as_millis() as u64,
        });
        engine
    }

    /// Queue a deck for an upcoming deal in place of a shuffle. Makes
    /// multi-round games reproducible.
    pub fn queue_deck(&mut self, deck: Deck) {
        self.rigged.push_back(deck);
    }

    fn fresh_deck(&mut self) -> Deck {
        self.rigged.pop_front().unwrap_or_else(|| {
            let mut deck = Deck::full();
            deck.shuffle(&mut rand::thread_rng());
            deck
        })
    }

    /// Pop the next queued event.
    pub fn poll(&mut self) -> Option<Outgoing> {
        self.out.pop_front()
    }

    /// The next instant the engine needs waking at, if any.
    pub fn wait_deadline(&self) -> Option<Instant> {
        let phase = match &self.phase {
            Phase::StartDelay { until } => Some(*until),
            Phase::AwaitingTurn { deadline } => Some(*deadline),
            Phase::RoundDisplay { until } => Some(*until),
            Phase::MatchEnded { .. } => None,
        };
        let slap = self.slap.map(|w| w.deadline);
        match (phase, slap) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (deadline, slap) => deadline.or(slap),
        }
    }

    /// Advance whatever the elapsed deadline guarded. Deadlines that no
    /// longer exist (their state was superseded) are ignored.
    pub fn handle_deadline(&mut self, now: Instant) {
        if let Some(window) = self.slap {
            if now >= window.deadline {
                debug!(room = %self.room_id, player = %window.player, "slap-down window expired");
                self.slap = None;
            }
        }

        match self.phase {
            Phase::StartDelay { until } if now >= until => self.begin_turn(now),
            Phase::AwaitingTurn { deadline } if now >= deadline => self.force_turn(now),
            Phase::RoundDisplay { until } if now >= until => self.next_round(now),
            _ => {}
        }
    }

    /// The current player when a turn is running.
    pub fn awaiting_turn(&self) -> Option<&Player> {
        match self.phase {
            Phase::AwaitingTurn { .. } => Some(self.state.current_player()),
            _ => None,
        }
    }

    pub fn match_over(&self) -> bool {
        matches!(self.phase, Phase::MatchEnded { .. })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }
}

impl Engine {
    /// Handle a `complete_turn` command from the current player.
    pub fn complete_turn(
        &mut self,
        player: Uuid,
        action: TurnAction,
        selected: Vec<Card>,
        now: Instant,
    ) {
        if !matches!(self.phase, Phase::AwaitingTurn { .. }) {
            return self.reject(player, GameError::NotInProgress);
        }
        if self.state.current_player_id() != player {
            return self.reject(player, GameError::NotYourTurn);
        }
        if !combos::is_valid_selection(&selected, true) {
            return self.reject(player, GameError::InvalidSelection);
        }
        if !self.state.hand_contains(player, &selected) {
            return self.reject(player, GameError::CardsNotInHand);
        }
        if let TurnAction::Pickup { pickup_index } = action {
            if !combos::can_pickup(self.state.pickup_cards.len(), pickup_index) {
                return self.reject(player, GameError::InvalidPickupIndex);
            }
        }

        self.apply_turn(player, action, selected, now, false);
    }

    /// Turn timer expiry: the highest card goes, replaced from the deck,
    /// with the slap window suppressed.
    fn force_turn(&mut self, now: Instant) {
        let player = self.state.current_player_id();
        let Some(card) = self.state.hand(player).last().copied() else {
            error!(room = %self.room_id, %player, "turn timed out with no hand");
            return;
        };
        info!(room = %self.room_id, %player, %card, "turn timed out, forcing discard");
        self.apply_turn(player, TurnAction::Deck, vec![card], now, true);
    }

    fn apply_turn(
        &mut self,
        player: Uuid,
        action: TurnAction,
        selected: Vec<Card>,
        now: Instant,
        forced: bool,
    ) {
        let Some(arranged) = combos::sequence_arrangement(&selected) else {
            error!(room = %self.room_id, %player, "validated selection failed to arrange");
            return;
        };

        let selected_cards_positions = self.state.positions_in_hand(player, &selected);
        let amount_before = self.state.hand_len(player);

        // the previous turn's window dies as soon as play moves on
        self.slap = None;

        let (source, gained, slap_down_active_for) = match action {
            TurnAction::Deck => {
                let Some((drawn, reshuffled)) = self.state.draw_card() else {
                    error!(room = %self.room_id, "draw stack and heap both empty");
                    return;
                };
                if reshuffled {
                    self.broadcast(Event::DeckReshuffled);
                }

                self.state.remove_from_hand(player, &selected);
                self.state.replace_pile(arranged.clone());

                let mut slap_for = None;
                if self.state.config.slap_down
                    && !forced
                    && !drawn.is_joker()
                    && combos::slap_down_valid_from(&arranged, drawn) != SlapSide::None
                {
                    slap_for = Some(player);
                    self.slap = Some(SlapWindow {
                        player,
                        card: drawn,
                        deadline: now + SLAP_DOWN_WINDOW,
                    });
                }

                self.state.add_to_hand(player, drawn);
                (DrawSource::Deck, drawn, slap_for)
            }
            TurnAction::Pickup { pickup_index } => {
                let taken = self.state.take_from_pile(pickup_index, arranged.clone());
                self.state.remove_from_hand(player, &selected);
                self.state.add_to_hand(player, taken);
                (DrawSource::Pickup, taken, None)
            }
        };

        self.state.advance_turn();

        self.broadcast(Event::PlayerDrew {
            player_id: player,
            source,
            hands: self.state.hands.clone(),
            pickup_cards: self.state.pickup_cards.clone(),
            card: Some(gained),
            selected_cards_positions,
            amount_before,
            current_player_id: self.state.current_player_id(),
            slap_down_active_for,
        });

        self.begin_turn(now);
    }

    fn begin_turn(&mut self, now: Instant) {
        let current_player_id = self.state.current_player_id();
        let secs = self.state.config.time_per_player;
        self.broadcast(Event::TurnStarted {
            current_player_id,
            time_remaining: secs,
        });
        self.phase = Phase::AwaitingTurn {
            deadline: now + Duration::from_secs(secs),
        };
    }
}

impl Engine {
    /// Handle a `call_yaniv` command from the current player.
    pub fn call_yaniv(&mut self, player: Uuid, now: Instant) {
        if !matches!(self.phase, Phase::AwaitingTurn { .. }) {
            return self.reject(player, GameError::NotInProgress);
        }
        if self.state.current_player_id() != player {
            return self.reject(player, GameError::NotYourTurn);
        }
        let value = hand_value(self.state.hand(player));
        let max = self.state.config.can_call_yaniv;
        if value > max {
            return self.reject(player, GameError::YanivAboveThreshold { value, max });
        }

        info!(room = %self.room_id, %player, value, "yaniv called");
        self.slap = None;
        let outcome = scoring::resolve_round(&mut self.state, player);
        self.finish_round(outcome, now);
    }

    fn finish_round(&mut self, outcome: RoundOutcome, now: Instant) {
        let human_lost = outcome
            .eliminated
            .iter()
            .any(|id| self.state.players.iter().any(|p| p.id == *id && !p.is_bot))
            && self.state.players.iter().any(|p| p.is_bot);
        let eliminated_any = !outcome.eliminated.is_empty();

        self.broadcast(Event::RoundEnded {
            winner_id: outcome.winner,
            players_stats: self.state.stats.clone(),
            yaniv_caller: outcome.yaniv_caller,
            assaf_caller: outcome.assaf_caller,
            player_hands: self.state.hands.clone(),
            round_players: outcome.round_players,
            players_round_score: outcome.deltas,
            losers: outcome.eliminated,
        });
        if human_lost {
            self.broadcast(Event::HumanLost);
        }

        let active = self.state.active_count();
        if active < 2 {
            self.finish_match();
        } else {
            self.phase = Phase::RoundDisplay {
                until: now + round_display_delay(active, eliminated_any),
            };
        }
    }

    fn next_round(&mut self, now: Instant) {
        self.state.round += 1;
        let deck = self.fresh_deck();
        self.state.deal_from(deck);

        let delay = next_deal_delay(self.state.active_count());
        debug!(room = %self.room_id, round = self.state.round, "dealing next round");
        self.broadcast(Event::NewRound {
            round: self.state.round,
            hands: self.state.hands.clone(),
            pickup_cards: self.state.pickup_cards.clone(),
            current_player_id: self.state.current_player_id(),
            players_stats: self.state.stats.clone(),
            start_delay: delay.as_millis() as u64,
        });
        self.phase = Phase::StartDelay { until: now + delay };
    }

    fn finish_match(&mut self) {
        let (winner, places) = scoring::final_standings(&self.state);
        if let Some(stats) = self.state.stats.get_mut(&winner) {
            stats.status = PlayerStatus::Winner;
        }
        let final_scores = self
            .state
            .stats
            .iter()
            .map(|(id, s)| (*id, s.score))
            .collect();

        info!(room = %self.room_id, %winner, "match ended");
        self.broadcast(Event::GameEnded {
            winner,
            final_scores,
            players_stats: self.state.stats.clone(),
            places,
        });
        self.phase = Phase::MatchEnded {
            votes: HashSet::new(),
        };
    }
}

impl Engine {
    /// Handle a `slap_down` command. Slaps with no window open, or past the
    /// window's deadline, expire silently.
    pub fn slap_down(&mut self, player: Uuid, card: Card, now: Instant) {
        let Some(window) = self.slap else {
            debug!(room = %self.room_id, %player, "slap with no window open");
            return;
        };
        if now > window.deadline {
            self.slap = None;
            return;
        }
        if window.player != player || window.card != card {
            return self.reject(player, GameError::InvalidSlap);
        }

        let side = combos::slap_down_valid_from(&self.state.pickup_cards, card);
        if side == SlapSide::None {
            return self.reject(player, GameError::InvalidSlap);
        }

        let selected_cards_positions = self.state.positions_in_hand(player, &[card]);
        let amount_before = self.state.hand_len(player);
        self.state.remove_from_hand(player, &[card]);
        match side {
            SlapSide::Left => self.state.pickup_cards.insert(0, card),
            SlapSide::Right => self.state.pickup_cards.push(card),
            SlapSide::None => unreachable!(),
        }
        self.slap = None;

        debug!(room = %self.room_id, %player, %card, "slap-down accepted");
        self.broadcast(Event::PlayerDrew {
            player_id: player,
            source: DrawSource::Slap,
            hands: self.state.hands.clone(),
            pickup_cards: self.state.pickup_cards.clone(),
            card: Some(card),
            selected_cards_positions,
            amount_before,
            current_player_id: self.state.current_player_id(),
            slap_down_active_for: None,
        });
    }

    /// Handle a `player_wants_to_play_again` vote after the match ends.
    pub fn play_again(&mut self, player: Uuid, now: Instant) {
        {
            let Phase::MatchEnded { votes } = &mut self.phase else {
                return self.reject(player, GameError::MatchStillRunning);
            };
            if self.state.stats.get(&player).map(|s| s.status) == Some(PlayerStatus::Leave) {
                return;
            }
            if self.state.stats.get(&player).is_none() {
                return;
            }
            votes.insert(player);
        }
        self.state.set_status(player, PlayerStatus::PlayAgain);

        self.broadcast(Event::SetPlayersStatsData {
            room_id: self.room_id.clone(),
            player_id: player,
            players_stats: self.state.stats.clone(),
        });

        self.maybe_restart(now);
    }

    fn maybe_restart(&mut self, now: Instant) {
        let Phase::MatchEnded { votes } = &self.phase else {
            return;
        };

        let humans_remaining = self
            .state
            .players
            .iter()
            .filter(|p| !p.is_bot && self.state.status_of(p.id) != PlayerStatus::Leave)
            .count();
        let bots = self.state.players.iter().filter(|p| p.is_bot).count();

        let everyone_voted = humans_remaining > 0 && votes.len() >= humans_remaining;
        if !everyone_voted || votes.len() + bots < 2 {
            return;
        }

        info!(room = %self.room_id, "all remaining players voted to play again");
        self.state.reset_match();
        let deck = self.fresh_deck();
        self.state.deal_from(deck);

        let delay = first_deal_delay(self.state.active_count());
        self.broadcast(Event::GameInitialized {
            players: self.state.players.clone(),
            hands: self.state.hands.clone(),
            pickup_cards: self.state.pickup_cards.clone(),
            current_player_id: self.state.current_player_id(),
            start_delay: delay.as_millis() as u64,
        });
        self.phase = Phase::StartDelay { until: now + delay };
    }

    /// A player left mid-match or while the rematch vote was open.
    pub fn leave(&mut self, player: Uuid, now: Instant) {
        if !self.state.stats.contains_key(&player) {
            return;
        }
        info!(room = %self.room_id, %player, "player left the game");

        if self.slap.is_some_and(|w| w.player == player) {
            self.slap = None;
        }

        if let Phase::MatchEnded { votes } = &mut self.phase {
            votes.remove(&player);
            self.state.set_status(player, PlayerStatus::Leave);
            self.maybe_restart(now);
            return;
        }

        let was_current = self.state.current_player_id() == player;
        self.state.set_status(player, PlayerStatus::Leave);
        self.state.discard_hand(player);

        if self.state.active_count() < 2 {
            self.finish_match();
            return;
        }

        if was_current {
            self.state.advance_turn();
            if matches!(self.phase, Phase::AwaitingTurn { .. }) {
                self.begin_turn(now);
            }
        }
    }
}

impl Engine {
    fn reject(&mut self, player: Uuid, err: GameError) {
        debug!(room = %self.room_id, %player, %err, "command rejected");
        self.send(
            player,
            Event::GameError {
                message: err.to_string(),
            },
        );
    }

    fn broadcast(&mut self, event: Event) {
        self.out.push_back(Outgoing {
            target: Target::All,
            event,
        });
    }

    fn send(&mut self, to: Uuid, event: Event) {
        self.out.push_back(Outgoing {
            target: Target::One(to),
            event,
        });
    }
}
