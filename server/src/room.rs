//! The per-room actor task.
//!
//! Each room owns its state on a dedicated task fed by an `mpsc` command
//! queue, so no two mutations of the same room ever interleave. Timers are
//! deadlines the task sleeps towards between commands; a deadline whose
//! state was superseded simply no longer exists when the task wakes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::config::{defaults, RoomConfig};
use common::event::client::TurnAction;
use common::event::server::Event;
use common::players::{Player, RoomPhase};
use common::{Card, Difficulty};
use game::{Engine, Target};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channels::Channels;
use crate::config::{MAX_PLAYERS, MIN_PLAYERS};
use crate::error::RoomError;
use crate::registry::Registry;

const COMMAND_CAPACITY: usize = 64;

/// Commands a room accepts, already attributed to a player by the registry.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        player: Player,
    },
    Leave {
        player_id: Uuid,
        is_admin: bool,
    },
    Vote {
        nick_name: String,
        config: RoomConfig,
    },
    StartPrivate {
        player_id: Uuid,
    },
    GetState {
        player_id: Uuid,
    },
    Turn {
        player_id: Uuid,
        action: TurnAction,
        selected_cards: Vec<Card>,
    },
    CallYaniv {
        player_id: Uuid,
    },
    SlapDown {
        player_id: Uuid,
        card: Card,
    },
    PlayAgain {
        player_id: Uuid,
    },
}

/// Lock-free occupancy snapshot the matchmaker reads under the registry
/// lock without touching the room task.
#[derive(Default)]
pub struct RoomStatus {
    pub players: AtomicUsize,
    pub started: AtomicBool,
}

enum RoomState {
    Waiting { start_at: Option<Instant> },
    Playing(Engine),
}

pub struct Room {
    id: String,
    public: bool,
    config: RoomConfig,
    admin: Option<Uuid>,
    players: Vec<Player>,
    /// Bots seated together with the creator of a bot room.
    pending_bots: Vec<Player>,
    auto_start: bool,
    votes: std::collections::HashMap<String, RoomConfig>,
    phase: RoomState,
    bot_turn_at: Option<Instant>,
    bot_think: Duration,
    ever_joined: bool,
    channels: Channels,
    registry: Arc<Registry>,
    status: Arc<RoomStatus>,
}

impl Room {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        public: bool,
        config: RoomConfig,
        bots: Vec<Difficulty>,
        bot_think: Duration,
        channels: Channels,
        registry: Arc<Registry>,
        status: Arc<RoomStatus>,
    ) -> Self {
        let pending_bots: Vec<Player> = bots
            .iter()
            .enumerate()
            .map(|(i, &difficulty)| Player::bot(format!("Bot {}", i + 1), (i + 1) as u8, difficulty))
            .collect();
        let auto_start = !pending_bots.is_empty();

        Room {
            id,
            public,
            config,
            admin: None,
            players: Vec::new(),
            pending_bots,
            auto_start,
            votes: std::collections::HashMap::new(),
            phase: RoomState::Waiting { start_at: None },
            bot_turn_at: None,
            bot_think,
            ever_joined: false,
            channels,
            registry,
            status,
        }
    }

    pub fn spawn(self) -> mpsc::Sender<RoomCommand> {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        tokio::spawn(self.run(rx));
        tx
    }

    async fn run(mut self, mut rx: mpsc::Receiver<RoomCommand>) {
        info!(room = %self.id, public = self.public, "room opened");

        loop {
            self.pump().await;

            let command = match self.next_deadline() {
                Some(deadline) => match time::timeout_at(deadline.into(), rx.recv()).await {
                    Ok(command) => command,
                    Err(_) => {
                        self.on_deadline(Instant::now()).await;
                        continue;
                    }
                },
                None => rx.recv().await,
            };

            match command {
                Some(command) => self.handle(command).await,
                None => break,
            }

            if self.ever_joined && self.humans().is_empty() {
                break;
            }
        }

        self.registry.deregister_room(&self.id, &self.players);
        info!(room = %self.id, "room closed");
    }

    fn humans(&self) -> Vec<Uuid> {
        self.players
            .iter()
            .filter(|p| !p.is_bot)
            .map(|p| p.id)
            .collect()
    }

    /// Drain engine events out to the members, scheduling bot turns as the
    /// announcements pass by.
    async fn pump(&mut self) {
        let RoomState::Playing(engine) = &mut self.phase else {
            return;
        };

        let mut outgoing = Vec::new();
        while let Some(out) = engine.poll() {
            outgoing.push(out);
        }

        for out in &outgoing {
            if let Event::TurnStarted {
                current_player_id, ..
            } = &out.event
            {
                let is_bot = engine
                    .state()
                    .players
                    .iter()
                    .any(|p| p.id == *current_player_id && p.is_bot);
                self.bot_turn_at = is_bot.then(|| Instant::now() + self.bot_think);
            }
        }

        let members = self.humans();
        for out in outgoing {
            match out.target {
                Target::All => self.channels.broadcast(&members, out.event).await,
                Target::One(id) => self.channels.send(id, out.event).await,
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        match &self.phase {
            RoomState::Waiting { start_at } => *start_at,
            RoomState::Playing(engine) => match (engine.wait_deadline(), self.bot_turn_at) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (engine, bot) => engine.or(bot),
            },
        }
    }

    async fn on_deadline(&mut self, now: Instant) {
        let quick_start_due = matches!(
            &self.phase,
            RoomState::Waiting { start_at: Some(at) } if now >= *at
        );
        if quick_start_due {
            if let RoomState::Waiting { start_at } = &mut self.phase {
                *start_at = None;
            }
            let config = vote_majority(&self.votes);
            info!(room = %self.id, ?config, "quick game countdown elapsed");
            self.start_game(config, now).await;
            return;
        }

        if self.bot_turn_at.is_some_and(|at| now >= at) {
            self.bot_turn_at = None;
            self.drive_bot(now);
            return;
        }

        if let RoomState::Playing(engine) = &mut self.phase {
            engine.handle_deadline(now);
        }
    }

    fn drive_bot(&mut self, now: Instant) {
        let RoomState::Playing(engine) = &mut self.phase else {
            return;
        };
        let Some((id, is_bot, difficulty)) = engine
            .awaiting_turn()
            .map(|p| (p.id, p.is_bot, p.difficulty))
        else {
            return;
        };
        if !is_bot {
            return;
        }

        let hand = engine.state().hand(id).to_vec();
        let pile = engine.state().pickup_cards.clone();
        let threshold = engine.state().config.can_call_yaniv;
        let difficulty = difficulty.unwrap_or(Difficulty::Medium);

        if bot::should_call_yaniv(&hand, threshold) {
            engine.call_yaniv(id, now);
        } else {
            let turn = bot::take_turn(&hand, &pile, difficulty);
            engine.complete_turn(id, turn.action, turn.selected_cards, now);
        }
    }

    async fn handle(&mut self, command: RoomCommand) {
        let now = Instant::now();
        match command {
            RoomCommand::Join { player } => self.handle_join(player, now).await,
            RoomCommand::Leave {
                player_id,
                is_admin,
            } => self.handle_leave(player_id, is_admin, now).await,
            RoomCommand::Vote { nick_name, config } => self.handle_vote(nick_name, config).await,
            RoomCommand::StartPrivate { player_id } => {
                self.handle_start_private(player_id, now).await
            }
            RoomCommand::GetState { player_id } => self.handle_get_state(player_id).await,
            RoomCommand::Turn {
                player_id,
                action,
                selected_cards,
            } => match &mut self.phase {
                RoomState::Playing(engine) => {
                    engine.complete_turn(player_id, action, selected_cards, now)
                }
                RoomState::Waiting { .. } => self.room_error(player_id, RoomError::NotStarted).await,
            },
            RoomCommand::CallYaniv { player_id } => match &mut self.phase {
                RoomState::Playing(engine) => engine.call_yaniv(player_id, now),
                RoomState::Waiting { .. } => self.room_error(player_id, RoomError::NotStarted).await,
            },
            RoomCommand::SlapDown { player_id, card } => match &mut self.phase {
                RoomState::Playing(engine) => engine.slap_down(player_id, card, now),
                RoomState::Waiting { .. } => self.room_error(player_id, RoomError::NotStarted).await,
            },
            RoomCommand::PlayAgain { player_id } => match &mut self.phase {
                RoomState::Playing(engine) => engine.play_again(player_id, now),
                RoomState::Waiting { .. } => self.room_error(player_id, RoomError::NotStarted).await,
            },
        }
    }

    async fn handle_join(&mut self, mut player: Player, now: Instant) {
        if self.status.started.load(Ordering::Relaxed) {
            return self.room_error(player.id, RoomError::AlreadyStarted).await;
        }
        if self.players.len() >= MAX_PLAYERS {
            return self
                .room_error(player.id, RoomError::Full(self.id.clone()))
                .await;
        }

        let first = self.players.is_empty();
        if first {
            self.admin = Some(player.id);
            self.ever_joined = true;
        }

        player.avatar_index = (self.players.len() % MAX_PLAYERS) as u8;
        let joined = player.clone();
        self.players.push(player);
        if first {
            // a bot room seats its table the moment the creator arrives
            self.players.append(&mut self.pending_bots);
        }

        self.status
            .players
            .store(self.players.len(), Ordering::Relaxed);
        self.registry.map_player(joined.id, &self.id);

        info!(room = %self.id, player = %joined.id, nick = %joined.nick_name, "player joined");
        let event = if first {
            Event::RoomCreated {
                room_id: self.id.clone(),
                config: self.config,
                players: self.players.clone(),
            }
        } else {
            Event::PlayerJoined {
                room_id: self.id.clone(),
                player: joined,
                players: self.players.clone(),
            }
        };
        self.broadcast(event).await;

        if self.auto_start {
            self.auto_start = false;
            let config = self.config;
            self.start_game(config, now).await;
            return;
        }

        if self.public {
            if self.players.len() == MAX_PLAYERS {
                let config = vote_majority(&self.votes);
                self.start_game(config, now).await;
            } else {
                self.restage(now);
            }
        }
    }

    async fn handle_leave(&mut self, player_id: Uuid, is_admin: bool, now: Instant) {
        let Some(index) = self.players.iter().position(|p| p.id == player_id) else {
            return;
        };
        // the leaver still hears their own departure confirmed
        let recipients = self.humans();
        let player = self.players.remove(index);
        self.votes.remove(&player.nick_name);
        self.status
            .players
            .store(self.players.len(), Ordering::Relaxed);
        self.registry.unmap_player(player_id, &self.id);

        info!(room = %self.id, player = %player_id, "player left");
        self.channels
            .broadcast(
                &recipients,
                Event::PlayerLeft {
                    room_id: self.id.clone(),
                    player_id,
                    players: self.players.clone(),
                },
            )
            .await;

        match &mut self.phase {
            RoomState::Waiting { .. } => {
                if is_admin && !self.public {
                    // the creator closing a private lobby disbands it
                    warn!(room = %self.id, "admin closed the room");
                    self.broadcast(Event::RoomError {
                        message: RoomError::Closed.to_string(),
                    })
                    .await;
                    for p in std::mem::take(&mut self.players) {
                        self.registry.unmap_player(p.id, &self.id);
                    }
                    self.status.players.store(0, Ordering::Relaxed);
                } else if self.public {
                    self.restage(now);
                }
            }
            RoomState::Playing(engine) => {
                engine.leave(player_id, now);
            }
        }
    }

    async fn handle_vote(&mut self, nick_name: String, config: RoomConfig) {
        if !matches!(self.phase, RoomState::Waiting { .. }) || !self.public {
            return;
        }
        if !self.players.iter().any(|p| p.nick_name == nick_name) {
            return;
        }
        debug!(room = %self.id, %nick_name, ?config, "config vote");
        self.votes.insert(nick_name, config);
        self.broadcast(Event::VotesConfig {
            room_id: self.id.clone(),
            votes: self.votes.clone(),
        })
        .await;
    }

    async fn handle_start_private(&mut self, player_id: Uuid, now: Instant) {
        if !matches!(self.phase, RoomState::Waiting { .. }) {
            return self.room_error(player_id, RoomError::AlreadyStarted).await;
        }
        if self.public || self.admin != Some(player_id) {
            return self.room_error(player_id, RoomError::NotAdmin).await;
        }
        if self.players.len() < MIN_PLAYERS {
            return self
                .room_error(player_id, RoomError::NotEnoughPlayers)
                .await;
        }
        let config = self.config;
        self.start_game(config, now).await;
    }

    async fn handle_get_state(&mut self, player_id: Uuid) {
        let game_state = match self.phase {
            RoomState::Waiting { .. } => RoomPhase::Waiting,
            RoomState::Playing(_) => RoomPhase::Started,
        };
        self.channels
            .send(
                player_id,
                Event::RoomState {
                    room_id: self.id.clone(),
                    config: self.config,
                    players: self.players.clone(),
                    game_state,
                },
            )
            .await;
    }

    async fn start_game(&mut self, config: RoomConfig, now: Instant) {
        if self.status.started.load(Ordering::Relaxed) {
            return;
        }
        if self.players.len() < MIN_PLAYERS {
            debug!(room = %self.id, "start requested without enough players");
            return;
        }

        self.config = config;
        self.status.started.store(true, Ordering::Relaxed);
        info!(room = %self.id, players = self.players.len(), "game starting");

        self.broadcast(Event::StartGame {
            room_id: self.id.clone(),
            config,
            players: self.players.clone(),
        })
        .await;

        self.phase = RoomState::Playing(Engine::new(
            self.id.clone(),
            self.players.clone(),
            config,
            now,
        ));
    }

    /// Reschedule the quick-game countdown for the current headcount.
    fn restage(&mut self, now: Instant) {
        let RoomState::Waiting { start_at } = &mut self.phase else {
            return;
        };
        *start_at = quick_start_delay(self.players.len()).map(|delay| now + delay);
        match start_at {
            Some(_) => debug!(room = %self.id, players = self.players.len(), "start countdown staged"),
            None => debug!(room = %self.id, "start countdown cancelled"),
        }
    }

    async fn room_error(&self, player_id: Uuid, err: RoomError) {
        debug!(room = %self.id, player = %player_id, %err, "room command rejected");
        self.channels
            .send(
                player_id,
                Event::RoomError {
                    message: err.to_string(),
                },
            )
            .await;
    }

    async fn broadcast(&self, event: Event) {
        self.channels.broadcast(&self.humans(), event).await;
    }
}

/// Countdown length after a membership change in a waiting public room.
fn quick_start_delay(players: usize) -> Option<Duration> {
    match players {
        0 | 1 => None,
        2 => Some(Duration::from_secs(3)),
        3 => Some(Duration::from_secs(10)),
        _ => Some(Duration::from_secs(7)),
    }
}

/// Field-wise strict majority over the cast votes, defaults otherwise.
fn vote_majority(votes: &std::collections::HashMap<String, RoomConfig>) -> RoomConfig {
    fn winner<T: std::hash::Hash + Eq + Copy>(
        values: impl Iterator<Item = T>,
        voters: usize,
    ) -> Option<T> {
        let mut counts: std::collections::HashMap<T, usize> = std::collections::HashMap::new();
        for value in values {
            *counts.entry(value).or_default() += 1;
        }
        counts
            .into_iter()
            .find(|(_, n)| *n * 2 > voters)
            .map(|(value, _)| value)
    }

    let voters = votes.len();
    RoomConfig {
        slap_down: winner(votes.values().map(|c| c.slap_down), voters)
            .unwrap_or(defaults::slap_down()),
        time_per_player: winner(votes.values().map(|c| c.time_per_player), voters)
            .unwrap_or(defaults::time_per_player()),
        can_call_yaniv: winner(votes.values().map(|c| c.can_call_yaniv), voters)
            .unwrap_or(defaults::can_call_yaniv()),
        max_match_points: winner(votes.values().map(|c| c.max_match_points), voters)
            .unwrap_or(defaults::max_match_points()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_tracks_headcount() {
        assert_eq!(quick_start_delay(0), None);
        assert_eq!(quick_start_delay(1), None);
        assert_eq!(quick_start_delay(2), Some(Duration::from_secs(3)));
        assert_eq!(quick_start_delay(3), Some(Duration::from_secs(10)));
        assert_eq!(quick_start_delay(4), Some(Duration::from_secs(7)));
        assert_eq!(quick_start_delay(8), Some(Duration::from_secs(7)));
    }

    #[test]
    fn vote_majority_is_per_field() {
        let mut votes = std::collections::HashMap::new();
        votes.insert(
            "a".to_string(),
            RoomConfig {
                slap_down: false,
                time_per_player: 30,
                ..RoomConfig::default()
            },
        );
        votes.insert(
            "b".to_string(),
            RoomConfig {
                slap_down: false,
                time_per_player: 10,
                ..RoomConfig::default()
            },
        );
        votes.insert(
            "c".to_string(),
            RoomConfig {
                slap_down: true,
                time_per_player: 20,
                ..RoomConfig::default()
            },
        );

        let config = vote_majority(&votes);
        // two of three voted slap-down off
        assert!(!config.slap_down);
        // no majority on turn time: the default wins
        assert_eq!(config.time_per_player, 15);
        assert_eq!(config.max_match_points, 100);
    }

    #[test]
    fn no_votes_means_defaults() {
        let votes = std::collections::HashMap::new();
        assert_eq!(vote_majority(&votes), RoomConfig::default());
    }
}
