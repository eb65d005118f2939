//! Shared lookup state: which rooms exist and which room each player is in.
//!
//! Both maps sit behind short-lived locks used only for insert, lookup and
//! remove. Everything stateful about a room happens on its own task.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::players::Player;
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::config::MAX_PLAYERS;
use crate::room::{RoomCommand, RoomStatus};

pub const ROOM_CODE_LEN: usize = 6;

pub struct RoomHandle {
    pub tx: mpsc::Sender<RoomCommand>,
    pub status: Arc<RoomStatus>,
    pub public: bool,
}

#[derive(Default)]
pub struct Registry {
    rooms: Mutex<HashMap<String, RoomHandle>>,
    players: Mutex<HashMap<Uuid, String>>,
}

impl Registry {
    /// Insert a new room under a fresh code, built by `make` once the code
    /// is reserved.
    pub fn insert_room<F>(&self, make: F) -> String
    where
        F: FnOnce(String) -> RoomHandle,
    {
        let mut rooms = self.rooms.lock();
        let code = loop {
            let candidate = room_code(&mut rand::thread_rng());
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        rooms.insert(code.clone(), make(code.clone()));
        code
    }

    pub fn room_sender(&self, room_id: &str) -> Option<mpsc::Sender<RoomCommand>> {
        self.rooms.lock().get(room_id).map(|h| h.tx.clone())
    }

    /// A public room still gathering players, with a seat free.
    pub fn open_public_room(&self) -> Option<mpsc::Sender<RoomCommand>> {
        self.rooms
            .lock()
            .values()
            .find(|h| {
                h.public
                    && !h.status.started.load(Ordering::Relaxed)
                    && h.status.players.load(Ordering::Relaxed) < MAX_PLAYERS
            })
            .map(|h| h.tx.clone())
    }

    pub fn room_of(&self, player_id: Uuid) -> Option<String> {
        self.players.lock().get(&player_id).cloned()
    }

    pub fn map_player(&self, player_id: Uuid, room_id: &str) {
        self.players.lock().insert(player_id, room_id.to_string());
    }

    /// Unmap only when the player still belongs to this room, so a leave
    /// racing a join elsewhere cannot clobber the fresh mapping.
    pub fn unmap_player(&self, player_id: Uuid, room_id: &str) {
        let mut players = self.players.lock();
        if players.get(&player_id).is_some_and(|r| r == room_id) {
            players.remove(&player_id);
        }
    }

    pub fn deregister_room(&self, room_id: &str, members: &[Player]) {
        debug!(room = %room_id, "deregistering room");
        self.rooms.lock().remove(room_id);
        let mut players = self.players.lock();
        for member in members {
            if players.get(&member.id).is_some_and(|r| r == room_id) {
                players.remove(&member.id);
            }
        }
    }
}

/// Uniform 6-character alphanumeric room code.
fn room_code<R: Rng>(rng: &mut R) -> String {
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .take(ROOM_CODE_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_codes_are_six_alphanumerics() {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let code = room_code(&mut rng);
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn unmap_is_conditional_on_the_room() {
        let registry = Registry::default();
        let id = Uuid::new_v4();
        registry.map_player(id, "AAAAAA");
        registry.unmap_player(id, "BBBBBB");
        assert_eq!(registry.room_of(id), Some("AAAAAA".to_string()));
        registry.unmap_player(id, "AAAAAA");
        assert_eq!(registry.room_of(id), None);
    }
}
