//! Outbound fan-out: one queue per connected player.
//!
//! Rooms broadcast to their member lists; the transport adapter drains each
//! player's receiver. Senders are cloned out of the map before awaiting so
//! the lock is never held across a send.

use std::{collections::HashMap, sync::Arc};

use common::event::server::Event;
use futures::future::JoinAll;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

#[derive(Clone, Default)]
pub struct Channels {
    map: Arc<RwLock<HashMap<Uuid, mpsc::Sender<Event>>>>,
}

impl Channels {
    /// Register a connected player, returning the stream of their events.
    pub fn register(&self, id: Uuid) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        self.map.write().insert(id, tx);
        rx
    }

    pub fn remove(&self, id: Uuid) {
        self.map.write().remove(&id);
    }

    pub async fn send(&self, id: Uuid, event: Event) {
        let sender = self.map.read().get(&id).cloned();
        if let Some(sender) = sender {
            trace!(%id, "sending event");
            let _ = sender.send(event).await;
        }
    }

    pub async fn broadcast(&self, ids: &[Uuid], event: Event) {
        let senders: Vec<(Uuid, mpsc::Sender<Event>)> = {
            let map = self.map.read();
            ids.iter()
                .filter_map(|id| map.get(id).cloned().map(|tx| (*id, tx)))
                .collect()
        };

        senders
            .into_iter()
            .map(|(id, sender)| {
                let event = event.clone();
                async move {
                    trace!(%id, "broadcasting event");
                    let _ = sender.send(event).await;
                }
            })
            .collect::<JoinAll<_>>()
            .await;
    }
}
