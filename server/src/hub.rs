use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

const ROOM_CAPACITY: usize = 256;

struct Room {
    sender: broadcast::Sender<String>,
    peers: usize,
}

/// Fan-out table for collaboration sockets: one broadcast channel per
/// session id, dropped when its last peer leaves.
#[derive(Clone, Default)]
pub struct Hub {
    rooms: Arc<Mutex<HashMap<String, Room>>>,
}

/// A peer's membership in one room. Leaving happens on drop.
pub struct Membership {
    hub: Hub,
    session_id: String,
    sender: broadcast::Sender<String>,
}

impl Membership {
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// Send `frame` to every peer in the room, including this one.
    pub fn publish(&self, frame: String) {
        let _ = self.sender.send(frame);
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.hub.leave(&self.session_id);
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join `session_id`, creating its room on first use. Subscribe before
    /// publishing so the peer sees its own frames.
    pub fn join(&self, session_id: &str) -> Membership {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        let room = rooms.entry(session_id.to_string()).or_insert_with(|| Room {
            sender: broadcast::channel(ROOM_CAPACITY).0,
            peers: 0,
        });
        room.peers += 1;
        Membership {
            hub: self.clone(),
            session_id: session_id.to_string(),
            sender: room.sender.clone(),
        }
    }

    fn leave(&self, session_id: &str) {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(room) = rooms.get_mut(session_id) {
            room.peers = room.peers.saturating_sub(1);
            if room.peers == 0 {
                rooms.remove(session_id);
                log::debug!("collaboration room {} closed", session_id);
            }
        }
    }

    pub fn peer_count(&self, session_id: &str) -> usize {
        let rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms.get(session_id).map_or(0, |r| r.peers)
    }
}
