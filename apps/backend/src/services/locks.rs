//! Per-room action serialization.
//!
//! Every engine action for a room runs under that room's mutex, so
//! concurrent actions -- including duplicates from the same connection
//! -- are strictly ordered and can never interleave store writes.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct RoomLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, room_id: &str) -> Arc<Mutex<()>> {
        self.locks.entry(room_id.to_string()).or_default().clone()
    }

    /// Drop the entry once a room is deleted. In-flight guards keep the
    /// mutex alive through their own Arc.
    pub fn remove(&self, room_id: &str) {
        self.locks.remove(room_id);
    }
}
