// ── Room lookup ──

use std::collections::HashMap;

use crestron_api::RawRoom;

/// Room id to room name, rebuilt once per poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomTable {
    names: HashMap<i64, String>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw room records. Rooms without an id are ignored.
    pub fn from_rooms(rooms: impl IntoIterator<Item = RawRoom>) -> Self {
        let names = rooms
            .into_iter()
            .filter_map(|r| r.id.map(|id| (id, r.name)))
            .collect();
        Self { names }
    }

    pub fn name(&self, id: i64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
