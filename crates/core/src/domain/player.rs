//! Player identities and zone membership sets
//!
//! Players are identified by small non-negative integers handed out by the
//! session. Every override zone keeps the players it currently claims in a
//! [`PlayerList`], an ascending sorted set that replication can overwrite
//! wholesale.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a participant in the voice space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(i32);

impl PlayerId {
    /// Sentinel for "no player"
    pub const NONE: PlayerId = PlayerId(-1);

    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i32 {
        self.0
    }

    /// Negative ids never refer to a participant
    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for PlayerId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Sorted set of the players a zone currently claims
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerList {
    players: Vec<PlayerId>,
}

impl PlayerList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player, keeping ascending order.
    ///
    /// Returns false for invalid ids and for players already in the set.
    pub fn add(&mut self, player: PlayerId) -> bool {
        if !player.is_valid() {
            return false;
        }
        match self.players.binary_search(&player) {
            Ok(_) => false,
            Err(index) => {
                self.players.insert(index, player);
                true
            }
        }
    }

    /// Remove a player, returning whether it was a member
    pub fn remove(&mut self, player: PlayerId) -> bool {
        match self.players.binary_search(&player) {
            Ok(index) => {
                self.players.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.binary_search(&player).is_ok()
    }

    /// Members in ascending id order
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }
}

impl FromIterator<PlayerId> for PlayerList {
    fn from_iter<I: IntoIterator<Item = PlayerId>>(iter: I) -> Self {
        let mut list = PlayerList::new();
        for player in iter {
            list.add(player);
        }
        list
    }
}
