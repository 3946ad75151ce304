//! Per-listener ignore list
//!
//! Ignoring a speaker silences it for the local listener regardless of any
//! zone override. The registry is never cached by the resolver: every
//! resolution re-reads it.

use crate::domain::player::PlayerId;
use std::collections::BTreeSet;
use tracing::debug;

/// Set of speakers the listener chose to silence
#[derive(Debug, Clone, Default)]
pub struct IgnoreRegistry {
    ignored: BTreeSet<PlayerId>,
}

impl IgnoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore a player. Returns true if the player was not ignored before.
    pub fn ignore(&mut self, player: PlayerId) -> bool {
        let added = self.ignored.insert(player);
        if added {
            debug!(player = %player, "Player ignored");
        }
        added
    }

    /// Stop ignoring a player. Returns true if the player was ignored before.
    pub fn unignore(&mut self, player: PlayerId) -> bool {
        let removed = self.ignored.remove(&player);
        if removed {
            debug!(player = %player, "Player no longer ignored");
        }
        removed
    }

    pub fn is_ignored(&self, player: PlayerId) -> bool {
        self.ignored.contains(&player)
    }

    /// Ignored players in ascending id order
    pub fn ignored(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.ignored.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ignored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ignored.is_empty()
    }

    pub fn clear(&mut self) {
        self.ignored.clear();
    }
}
