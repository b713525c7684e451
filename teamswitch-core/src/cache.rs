//! Numbered player listing shared between `players` and `switch <number>`.
//!
//! A listing is assembled off to the side with [`PlayerListBuilder`] and then
//! published in one swap, so a concurrent lookup sees either the old listing
//! or the new one, never a partial one. Every publish bumps the generation;
//! lookups that name an older generation fail instead of landing on whoever
//! holds that number now.
//!
//! The cache also remembers which generation each requester was last shown,
//! so a bare number is always read against the listing that requester saw.

use std::sync::{Arc, RwLock};

use scc::HashMap;

use crate::backend::Backend;
use crate::error::CoreError;
use crate::models::Faction;

#[derive(Debug, Clone)]
pub struct ListedPlayer {
    pub number: usize,
    pub backend: Backend,
    /// Missing when the roster row carried no id at all
    pub player_id: Option<String>,
    pub name: String,
    pub faction: Option<Faction>,
}

impl ListedPlayer {
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

/// One published listing. Numbers are dense and start at 1.
#[derive(Debug, Default)]
pub struct PlayerList {
    generation: u64,
    entries: Vec<ListedPlayer>,
}

impl PlayerList {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, number: usize) -> Option<&ListedPlayer> {
        number
            .checked_sub(1)
            .and_then(|idx| self.entries.get(idx))
    }

    pub fn entries(&self) -> &[ListedPlayer] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct PlayerListBuilder {
    entries: Vec<ListedPlayer>,
}

impl PlayerListBuilder {
    /// Add a player and return the number it was given.
    pub fn push(
        &mut self,
        backend: &Backend,
        player_id: Option<String>,
        name: String,
        faction: Option<Faction>,
    ) -> usize {
        let number = self.entries.len() + 1;
        self.entries.push(ListedPlayer {
            number,
            backend: backend.clone(),
            player_id,
            name,
            faction,
        });
        number
    }
}

#[derive(Default)]
pub struct PlayerListCache {
    current: RwLock<Arc<PlayerList>>,
    /// requester -> generation of the listing they were last shown
    seen: HashMap<String, u64>,
}

impl PlayerListCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current listing wholesale.
    pub fn publish(&self, builder: PlayerListBuilder) -> Arc<PlayerList> {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let list = Arc::new(PlayerList {
            generation: current.generation + 1,
            entries: builder.entries,
        });
        *current = Arc::clone(&list);
        list
    }

    pub fn current(&self) -> Arc<PlayerList> {
        let current = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&current)
    }

    /// Resolve a number from a listing.
    ///
    /// When `generation` is given it must be the latest one, otherwise the
    /// number is treated as unknown.
    pub fn lookup(&self, number: usize, generation: Option<u64>) -> Result<ListedPlayer, CoreError> {
        let list = self.current();
        if generation.is_some_and(|g| g != list.generation) {
            return Err(CoreError::UnknownNumber(number));
        }
        list.get(number)
            .cloned()
            .ok_or(CoreError::UnknownNumber(number))
    }

    /// Record that `requester` was shown the listing `generation`.
    pub async fn mark_seen(&self, requester: &str, generation: u64) {
        let _ = self.seen.upsert_async(requester.to_string(), generation).await;
    }

    /// Generation of the listing `requester` was last shown, if any.
    pub async fn seen_by(&self, requester: &str) -> Option<u64> {
        self.seen.read_async(requester, |_, generation| *generation).await
    }
}
