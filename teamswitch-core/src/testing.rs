//! In-memory RCON backend for unit and integration testing.
//!
//! [`FakeRcon`] holds a roster and faction counts behind a mutex. Clones share
//! state, so a test can keep one handle while a [`Backend`] owns another and
//! change the server between queue cycles.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{Backend, BoxFuture, FetchResult, RconApi};
use crate::error::FetchError;
use crate::models::{FactionCounts, RosterEntry};

#[derive(Default)]
struct FakeState {
    roster: Vec<RosterEntry>,
    counts: FactionCounts,
    roster_error: Option<FetchError>,
    counts_error: Option<FetchError>,
    switch_result: Option<FetchResult<bool>>,
    hang: bool,
    panic_next_switch: bool,
    switched: Vec<String>,
    roster_calls: usize,
}

#[derive(Clone, Default)]
pub struct FakeRcon {
    state: Arc<Mutex<FakeState>>,
}

/// Roster row with the usual CRCON shape: keyed and identified by the steam id.
pub fn player(id: &str, name: &str, team: &str) -> RosterEntry {
    RosterEntry {
        key: id.to_string(),
        ids: vec![id.to_string()],
        name: Some(name.to_string()),
        aliases: Vec::new(),
        team: (!team.is_empty()).then(|| team.to_string()),
    }
}

impl FakeRcon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a handle to this fake in a named backend.
    pub fn backend(&self, name: &str) -> Backend {
        Backend::new(name, Arc::new(self.clone()))
    }

    pub fn with_player(self, entry: RosterEntry) -> Self {
        self.add_player(entry);
        self
    }

    pub fn with_counts(self, allies: u32, axis: u32) -> Self {
        self.set_counts(allies, axis);
        self
    }

    pub fn add_player(&self, entry: RosterEntry) {
        self.lock().roster.push(entry);
    }

    pub fn remove_player(&self, key: &str) {
        self.lock().roster.retain(|entry| entry.key != key);
    }

    pub fn set_counts(&self, allies: u32, axis: u32) {
        self.lock().counts = FactionCounts { allies, axis };
    }

    pub fn fail_roster(&self, error: Option<FetchError>) {
        self.lock().roster_error = error;
    }

    pub fn fail_counts(&self, error: Option<FetchError>) {
        self.lock().counts_error = error;
    }

    /// Override what `command_switch` answers. Default is `Ok(true)`.
    pub fn set_switch_result(&self, result: FetchResult<bool>) {
        self.lock().switch_result = Some(result);
    }

    /// Make every call pend forever.
    pub fn hang(&self, hang: bool) {
        self.lock().hang = hang;
    }

    /// Make the next `command_switch` panic instead of answering.
    pub fn panic_next_switch(&self) {
        self.lock().panic_next_switch = true;
    }

    /// Player ids `command_switch` was called with, in order.
    pub fn switched(&self) -> Vec<String> {
        self.lock().switched.clone()
    }

    pub fn roster_calls(&self) -> usize {
        self.lock().roster_calls
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RconApi for FakeRcon {
    fn fetch_roster(&self) -> BoxFuture<'_, FetchResult<Vec<RosterEntry>>> {
        let mut state = self.lock();
        state.roster_calls += 1;
        if state.hang {
            return Box::pin(std::future::pending());
        }
        let result = match &state.roster_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.roster.clone()),
        };
        Box::pin(async move { result })
    }

    fn fetch_faction_counts(&self) -> BoxFuture<'_, FetchResult<FactionCounts>> {
        let state = self.lock();
        if state.hang {
            return Box::pin(std::future::pending());
        }
        let result = match &state.counts_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.counts),
        };
        Box::pin(async move { result })
    }

    fn command_switch<'a>(&'a self, player_id: &'a str) -> BoxFuture<'a, FetchResult<bool>> {
        let mut state = self.lock();
        if state.hang {
            return Box::pin(std::future::pending());
        }
        if std::mem::take(&mut state.panic_next_switch) {
            drop(state);
            panic!("fake rcon: switch of {player_id} blew up");
        }
        state.switched.push(player_id.to_string());
        let result = state.switch_result.clone().unwrap_or(Ok(true));
        Box::pin(async move { result })
    }
}
