use tracing::debug;

use crate::backend::{Backend, FetchResult};
use crate::models::{Faction, FactionCounts};

/// Players a faction may hold before switches into it are deferred.
pub const DEFAULT_CAPACITY_THRESHOLD: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Defer,
}

/// Fixed-threshold admission policy. Deliberately ignores the server's own
/// max player setting.
#[derive(Debug, Clone, Copy)]
pub struct CapacityGate {
    threshold: u32,
}

impl CapacityGate {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn decide(&self, counts: FactionCounts, target: Faction) -> Admission {
        if counts.count(target) < self.threshold {
            Admission::Admit
        } else {
            Admission::Defer
        }
    }

    pub async fn check(&self, backend: &Backend, target: Faction) -> FetchResult<Admission> {
        let counts = backend.faction_counts().await?;
        let admission = self.decide(counts, target);
        debug!(
            backend = backend.name(),
            %target,
            allies = counts.allies,
            axis = counts.axis,
            ?admission,
            "capacity checked"
        );
        Ok(admission)
    }
}

impl Default for CapacityGate {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_THRESHOLD)
    }
}
