mod backend;
mod cache;
mod capacity;
mod error;
mod executor;
mod models;
mod processor;
mod queue;
mod resolver;
pub mod testing;

pub use backend::{
  Backend, BackendRegistry, BoxFuture, DEFAULT_CALL_TIMEOUT, FetchResult, RconApi, RegistryBuilder,
};
pub use cache::{ListedPlayer, PlayerList, PlayerListBuilder, PlayerListCache};
pub use capacity::{Admission, CapacityGate, DEFAULT_CAPACITY_THRESHOLD};
pub use error::{CoreError, FetchError, Result};
pub use executor::{Execution, execute};
pub use models::{
  Faction, FactionCounts, FactionFilter, Listing, ListingSection, PlayerRecord, QueuedSwitch,
  RosterEntry, SwitchOutcome, SwitchRequest,
};
pub use processor::{CycleOutcome, DEFAULT_QUEUE_INTERVAL, QueueProcessor};
pub use queue::{AdmissionQueue, MAX_QUEUE_LEN};
pub use resolver::{BackendFailure, Resolution, find_in_roster, resolve};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Admission policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
  /// Headcount at which a faction counts as full
  pub capacity_threshold: u32,
  /// Pause between two queue cycles
  pub queue_interval: Duration,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      capacity_threshold: DEFAULT_CAPACITY_THRESHOLD,
      queue_interval: DEFAULT_QUEUE_INTERVAL,
    }
  }
}

/// Owns all shared switch state: backends, admission queue and player listing.
///
/// Command handlers call into it concurrently; the queue processor it hands
/// out shares the same queue.
pub struct SwitchCoordinator {
  registry: Arc<BackendRegistry>,
  queue: Arc<AdmissionQueue>,
  players: PlayerListCache,
  gate: CapacityGate,
  queue_interval: Duration,
  processor_started: AtomicBool,
}

impl SwitchCoordinator {
  pub fn new(registry: BackendRegistry, settings: Settings) -> Self {
    Self {
      registry: Arc::new(registry),
      queue: Arc::new(AdmissionQueue::new()),
      players: PlayerListCache::new(),
      gate: CapacityGate::new(settings.capacity_threshold),
      queue_interval: settings.queue_interval,
      processor_started: AtomicBool::new(false),
    }
  }

  pub fn registry(&self) -> &BackendRegistry {
    &self.registry
  }

  pub fn capacity_threshold(&self) -> u32 {
    self.gate.threshold()
  }

  // ========================================================================
  // Switch requests
  // ========================================================================

  /// Move a player to the opposite of their current faction, now or later.
  pub async fn request_switch(&self, request: SwitchRequest) -> Result<SwitchOutcome> {
    let resolution = resolve(
      self.registry.all(),
      &request.player_id,
      request.player_name.as_deref(),
    )
    .await;

    match resolution {
      Resolution::Found(record) => self.admit(record, request.requester).await,
      Resolution::NotFound { failures } => {
        let player = request.player_name.unwrap_or(request.player_id);
        info!(%player, skipped_backends = failures.len(), "switch requested for absent player");
        Ok(SwitchOutcome::NotPresent { player })
      }
    }
  }

  async fn admit(&self, record: PlayerRecord, requester: String) -> Result<SwitchOutcome> {
    let Some(current) = record.faction else {
      info!(player = %record.name, "player has no faction");
      return Ok(SwitchOutcome::NoFaction { player: record.name });
    };
    let target = current.opposite();

    let admission = self
      .gate
      .check(&record.backend, target)
      .await
      .map_err(|source| CoreError::Fetch {
        backend: record.backend.name().to_string(),
        source,
      })?;

    match admission {
      Admission::Admit => {
        let player = record.name;
        Ok(match execute(&record.backend, &record.id).await {
          Execution::Success => SwitchOutcome::Switched { player },
          Execution::Failure => SwitchOutcome::SwitchFailed { player },
        })
      }
      Admission::Defer => {
        let queued = QueuedSwitch {
          player_id: record.id,
          player_name: record.name.clone(),
          target,
          requester,
        };
        if self.queue.try_enqueue(queued) {
          info!(player = %record.name, %target, queued = self.queue.len(), "switch deferred");
          Ok(SwitchOutcome::Queued {
            player: record.name,
            target,
          })
        } else {
          info!(player = %record.name, "admission queue full");
          Ok(SwitchOutcome::QueueFull {
            player: record.name,
          })
        }
      }
    }
  }

  /// Switch a player picked by number from the latest listing.
  ///
  /// The number is read against `generation` when given, otherwise against
  /// the listing `requester` was last shown. Either way it must still be the
  /// latest listing, so an old number never lands on a different player.
  pub async fn switch_by_number(
    &self,
    number: usize,
    generation: Option<u64>,
    requester: String,
  ) -> Result<SwitchOutcome> {
    let generation = match generation {
      Some(generation) => generation,
      None => self
        .players
        .seen_by(&requester)
        .await
        .ok_or(CoreError::UnknownNumber(number))?,
    };
    let entry = self.players.lookup(number, Some(generation))?;
    let player_id = entry
      .player_id
      .filter(|id| !id.trim().is_empty())
      .ok_or(CoreError::MissingPlayerId(number))?;
    debug!(number, %player_id, backend = entry.backend.name(), "switch by number");

    self
      .request_switch(SwitchRequest {
        player_id,
        player_name: Some(entry.name),
        requester,
      })
      .await
  }

  // ========================================================================
  // Player listing
  // ========================================================================

  /// List players on every backend and replace the numbered cache.
  ///
  /// Numbers continue across backends. A backend that cannot be read gets a
  /// failed section; the others are still listed. `requester` is remembered
  /// as having seen this listing.
  pub async fn list_players(&self, filter: FactionFilter, requester: &str) -> Listing {
    let mut builder = PlayerListBuilder::default();
    let mut sections = Vec::with_capacity(self.registry.len());

    for backend in self.registry.all() {
      let roster = match backend.roster().await {
        Ok(roster) => roster,
        Err(error) => {
          warn!(backend = backend.name(), %error, "could not list players");
          sections.push(ListingSection {
            backend: backend.name().to_string(),
            players: Err(error),
          });
          continue;
        }
      };

      let players = roster
        .iter()
        .filter(|entry| filter.matches(entry.faction()))
        .map(|entry| {
          let name = entry.display_name();
          let number = builder.push(backend, entry.player_id(), name.clone(), entry.faction());
          (number, name)
        })
        .collect();
      sections.push(ListingSection {
        backend: backend.name().to_string(),
        players: Ok(players),
      });
    }

    let list = self.players.publish(builder);
    self.players.mark_seen(requester, list.generation()).await;
    debug!(generation = list.generation(), players = list.len(), "player list rebuilt");
    Listing {
      generation: list.generation(),
      filter,
      sections,
    }
  }

  pub fn player_list(&self) -> Arc<PlayerList> {
    self.players.current()
  }

  // ========================================================================
  // Queue
  // ========================================================================

  pub fn queue_snapshot(&self) -> Vec<QueuedSwitch> {
    self.queue.snapshot()
  }

  /// A processor bound to this coordinator's queue. Does not start anything.
  pub fn processor(&self, notices: UnboundedSender<SwitchOutcome>) -> QueueProcessor {
    QueueProcessor::new(
      Arc::clone(&self.registry),
      Arc::clone(&self.queue),
      self.gate,
      self.queue_interval,
      notices,
    )
  }

  /// Spawn the background queue loop. Only the first call starts one.
  pub fn start_processor(&self, notices: UnboundedSender<SwitchOutcome>) -> Option<JoinHandle<()>> {
    if self.processor_started.swap(true, Ordering::SeqCst) {
      warn!("queue processor already running");
      return None;
    }
    Some(tokio::spawn(self.processor(notices).run()))
  }
}
