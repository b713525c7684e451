use std::fmt;
use std::str::FromStr;

use crate::backend::Backend;
use crate::error::{CoreError, FetchError};

/// One of the two sides of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
  Axis,
  Allies,
}

impl Faction {
  /// Map a raw team string onto a faction.
  ///
  /// Matching is trimmed and case-insensitive: anything starting with `axis`
  /// is Axis, anything starting with `all` (which covers `ally`) is Allies.
  /// Everything else is rejected instead of being carried along unnormalized.
  pub fn normalize(raw: &str) -> Result<Self, CoreError> {
    let lowered = raw.trim().to_lowercase();
    if lowered.starts_with("axis") {
      Ok(Faction::Axis)
    } else if lowered.starts_with("all") {
      Ok(Faction::Allies)
    } else {
      Err(CoreError::InvalidFaction(raw.trim().to_string()))
    }
  }

  pub fn opposite(self) -> Self {
    match self {
      Faction::Axis => Faction::Allies,
      Faction::Allies => Faction::Axis,
    }
  }
}

impl fmt::Display for Faction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Faction::Axis => f.write_str("Axis"),
      Faction::Allies => f.write_str("Allies"),
    }
  }
}

impl FromStr for Faction {
  type Err = CoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Faction::normalize(s)
  }
}

/// Which players a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactionFilter {
  #[default]
  All,
  Only(Faction),
}

impl FactionFilter {
  pub fn matches(self, faction: Option<Faction>) -> bool {
    match self {
      FactionFilter::All => true,
      FactionFilter::Only(wanted) => faction == Some(wanted),
    }
  }
}

impl FromStr for FactionFilter {
  type Err = CoreError;

  /// Empty input, `all` and `both` select everyone.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "" | "all" | "both" => Ok(FactionFilter::All),
      other => Faction::normalize(other).map(FactionFilter::Only),
    }
  }
}

/// Headcount per faction as reported by a backend's game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FactionCounts {
  pub allies: u32,
  pub axis: u32,
}

impl FactionCounts {
  pub fn count(&self, faction: Faction) -> u32 {
    match faction {
      Faction::Axis => self.axis,
      Faction::Allies => self.allies,
    }
  }
}

/// A single row of a backend roster, independent of the wire format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterEntry {
  /// Key the roster is indexed by (usually the platform id)
  pub key: String,
  /// Id-bearing fields in priority order: steam_id_64, player_id, id, steam_id
  pub ids: Vec<String>,
  /// The `name` field, the only one used for name matching
  pub name: Option<String>,
  /// Other display names (player_name, nickname, personaname)
  pub aliases: Vec<String>,
  /// Raw team value as the backend reports it
  pub team: Option<String>,
}

impl RosterEntry {
  /// First non-empty id field, trimmed.
  pub fn player_id(&self) -> Option<String> {
    self
      .ids
      .iter()
      .map(|id| id.trim())
      .find(|id| !id.is_empty())
      .map(str::to_string)
  }

  /// Id used to address the player on its backend. Falls back to the roster key.
  pub fn canonical_id(&self) -> String {
    self.player_id().unwrap_or_else(|| self.key.trim().to_string())
  }

  pub fn display_name(&self) -> String {
    self
      .name
      .iter()
      .chain(self.aliases.iter())
      .chain(self.ids.iter())
      .map(|value| value.trim())
      .find(|value| !value.is_empty())
      .unwrap_or("unknown")
      .to_string()
  }

  /// Current faction; `None` when the team is missing or unrecognised.
  pub fn faction(&self) -> Option<Faction> {
    self
      .team
      .as_deref()
      .and_then(|team| Faction::normalize(team).ok())
  }
}

/// A player found on a live roster.
#[derive(Clone)]
pub struct PlayerRecord {
  pub id: String,
  pub name: String,
  pub faction: Option<Faction>,
  pub backend: Backend,
}

impl fmt::Debug for PlayerRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PlayerRecord")
      .field("id", &self.id)
      .field("name", &self.name)
      .field("faction", &self.faction)
      .field("backend", &self.backend.name())
      .finish()
  }
}

/// Inbound request to move a player to the other faction.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchRequest {
  pub player_id: String,
  pub player_name: Option<String>,
  /// Opaque identity of whoever asked (a Discord user id for the bot)
  pub requester: String,
}

/// A deferred switch waiting in the admission queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedSwitch {
  pub player_id: String,
  pub player_name: String,
  pub target: Faction,
  pub requester: String,
}

/// Terminal, user-visible result of a switch request or a queue cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
  /// Switch executed and confirmed by the backend
  Switched { player: String },
  /// Switch executed but not confirmed
  SwitchFailed { player: String },
  /// Destination faction full, request deferred
  Queued { player: String, target: Faction },
  /// Destination faction full and the queue is full too
  QueueFull { player: String },
  /// Player is not on any backend right now
  NotPresent { player: String },
  /// Player is connected but not on a faction
  NoFaction { player: String },
  /// Queued player disconnected before the switch could happen
  PlayerLeft { player: String },
  /// Queued player reached the target faction some other way
  AlreadyOnTarget { player: String, target: Faction },
}

impl SwitchOutcome {
  pub fn player(&self) -> &str {
    match self {
      SwitchOutcome::Switched { player }
      | SwitchOutcome::SwitchFailed { player }
      | SwitchOutcome::Queued { player, .. }
      | SwitchOutcome::QueueFull { player }
      | SwitchOutcome::NotPresent { player }
      | SwitchOutcome::NoFaction { player }
      | SwitchOutcome::PlayerLeft { player }
      | SwitchOutcome::AlreadyOnTarget { player, .. } => player,
    }
  }
}

/// Result of a `players` listing, one section per backend in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
  pub generation: u64,
  pub filter: FactionFilter,
  pub sections: Vec<ListingSection>,
}

impl Listing {
  pub fn total(&self) -> usize {
    self.sections.iter().map(ListingSection::count).sum()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingSection {
  pub backend: String,
  /// `(number, display name)` pairs, or why this backend could not be listed
  pub players: Result<Vec<(usize, String)>, FetchError>,
}

impl ListingSection {
  pub fn count(&self) -> usize {
    self.players.as_ref().map_or(0, Vec::len)
  }
}
