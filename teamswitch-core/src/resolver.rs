use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::FetchError;
use crate::models::{PlayerRecord, RosterEntry};

/// A backend that could not be searched during a lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendFailure {
    pub backend: String,
    pub error: FetchError,
}

#[derive(Debug)]
pub enum Resolution {
    Found(PlayerRecord),
    /// Not on any reachable backend. `failures` lists the ones that were skipped.
    NotFound { failures: Vec<BackendFailure> },
}

impl Resolution {
    pub fn found(self) -> Option<PlayerRecord> {
        match self {
            Resolution::Found(record) => Some(record),
            Resolution::NotFound { .. } => None,
        }
    }
}

/// Find a player inside one roster.
///
/// Exact roster key first, then any id-bearing field compared trimmed, then a
/// case-insensitive trimmed match on `name` if one was given.
pub fn find_in_roster<'r>(
    roster: &'r [RosterEntry],
    player_id: &str,
    player_name: Option<&str>,
) -> Option<&'r RosterEntry> {
    if let Some(entry) = roster.iter().find(|entry| entry.key == player_id) {
        return Some(entry);
    }

    let wanted_id = player_id.trim();
    if !wanted_id.is_empty() {
        if let Some(entry) = roster
            .iter()
            .find(|entry| entry.ids.iter().any(|id| id.trim() == wanted_id))
        {
            return Some(entry);
        }
    }

    let wanted_name = player_name.map(|name| name.trim().to_lowercase())?;
    if wanted_name.is_empty() {
        return None;
    }
    roster.iter().find(|entry| {
        entry
            .name
            .as_deref()
            .is_some_and(|name| name.trim().to_lowercase() == wanted_name)
    })
}

/// Search backends in registry order and stop at the first one that knows the player.
///
/// A backend whose roster cannot be fetched is logged and skipped; it never
/// fails the whole lookup.
pub async fn resolve(
    backends: &[Backend],
    player_id: &str,
    player_name: Option<&str>,
) -> Resolution {
    let mut failures = Vec::new();

    for backend in backends {
        let roster = match backend.roster().await {
            Ok(roster) => roster,
            Err(error) => {
                warn!(backend = backend.name(), %error, "could not fetch roster");
                failures.push(BackendFailure {
                    backend: backend.name().to_string(),
                    error,
                });
                continue;
            }
        };

        if let Some(entry) = find_in_roster(&roster, player_id, player_name) {
            debug!(
                backend = backend.name(),
                player = player_name.unwrap_or(player_id),
                "player resolved"
            );
            return Resolution::Found(PlayerRecord {
                id: entry.canonical_id(),
                name: entry.display_name(),
                faction: entry.faction(),
                backend: backend.clone(),
            });
        }
    }

    Resolution::NotFound { failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Faction;
    use crate::testing::{FakeRcon, player};

    fn roster() -> Vec<RosterEntry> {
        vec![
            player("76561198000000001", "Alpha", "allies"),
            RosterEntry {
                key: "slot-7".to_string(),
                ids: vec![" 76561198000000002 ".to_string()],
                name: Some("Bravo".to_string()),
                aliases: Vec::new(),
                team: Some("axis".to_string()),
            },
            player("76561198000000003", "  Charlie ", "axis"),
        ]
    }

    #[test]
    fn test_match_by_key() {
        let roster = roster();
        let found = find_in_roster(&roster, "76561198000000001", None).unwrap();
        assert_eq!(found.display_name(), "Alpha");
    }

    #[test]
    fn test_match_by_id_field_trimmed() {
        let roster = roster();
        let found = find_in_roster(&roster, "76561198000000002 ", None).unwrap();
        assert_eq!(found.key, "slot-7");
    }

    #[test]
    fn test_match_by_name_case_insensitive() {
        let roster = roster();
        let found = find_in_roster(&roster, "gone", Some("charlie")).unwrap();
        assert_eq!(found.key, "76561198000000003");
    }

    #[test]
    fn test_id_match_wins_over_name() {
        let roster = roster();
        let found = find_in_roster(&roster, "76561198000000001", Some("Bravo")).unwrap();
        assert_eq!(found.display_name(), "Alpha");
    }

    #[test]
    fn test_no_match() {
        let roster = roster();
        assert!(find_in_roster(&roster, "1", None).is_none());
        assert!(find_in_roster(&roster, "1", Some("")).is_none());
        assert!(find_in_roster(&roster, "1", Some("Delta")).is_none());
    }

    #[tokio::test]
    async fn test_resolve_skips_failing_backend() {
        let broken = FakeRcon::new();
        broken.fail_roster(Some(FetchError::Status(502)));
        let healthy = FakeRcon::new().with_player(player("42", "Echo", "Allies"));
        let backends = [broken.backend("A"), healthy.backend("B")];

        let record = resolve(&backends, "42", None).await.found().unwrap();
        assert_eq!(record.backend.name(), "B");
        assert_eq!(record.faction, Some(Faction::Allies));
    }

    #[tokio::test]
    async fn test_not_found_reports_failures() {
        let broken = FakeRcon::new();
        broken.fail_roster(Some(FetchError::Transport("refused".into())));
        let empty = FakeRcon::new();
        let backends = [broken.backend("A"), empty.backend("B")];

        match resolve(&backends, "42", Some("Echo")).await {
            Resolution::NotFound { failures } => {
                assert_eq!(
                    failures,
                    vec![BackendFailure {
                        backend: "A".to_string(),
                        error: FetchError::Transport("refused".into()),
                    }]
                );
            }
            Resolution::Found(record) => panic!("unexpected match: {record:?}"),
        }
    }
}
