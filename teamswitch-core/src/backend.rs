//! Remote game-server connections and the registry that owns them.
//!
//! The core never talks HTTP itself. A transport implements [`RconApi`] and is
//! wrapped in a named [`Backend`], which bounds every call with a timeout so a
//! hung server only costs one cycle.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{CoreError, FetchError};
use crate::models::{FactionCounts, RosterEntry};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Capability exposed by one remote administration endpoint.
pub trait RconApi: Send + Sync {
    /// Every player currently connected.
    fn fetch_roster(&self) -> BoxFuture<'_, FetchResult<Vec<RosterEntry>>>;

    /// Current headcount per faction.
    fn fetch_faction_counts(&self) -> BoxFuture<'_, FetchResult<FactionCounts>>;

    /// Move a player to the other faction. `Ok(true)` only on an explicit success.
    fn command_switch<'a>(&'a self, player_id: &'a str) -> BoxFuture<'a, FetchResult<bool>>;
}

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// A named connection. Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct Backend {
    name: Arc<str>,
    api: Arc<dyn RconApi>,
    timeout: Duration,
}

impl Backend {
    pub fn new(name: impl Into<String>, api: Arc<dyn RconApi>) -> Self {
        let name: String = name.into();
        Self {
            name: name.into(),
            api,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn roster(&self) -> FetchResult<Vec<RosterEntry>> {
        self.bounded("fetch_roster", self.api.fetch_roster()).await
    }

    pub async fn faction_counts(&self) -> FetchResult<FactionCounts> {
        self.bounded("fetch_faction_counts", self.api.fetch_faction_counts())
            .await
    }

    pub async fn switch_player(&self, player_id: &str) -> FetchResult<bool> {
        self.bounded("command_switch", self.api.command_switch(player_id))
            .await
    }

    async fn bounded<T>(
        &self,
        call: &'static str,
        fut: BoxFuture<'_, FetchResult<T>>,
    ) -> FetchResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                debug!(backend = %self.name, call, "rcon call timed out");
                Err(FetchError::Timeout(self.timeout))
            }
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Ordered, fixed set of backends. Order decides who wins ambiguous lookups.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    backends: Vec<Backend>,
}

impl BackendRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn all(&self) -> &[Backend] {
        &self.backends
    }

    pub fn get(&self, name: &str) -> Option<&Backend> {
        self.backends.iter().find(|b| b.name() == name)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    backends: Vec<Backend>,
}

impl RegistryBuilder {
    pub fn register(mut self, backend: Backend) -> Self {
        self.backends.push(backend);
        self
    }

    /// Fails when nothing was registered or a name repeats.
    pub fn build(self) -> Result<BackendRegistry, CoreError> {
        if self.backends.is_empty() {
            return Err(CoreError::NoBackends);
        }
        for (idx, backend) in self.backends.iter().enumerate() {
            if self.backends[..idx]
                .iter()
                .any(|earlier| earlier.name() == backend.name())
            {
                return Err(CoreError::DuplicateBackend(backend.name().to_string()));
            }
        }
        Ok(BackendRegistry {
            backends: self.backends,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRcon;

    #[test]
    fn test_empty_registry_is_configuration_error() {
        let err = BackendRegistry::builder().build().unwrap_err();
        assert!(matches!(err, CoreError::NoBackends));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_duplicate_backend_name_rejected() {
        let err = BackendRegistry::builder()
            .register(FakeRcon::new().backend("main"))
            .register(FakeRcon::new().backend("main"))
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateBackend(ref name) if name == "main"));
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let registry = BackendRegistry::builder()
            .register(FakeRcon::new().backend("RCON1"))
            .register(FakeRcon::new().backend("RCON2"))
            .build()
            .unwrap();
        let names: Vec<_> = registry.all().iter().map(Backend::name).collect();
        assert_eq!(names, ["RCON1", "RCON2"]);
        assert!(registry.get("RCON2").is_some());
        assert!(registry.get("RCON3").is_none());
    }

    #[tokio::test]
    async fn test_hung_call_times_out() {
        let fake = FakeRcon::new();
        fake.hang(true);
        let backend = fake
            .backend("slow")
            .with_timeout(Duration::from_millis(20));
        assert_eq!(
            backend.faction_counts().await,
            Err(FetchError::Timeout(Duration::from_millis(20)))
        );
    }
}
