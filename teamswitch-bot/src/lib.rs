pub mod config;
mod error;
pub mod messages;
pub mod rcon;

pub use error::StartupError;

use std::sync::Arc;
use std::time::Duration;

use teamswitch_core::{Backend, BackendRegistry};

use crate::config::RconSpec;
use crate::rcon::RconClient;

/// Create one CRCON-backed [`Backend`] per spec, in order.
///
/// Fails with a configuration error when `specs` is empty, which callers
/// should report once and exit on.
pub fn build_registry(specs: &[RconSpec], timeout: Duration) -> Result<BackendRegistry, StartupError> {
    let mut builder = BackendRegistry::builder();
    for spec in specs {
        let client = RconClient::new(&spec.base_url, &spec.api_token, timeout).map_err(|source| {
            StartupError::HttpClient {
                name: spec.name.clone(),
                source,
            }
        })?;
        tracing::debug!(name = %spec.name, base_url = client.base_url(), "registered rcon backend");
        builder = builder.register(Backend::new(spec.name.clone(), Arc::new(client)).with_timeout(timeout));
    }
    Ok(builder.build()?)
}
