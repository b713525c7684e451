use tracing::{info, warn};

use crate::backend::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Success,
    Failure,
}

/// Issue a switch command. Not idempotent: call once per admitted request.
///
/// Anything short of an explicit confirmation, transport errors and timeouts
/// included, counts as a failure.
pub async fn execute(backend: &Backend, player_id: &str) -> Execution {
    match backend.switch_player(player_id).await {
        Ok(true) => {
            info!(backend = backend.name(), player_id, "switch confirmed");
            Execution::Success
        }
        Ok(false) => {
            warn!(backend = backend.name(), player_id, "switch not confirmed");
            Execution::Failure
        }
        Err(error) => {
            warn!(backend = backend.name(), player_id, %error, "switch command failed");
            Execution::Failure
        }
    }
}
