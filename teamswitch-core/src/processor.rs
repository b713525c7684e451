//! Background worker that drains the admission queue.
//!
//! Each cycle looks at the head only: if the player is gone or already on the
//! target faction the request is dropped, if the target faction is still full
//! it stays put until the next cycle, otherwise the switch runs and the
//! request is removed whatever the result. Outcomes go to a single notice
//! channel, not to the requester.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::backend::BackendRegistry;
use crate::capacity::{Admission, CapacityGate};
use crate::error::CoreError;
use crate::executor::{self, Execution};
use crate::models::{QueuedSwitch, SwitchOutcome};
use crate::queue::AdmissionQueue;
use crate::resolver::{self, Resolution};

pub const DEFAULT_QUEUE_INTERVAL: Duration = Duration::from_secs(10);

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Queue was empty
    Idle,
    /// Player left; request dropped
    PlayerGone,
    /// Player already on the target faction; request dropped
    AlreadyOnTarget,
    /// Target faction still full; head left in place
    Blocked,
    /// Switch issued; request removed
    Admitted(Execution),
    /// Cycle failed; head dropped to keep the queue moving
    Dropped,
}

#[derive(Clone)]
pub struct QueueProcessor {
    registry: Arc<BackendRegistry>,
    queue: Arc<AdmissionQueue>,
    gate: CapacityGate,
    interval: Duration,
    notices: UnboundedSender<SwitchOutcome>,
}

impl QueueProcessor {
    pub fn new(
        registry: Arc<BackendRegistry>,
        queue: Arc<AdmissionQueue>,
        gate: CapacityGate,
        interval: Duration,
        notices: UnboundedSender<SwitchOutcome>,
    ) -> Self {
        Self {
            registry,
            queue,
            gate,
            interval,
            notices,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run cycles forever at a fixed interval.
    ///
    /// Each cycle runs in its own task so even a panic only costs the head item.
    pub async fn run(self) {
        info!(interval = ?self.interval, "queue processor started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(head) = self.queue.peek_head() else {
                continue;
            };
            let worker = self.clone();
            if let Err(join_error) = tokio::spawn(async move { worker.run_cycle().await }).await {
                // The cycle may already have removed its head before failing.
                if self.queue.pop_head_if(&head).is_some() {
                    error!(%join_error, player = %head.player_name, "queue cycle aborted, dropping head");
                } else {
                    error!(%join_error, "queue cycle aborted after removing its head");
                }
            }
        }
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(head) = self.queue.peek_head() else {
            return CycleOutcome::Idle;
        };
        debug!(
            player = %head.player_name,
            target = %head.target,
            queued = self.queue.len(),
            "inspecting queue head"
        );

        match self.inspect(&head).await {
            Ok(outcome) => outcome,
            Err(error) => {
                error!(player = %head.player_name, %error, "queue cycle failed, dropping request");
                self.queue.pop_head_if(&head);
                CycleOutcome::Dropped
            }
        }
    }

    async fn inspect(&self, head: &QueuedSwitch) -> Result<CycleOutcome, CoreError> {
        // The player may have reconnected elsewhere, so search every backend.
        let resolution = resolver::resolve(
            self.registry.all(),
            &head.player_id,
            Some(head.player_name.as_str()),
        )
        .await;

        let record = match resolution {
            Resolution::Found(record) => record,
            Resolution::NotFound { failures } => {
                info!(
                    player = %head.player_name,
                    skipped_backends = failures.len(),
                    "queued player no longer present"
                );
                self.queue.pop_head_if(head);
                self.notify(SwitchOutcome::PlayerLeft {
                    player: head.player_name.clone(),
                });
                return Ok(CycleOutcome::PlayerGone);
            }
        };

        // switch_player_now toggles, so switching now would undo the move.
        if record.faction == Some(head.target) {
            info!(
                player = %head.player_name,
                target = %head.target,
                "queued player already on the target faction"
            );
            self.queue.pop_head_if(head);
            self.notify(SwitchOutcome::AlreadyOnTarget {
                player: head.player_name.clone(),
                target: head.target,
            });
            return Ok(CycleOutcome::AlreadyOnTarget);
        }

        let admission = self
            .gate
            .check(&record.backend, head.target)
            .await
            .map_err(|source| CoreError::Fetch {
                backend: record.backend.name().to_string(),
                source,
            })?;

        if admission == Admission::Defer {
            debug!(player = %head.player_name, target = %head.target, "target faction still full");
            return Ok(CycleOutcome::Blocked);
        }

        let execution = executor::execute(&record.backend, &record.id).await;
        self.queue.pop_head_if(head);
        let player = head.player_name.clone();
        self.notify(match execution {
            Execution::Success => SwitchOutcome::Switched { player },
            Execution::Failure => SwitchOutcome::SwitchFailed { player },
        });
        Ok(CycleOutcome::Admitted(execution))
    }

    fn notify(&self, outcome: SwitchOutcome) {
        if self.notices.send(outcome).is_err() {
            warn!("notice channel closed, queue outcome not delivered");
        }
    }
}
