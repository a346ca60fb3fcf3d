//! Background expiry sweep
//!
//! Expiry is otherwise only noticed when someone tries to execute a stale
//! command. The reaper calls [`CommandService::sweep_expired`] on a fixed
//! period so abandoned commands leave the pending list on their own.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::service::CommandService;

/// Handle to a running expiry reaper task
#[derive(Debug)]
pub struct ExpiryReaper {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<u64>>,
}

impl ExpiryReaper {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the task and wait for it; returns the number of sweeps performed
    pub async fn shutdown(&mut self) -> u64 {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        match self.task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => 0,
        }
    }
}

/// Spawn a task that sweeps expired commands every
/// `reaper_interval_secs` of the service's configuration
///
/// The task exits when shut down through the handle or once the service is
/// closed. Must be called from within a tokio runtime.
pub fn spawn_expiry_reaper(service: Arc<CommandService>) -> ExpiryReaper {
    let period = service.config().reaper_interval();
    spawn_expiry_reaper_with_period(service, period)
}

/// Like [`spawn_expiry_reaper`] with an explicit period. A zero period is
/// raised to one millisecond.
pub fn spawn_expiry_reaper_with_period(
    service: Arc<CommandService>,
    period: Duration,
) -> ExpiryReaper {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let period = period.max(Duration::from_millis(1));
    let task = tokio::spawn(run_reaper_loop(service, period, shutdown_rx));

    ExpiryReaper {
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    }
}

async fn run_reaper_loop(
    service: Arc<CommandService>,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> u64 {
    let mut sweeps = 0_u64;
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tracing::debug!(period_ms = period.as_millis() as u64, "expiry reaper started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if service.is_closed() {
                    break;
                }
                let expired = service.sweep_expired();
                sweeps = sweeps.saturating_add(1);
                if !expired.is_empty() {
                    tracing::debug!(count = expired.len(), sweeps, "reaper expired commands");
                }
            }
            _ = &mut shutdown_rx => break,
        }
    }

    tracing::debug!(sweeps, "expiry reaper stopped");
    sweeps
}
