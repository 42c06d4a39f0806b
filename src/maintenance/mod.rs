/// Drain-then-maintenance orchestration
///
/// Places a server into maintenance by first draining it: the server is set
/// to `drain`, its current session count is polled from `show stat` until it
/// reaches zero, then it is set to `maint`. If the caller's cancellation
/// fires first the server is forced into `maint` regardless of the sessions
/// still open. Draining can take a long time when clients hold persistent
/// connections, so callers normally pass a deadline.
use crate::client::RuntimeClient;
use crate::core::{CommandExecutor, ServerState};
use crate::error::RuntimeResult;
use crate::stat::find_counter;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a maintenance operation reached `maint`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum MaintenanceOutcome {
    /// The server reported zero current sessions before it was set to `maint`
    Drained,
    /// Cancellation fired first and `maint` was forced.
    ///
    /// `last_sessions` is the session count from the last poll, `None` when
    /// the server never appeared in `show stat`.
    Forced { last_sessions: Option<u32> },
}

impl MaintenanceOutcome {
    pub fn is_forced(&self) -> bool {
        matches!(self, MaintenanceOutcome::Forced { .. })
    }
}

impl<E: CommandExecutor> RuntimeClient<E> {
    /// Drain `backend/server` and place it into maintenance.
    ///
    /// `cancel` is raced against the poll delay on every iteration; when it
    /// completes, `maint` is forced. A poll already in flight is allowed to
    /// finish first. Pass `std::future::pending()` to wait for the drain
    /// indefinitely.
    ///
    /// A failed state change or counter read aborts immediately; no forced
    /// `maint` is attempted after a failed read.
    pub async fn server_maintenance<F>(
        &self,
        backend: &str,
        server: &str,
        cancel: F,
    ) -> RuntimeResult<MaintenanceOutcome>
    where
        F: Future<Output = ()>,
    {
        self.set_server_state(backend, server, ServerState::Drain).await?;

        tokio::pin!(cancel);
        let mut last_sessions = None;

        loop {
            tokio::select! {
                biased;

                _ = &mut cancel => {
                    warn!(
                        backend,
                        server,
                        sessions = ?last_sessions,
                        "Drain did not complete in time, forcing server into maintenance"
                    );
                    self.set_server_state(backend, server, ServerState::Maintenance).await?;
                    return Ok(MaintenanceOutcome::Forced { last_sessions });
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            if let Some(sessions) = self.current_sessions(backend, server).await? {
                last_sessions = Some(sessions);
                if sessions == 0 {
                    info!(backend, server, "Server drained");
                    self.set_server_state(backend, server, ServerState::Maintenance).await?;
                    return Ok(MaintenanceOutcome::Drained);
                }
            }
        }
    }

    /// `server_maintenance` bounded by `timeout`; `None` waits indefinitely
    pub async fn server_maintenance_with_timeout(
        &self,
        backend: &str,
        server: &str,
        timeout: Option<Duration>,
    ) -> RuntimeResult<MaintenanceOutcome> {
        match timeout {
            Some(timeout) => {
                self.server_maintenance(backend, server, tokio::time::sleep(timeout))
                    .await
            }
            None => {
                self.server_maintenance(backend, server, std::future::pending())
                    .await
            }
        }
    }

    /// Current sessions of `backend/server`, `None` when the row is missing
    async fn current_sessions(&self, backend: &str, server: &str) -> RuntimeResult<Option<u32>> {
        let counters = self.show_stat().await?;
        let sessions = find_counter(&counters, backend, server).map(|c| c.scur);
        match sessions {
            Some(scur) => debug!(backend, server, scur, "Sessions on draining server"),
            None => debug!(backend, server, "Draining server not found in show stat"),
        }
        Ok(sessions)
    }
}
