//! Single-flight coordination of access-token refreshes
//!
//! The first request that comes back 401 becomes the leader and performs the
//! `/refresh` exchange. Every request that 401s while the leader is working is
//! parked in a FIFO queue and released with the leader's outcome, so any number
//! of concurrent failures cost exactly one refresh call.
//!
//! The in-flight flag and the queue share one mutex, and joining the queue
//! happens under the same lock as the flag check. The lock is never held across
//! an `.await`.

use super::error::ClientError;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

/// New access token, or the failure every waiter should see
pub type RefreshOutcome = Result<String, ClientError>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Refresh flag plus the queue of requests waiting on it
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Role handed out by [`RefreshCoordinator::begin_refresh`]
pub enum Ticket<'a> {
    /// This caller performs the refresh and must settle the lease
    Leader(RefreshLease<'a>),
    /// A refresh is already running; await the outcome
    Waiter(RefreshWaiter),
}

/// Leadership of the in-flight refresh. Dropping it unsettled releases the
/// queue with a failure so no waiter is left hanging.
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

/// A queued continuation
pub struct RefreshWaiter {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshCoordinator {
    /// Create an idle coordinator
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a refresh exchange is in flight
    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight
    }

    /// Number of requests parked behind the in-flight refresh
    pub fn queued(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Claim the refresh, or join the queue if someone already has it
    pub fn begin_refresh(&self) -> Ticket<'_> {
        let mut state = self.lock();
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            debug!(queued = state.waiters.len(), "Joined in-flight token refresh");
            Ticket::Waiter(RefreshWaiter { rx })
        } else {
            state.in_flight = true;
            Ticket::Leader(RefreshLease {
                coordinator: self,
                settled: false,
            })
        }
    }

    /// Join the queue of a refresh that is already in flight. Returns `None`
    /// when nothing is in flight.
    pub fn enqueue(&self) -> Option<RefreshWaiter> {
        let mut state = self.lock();
        if !state.in_flight {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        state.waiters.push_back(tx);
        Some(RefreshWaiter { rx })
    }

    /// Release every waiter in arrival order and clear the flag
    fn settle(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        debug!(
            released = waiters.len(),
            success = outcome.is_ok(),
            "Token refresh settled"
        );
        for waiter in waiters {
            // A waiter whose request was dropped no longer listens
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        // The state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RefreshLease<'_> {
    /// Publish the outcome to all queued requests and end the refresh
    pub fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(&Err(ClientError::Network(
                "token refresh was cancelled".to_string(),
            )));
        }
    }
}

impl RefreshWaiter {
    /// Wait for the leader's outcome
    pub async fn wait(self) -> RefreshOutcome {
        self.rx.await.unwrap_or_else(|_| {
            Err(ClientError::Network(
                "token refresh ended without a result".to_string(),
            ))
        })
    }
}
