//! Traffic binding manager.
//!
//! Tracks whether application traffic is pinned to the joined link and is the
//! only place that state changes. Both operations are idempotent, which makes
//! rollback safe to call unconditionally and rules out double binds.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;

use crate::api::models::{BindingState, ErrorKind, JoinError};
use crate::platform::PlatformAdapter;

/// Owns [`BindingState`] and drives the adapter's bind/unbind calls.
///
/// Operations are serialised: a bind and an unbind never overlap.
pub struct TrafficBinder {
    adapter: Arc<dyn PlatformAdapter>,
    state: Mutex<BindingState>,
}

impl TrafficBinder {
    /// Creates an unbound manager.
    pub fn new(adapter: Arc<dyn PlatformAdapter>) -> Self {
        Self {
            adapter,
            state: Mutex::new(BindingState::default()),
        }
    }

    /// Snapshot of the binding state.
    pub async fn state(&self) -> BindingState {
        *self.state.lock().await
    }

    /// Returns `true` if traffic is currently pinned.
    pub async fn is_bound(&self) -> bool {
        self.state.lock().await.bound
    }

    /// Pins application traffic to the current link.
    ///
    /// A no-op when already bound.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::BindFailed`] if the adapter refuses. The state is
    /// left unbound in that case.
    pub async fn bind(&self, no_internet_allowed: bool) -> Result<(), JoinError> {
        let mut state = self.state.lock().await;
        if state.bound {
            debug!("Traffic already bound, skipping bind");
            return Ok(());
        }

        self.adapter
            .bind_traffic(no_internet_allowed)
            .await
            .map_err(|e| {
                warn!("Binding traffic failed: {e}");
                JoinError::new(ErrorKind::BindFailed, e.to_string())
            })?;

        *state = BindingState {
            bound: true,
            bound_since: Some(SystemTime::now()),
        };
        info!("Application traffic bound to wireless link (no_internet_allowed={no_internet_allowed})");
        Ok(())
    }

    /// Releases the traffic pin.
    ///
    /// A no-op when not bound. The state is cleared before the adapter is
    /// called, so it reads unbound afterwards even if the adapter fails.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::BindFailed`] if the adapter refuses.
    pub async fn unbind(&self) -> Result<(), JoinError> {
        let mut state = self.state.lock().await;
        if !state.bound {
            debug!("Traffic not bound, skipping unbind");
            return Ok(());
        }

        *state = BindingState::default();
        self.adapter.unbind_traffic().await.map_err(|e| {
            warn!("Unbinding traffic failed: {e}");
            JoinError::new(ErrorKind::BindFailed, e.to_string())
        })?;

        debug!("Application traffic unbound");
        Ok(())
    }
}
