//! Platform network adapters.
//!
//! The orchestrator never talks to an operating system directly. Everything it
//! needs from the platform goes through [`PlatformAdapter`], which keeps the
//! join state machine testable with scripted adapters and lets other
//! backends slot in next to the bundled NetworkManager one.

pub mod nm;

use async_trait::async_trait;

use crate::api::models::{ApplyOutcome, ConnectIntent, PermissionState, PlatformError};

/// Capabilities a platform must provide for on-demand joins.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Installs the configuration described by `intent` and starts associating.
    ///
    /// Returns once the platform has accepted (or refused) the request, not
    /// once the link is up.
    async fn apply_configuration(
        &self,
        intent: &ConnectIntent,
    ) -> Result<ApplyOutcome, PlatformError>;

    /// Removes any standing configuration for `identity`.
    async fn remove_configuration(&self, identity: &str) -> Result<(), PlatformError>;

    /// SSID of the current wireless link.
    ///
    /// `None` when there is no link or the SSID cannot be read.
    async fn current_identity(&self) -> Option<String>;

    /// Pins application traffic to the current wireless link.
    async fn bind_traffic(&self, no_internet_allowed: bool) -> Result<(), PlatformError>;

    /// Releases a previous [`bind_traffic`](PlatformAdapter::bind_traffic).
    async fn unbind_traffic(&self) -> Result<(), PlatformError>;

    /// Current permission decision, without prompting.
    async fn permission_state(&self) -> PermissionState;

    /// Asks for permission and resolves when a decision is made.
    async fn request_permission(&self) -> PermissionState;
}
