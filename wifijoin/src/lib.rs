//! On-demand Wi-Fi joins for talking to nearby devices.
//!
//! IoT gadgets, cameras and setup dongles commonly expose their own access
//! point. Joining one from an application is more than a single call: the
//! platform accepts the configuration long before the radio associates, the
//! link usually has no internet so traffic must be pinned to it, and a failed
//! attempt has to be undone. This crate wraps that in one async operation:
//!
//! - Normalising the many historical call shapes into one [`ConnectIntent`]
//! - Permission gating before the radio is touched
//! - Verifying the joined SSID by bounded polling
//! - Pinning application traffic to the link, and releasing it on rollback
//! - Mapping every platform failure to one [`ErrorKind`]
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use wifijoin::{ConnectRequest, WifiJoin};
//!
//! # async fn example() -> wifijoin::Result<()> {
//! let join = WifiJoin::system().await?;
//!
//! join.connect_request(
//!     ConnectRequest::protected("IoT-Device-42", "password123", false, false)
//!         .join_once()
//!         .with_timeout(Duration::from_secs(20))
//!         .bind_traffic(true),
//! )
//! .await?;
//!
//! println!("on {}", join.get_current_identity().await?);
//! # Ok(())
//! # }
//! ```
//!
//! # Platforms
//!
//! The orchestration is platform-independent and talks to the system through
//! the [`PlatformAdapter`] trait. [`NetworkManagerAdapter`] implements it over
//! NetworkManager's D-Bus API; other platforms can supply their own.
//!
//! # Error Handling
//!
//! All operations return `Result<T, JoinError>`. Every failure carries exactly
//! one [`ErrorKind`] and a human-readable message.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod dbus;
mod types;
mod util;

// Public API modules
pub mod api;
pub mod platform;

// Re-exported public API
pub use api::config::PollPolicy;
pub use api::intent::{ConnectRequest, normalize};
pub use api::models::{
    ApplyOutcome, AttemptState, BindOptions, BindingState, ConnectIntent, ErrorKind, JoinError,
    MAX_SSID_BYTES, MatchMode, PermissionState, PlatformCode, PlatformError, SecretCipher,
    StateReason,
};
pub use api::wifi_join::WifiJoin;
pub use crate::core::binding::TrafficBinder;
pub use crate::core::error_map::map_platform_code;
pub use crate::core::poller::{PollOutcome, identity_matches, verify};
pub use platform::PlatformAdapter;
pub use platform::nm::NetworkManagerAdapter;

/// A specialized `Result` type for join operations.
pub type Result<T> = std::result::Result<T, JoinError>;
