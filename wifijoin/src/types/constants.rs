//! Constants for NetworkManager D-Bus interface values and join timing.
//!
//! These constants correspond to the numeric codes and names used by
//! NetworkManager's D-Bus API for device types, states, permissions and errors.

/// NetworkManager device type constants.
pub mod device_type {
    pub const WIFI: u32 = 2;
}

/// NetworkManager device state constants
pub mod device_state {
    pub const FAILED: u32 = 120;
}

/// NetworkManager connectivity state constants
pub mod connectivity {
    pub const FULL: u32 = 4;
}

/// NetworkManager permission names and answers from `GetPermissions`.
pub mod permission {
    pub const NETWORK_CONTROL: &str = "org.freedesktop.NetworkManager.network-control";
    pub const YES: &str = "yes";
    pub const NO: &str = "no";
    pub const AUTH: &str = "auth";
}

/// D-Bus error names NetworkManager (and the bus itself) reply with.
pub mod error_name {
    pub const ALREADY_ACTIVE: &str = "org.freedesktop.NetworkManager.ConnectionAlreadyActive";
    pub const PERMISSION_DENIED: &str = "org.freedesktop.NetworkManager.PermissionDenied";
    pub const UNKNOWN_DEVICE: &str = "org.freedesktop.NetworkManager.UnknownDevice";
    pub const UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
    pub const ACCESS_DENIED: &str = "org.freedesktop.DBus.Error.AccessDenied";
    pub const INVALID_PROPERTY_SUFFIX: &str = ".InvalidProperty";
    pub const INVALID_CONNECTION_SUFFIX: &str = ".InvalidConnection";
}

/// Route metrics used to pin traffic to the joined link.
pub mod route_metric {
    /// Lower than any metric NetworkManager assigns by default.
    pub const BOUND: i64 = 1;
    /// Lets NetworkManager choose the metric again.
    pub const DEFAULT: i64 = -1;
}

/// Identity verification defaults.
pub mod verification {
    use std::time::Duration;

    /// Identity checks before a join is declared timed out.
    pub const MAX_ATTEMPTS: u32 = 20;

    /// Delay before each identity check, in milliseconds.
    const INTERVAL_MS: u64 = 500;

    /// Returns the delay between identity checks.
    pub fn interval() -> Duration {
        Duration::from_millis(INTERVAL_MS)
    }
}

/// Timeouts for NetworkManager-side operations.
pub mod timeouts {
    use std::time::Duration;

    /// Time to wait after requesting a scan before checking results (2 seconds).
    ///
    /// Prefix joins need a fresh access point list to resolve the prefix.
    const SCAN_WAIT_SECS: u64 = 2;

    /// Returns the scan wait duration.
    pub fn scan_wait() -> Duration {
        Duration::from_secs(SCAN_WAIT_SECS)
    }
}
