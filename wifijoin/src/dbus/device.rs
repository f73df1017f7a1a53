//! NetworkManager Device proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::OwnedValue;

/// Settings dictionary as NetworkManager returns it from `GetAppliedConnection`.
pub type AppliedSettings = HashMap<String, HashMap<String, OwnedValue>>;

/// Proxy for NetworkManager device interface.
///
/// Provides the device type and state used to find the Wi-Fi radio, and the
/// applied-connection calls used to change its route metric in place.
#[proxy(
    interface = "org.freedesktop.NetworkManager.Device",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait NMDevice {
    /// The network interface name (e.g., "wlan0").
    #[zbus(property)]
    fn interface(&self) -> Result<String>;

    /// Device type as a numeric code (2 = Wi-Fi).
    #[zbus(property)]
    fn device_type(&self) -> Result<u32>;

    /// Current state (100 = activated, 120 = failed) and the reason for the last change.
    #[zbus(property)]
    fn state_reason(&self) -> Result<(u32, u32)>;

    /// Returns the settings currently in effect on the device and their version id.
    fn get_applied_connection(&self, flags: u32) -> Result<(AppliedSettings, u64)>;

    /// Applies changed settings to the active connection without a reconnect.
    ///
    /// `version_id` must come from the matching `GetAppliedConnection`
    /// call, or be 0 to skip the check.
    fn reapply(&self, connection: AppliedSettings, version_id: u64, flags: u32) -> Result<()>;
}
