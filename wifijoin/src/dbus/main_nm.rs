//! Main NetworkManager proxy.

use std::collections::HashMap;
use zbus::proxy;
use zvariant::{OwnedObjectPath, OwnedValue};

/// Proxy for the main NetworkManager interface.
///
/// Provides methods for listing devices, creating and activating
/// connections, and querying permissions and connectivity.
#[proxy(
    interface = "org.freedesktop.NetworkManager",
    default_service = "org.freedesktop.NetworkManager",
    default_path = "/org/freedesktop/NetworkManager"
)]
pub trait NM {
    /// Returns paths to all network devices.
    fn get_devices(&self) -> zbus::Result<Vec<OwnedObjectPath>>;

    /// Creates a new connection and activates it simultaneously.
    ///
    /// Returns paths to both the new connection settings and active connection.
    fn add_and_activate_connection(
        &self,
        connection: HashMap<&str, HashMap<&str, zvariant::Value<'_>>>,
        device: OwnedObjectPath,
        specific_object: OwnedObjectPath,
    ) -> zbus::Result<(OwnedObjectPath, OwnedObjectPath)>;

    /// Like `AddAndActivateConnection`, with extra options.
    ///
    /// `persist` may be `"disk"`, `"memory"` or `"volatile"`; a volatile
    /// profile is deleted as soon as it is deactivated.
    fn add_and_activate_connection2(
        &self,
        connection: HashMap<&str, HashMap<&str, zvariant::Value<'_>>>,
        device: OwnedObjectPath,
        specific_object: OwnedObjectPath,
        options: HashMap<&str, zvariant::Value<'_>>,
    ) -> zbus::Result<(OwnedObjectPath, OwnedObjectPath, HashMap<String, OwnedValue>)>;

    /// Permission name to result (`yes`, `no` or `auth`) for the caller.
    fn get_permissions(&self) -> zbus::Result<HashMap<String, String>>;

    /// Re-checks connectivity and returns the new state (4 = full).
    fn check_connectivity(&self) -> zbus::Result<u32>;
}
