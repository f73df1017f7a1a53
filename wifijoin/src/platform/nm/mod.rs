//! NetworkManager adapter over the system D-Bus.
//!
//! Joins are created with `AddAndActivateConnection`, which installs a profile
//! and starts association in one call. Join-once profiles go through
//! `AddAndActivateConnection2` with `persist=volatile`, so NetworkManager
//! drops them itself once they are deactivated.
//!
//! Traffic binding is expressed as a route metric: reapplying the active
//! Wi-Fi connection with a metric lower than any other interface makes it
//! the preferred default route without tearing the link down.

pub(crate) mod settings;

use async_trait::async_trait;
use futures_timer::Delay;
use log::{debug, info, warn};
use std::collections::HashMap;
use zbus::Connection;
use zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::api::models::{
    ApplyOutcome, ConnectIntent, MatchMode, PermissionState, PlatformCode, PlatformError,
    StateReason,
};
use crate::core::poller::identity_matches;
use crate::dbus::{NMAccessPointProxy, NMDeviceProxy, NMProxy, NMWirelessProxy};
use crate::platform::PlatformAdapter;
use crate::try_log;
use crate::types::constants::{
    connectivity, device_state, device_type, error_name, permission, route_metric, timeouts,
};
use crate::util::utils::{connection_settings_proxy, decode_ssid_or_empty, settings_proxy};
use settings::build_join_settings;

type NmResult<T> = std::result::Result<T, PlatformError>;

/// D-Bus error name for failures that carry no name of their own.
const GENERIC_FAILURE: &str = "org.freedesktop.DBus.Error.Failed";

impl From<zbus::Error> for PlatformError {
    fn from(err: zbus::Error) -> Self {
        match &err {
            zbus::Error::MethodError(name, detail, _) => {
                let detail = detail.clone().unwrap_or_default();
                PlatformError::new(classify_error(name.as_str(), &detail), detail)
            }
            _ => PlatformError::new(PlatformCode::Bus(GENERIC_FAILURE.into()), err.to_string()),
        }
    }
}

/// Maps a D-Bus error name (and its message) to a platform code.
fn classify_error(name: &str, detail: &str) -> PlatformCode {
    match name {
        error_name::PERMISSION_DENIED | error_name::ACCESS_DENIED => PlatformCode::PermissionDenied,
        error_name::UNKNOWN_METHOD | error_name::UNKNOWN_DEVICE => PlatformCode::Unsupported,
        n if n.ends_with(error_name::INVALID_PROPERTY_SUFFIX)
            || n.ends_with(error_name::INVALID_CONNECTION_SUFFIX) =>
        {
            if detail.contains("802-11-wireless-security") {
                PlatformCode::InvalidPassphrase
            } else if detail.contains("ssid") {
                PlatformCode::InvalidSsid
            } else {
                PlatformCode::InvalidConfiguration
            }
        }
        other => PlatformCode::Bus(other.to_string()),
    }
}

fn is_already_active(err: &zbus::Error) -> bool {
    matches!(
        err,
        zbus::Error::MethodError(name, _, _) if name.as_str() == error_name::ALREADY_ACTIVE
    )
}

/// [`PlatformAdapter`] backed by NetworkManager.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use wifijoin::{NetworkManagerAdapter, WifiJoin};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let adapter = NetworkManagerAdapter::system().await?;
/// let join = WifiJoin::new(Arc::new(adapter));
/// println!("{:?}", join.get_current_identity().await);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NetworkManagerAdapter {
    conn: Connection,
}

impl NetworkManagerAdapter {
    /// Connects to NetworkManager on the system bus.
    ///
    /// # Errors
    ///
    /// Returns a [`PlatformError`] if the system bus is unreachable.
    pub async fn system() -> NmResult<Self> {
        let conn = Connection::system().await?;
        Ok(Self { conn })
    }

    /// Wraps an existing bus connection.
    pub fn with_connection(conn: Connection) -> Self {
        Self { conn }
    }

    async fn query_permission(&self) -> Option<PermissionState> {
        let nm = try_log!(NMProxy::new(&self.conn).await, "Failed to create NM proxy");
        let perms = try_log!(nm.get_permissions().await, "Failed to get permissions");

        let state = match perms.get(permission::NETWORK_CONTROL).map(String::as_str) {
            Some(permission::YES) => PermissionState::Granted,
            Some(permission::NO) => PermissionState::Denied,
            Some(permission::AUTH) => PermissionState::Undetermined,
            Some(other) => {
                warn!("Unexpected permission answer '{other}', treating as restricted");
                PermissionState::Restricted
            }
            None => PermissionState::Restricted,
        };
        Some(state)
    }
}

#[async_trait]
impl PlatformAdapter for NetworkManagerAdapter {
    async fn apply_configuration(&self, intent: &ConnectIntent) -> NmResult<ApplyOutcome> {
        let nm = NMProxy::new(&self.conn).await?;
        let device = find_wifi_device(&self.conn, &nm).await?;
        debug!("Found WiFi device: {}", device.as_str());

        let wifi = NMWirelessProxy::builder(&self.conn)
            .path(device.clone())?
            .build()
            .await?;

        let (ssid, ap) = resolve_access_point(&self.conn, &wifi, intent).await?;
        let settings = build_join_settings(&ssid, intent);

        let activated = if intent.single_use {
            let mut options = HashMap::new();
            options.insert("persist", Value::from("volatile"));
            nm.add_and_activate_connection2(settings, device.clone(), ap, options)
                .await
                .map(|(_, active, _)| active)
        } else {
            nm.add_and_activate_connection(settings, device.clone(), ap)
                .await
                .map(|(_, active)| active)
        };

        match activated {
            Ok(active) => debug!("Activation of '{ssid}' started: {}", active.as_str()),
            Err(e) if is_already_active(&e) => {
                debug!("'{ssid}' is already active");
                return Ok(ApplyOutcome::AlreadyAssociated);
            }
            Err(e) => return Err(e.into()),
        }

        ensure_device_not_failed(&self.conn, &device).await?;
        Ok(ApplyOutcome::Accepted)
    }

    async fn remove_configuration(&self, identity: &str) -> NmResult<()> {
        let settings = settings_proxy(&self.conn).await?;
        let reply = settings.call_method("ListConnections", &()).await?;
        let paths: Vec<OwnedObjectPath> = reply.body().deserialize()?;

        let conn = &self.conn;
        let removed = delete_each(paths, |path| async move {
            let profile = connection_settings_proxy(conn, path).await?;

            let Ok(msg) = profile.call_method("GetSettings", &()).await else {
                return Ok(false);
            };
            let body = msg.body();
            let all: HashMap<String, HashMap<String, Value>> = body.deserialize()?;
            if !profile_matches(&all, identity) {
                return Ok(false);
            }

            profile.call_method("Delete", &()).await?;
            Ok::<_, zbus::Error>(true)
        })
        .await;

        if removed > 0 {
            info!("Removed {removed} profile(s) for '{identity}'");
        } else {
            debug!("No saved profiles found for '{identity}'");
        }
        Ok(())
    }

    async fn current_identity(&self) -> Option<String> {
        current_ssid(&self.conn).await.filter(|ssid| !ssid.is_empty())
    }

    async fn bind_traffic(&self, no_internet_allowed: bool) -> NmResult<()> {
        let nm = NMProxy::new(&self.conn).await?;

        if !no_internet_allowed {
            let state = nm.check_connectivity().await?;
            if state != connectivity::FULL {
                return Err(PlatformError::new(
                    PlatformCode::NoInternet,
                    format!("connectivity state {state}"),
                ));
            }
        }

        set_route_metric(&self.conn, &nm, route_metric::BOUND).await
    }

    async fn unbind_traffic(&self) -> NmResult<()> {
        let nm = NMProxy::new(&self.conn).await?;
        set_route_metric(&self.conn, &nm, route_metric::DEFAULT).await
    }

    async fn permission_state(&self) -> PermissionState {
        self.query_permission()
            .await
            .unwrap_or(PermissionState::Restricted)
    }

    async fn request_permission(&self) -> PermissionState {
        // polkit prompts when the privileged call is made, not ahead of it
        match self.query_permission().await {
            Some(PermissionState::Undetermined) => PermissionState::Granted,
            Some(decided) => decided,
            None => PermissionState::Restricted,
        }
    }
}

/// Finds the first Wi-Fi device on the system.
async fn find_wifi_device(conn: &Connection, nm: &NMProxy<'_>) -> NmResult<OwnedObjectPath> {
    let devices = nm.get_devices().await?;

    for dp in devices {
        let dev = NMDeviceProxy::builder(conn)
            .path(dp.clone())?
            .build()
            .await?;
        if dev.device_type().await? == device_type::WIFI {
            return Ok(dp);
        }
    }
    Err(PlatformError::new(
        PlatformCode::Unsupported,
        "no Wi-Fi device found",
    ))
}

/// Scans, then picks the access point to join and the SSID to put in the profile.
///
/// Exact intents use the AP with that SSID, or `/` for hidden networks so
/// NetworkManager probes for it. Prefix intents use the strongest matching AP.
async fn resolve_access_point(
    conn: &Connection,
    wifi: &NMWirelessProxy<'_>,
    intent: &ConnectIntent,
) -> NmResult<(String, OwnedObjectPath)> {
    match wifi.request_scan(HashMap::new()).await {
        Ok(_) => debug!("Scan requested successfully"),
        Err(e) => warn!("Scan request failed: {e}"),
    }
    Delay::new(timeouts::scan_wait()).await;

    let target = intent.target_identity.as_str();
    let mut best: Option<(String, u8, OwnedObjectPath)> = None;

    for ap_path in wifi.access_points().await? {
        let ap = NMAccessPointProxy::builder(conn)
            .path(ap_path.clone())?
            .build()
            .await?;

        let ssid = decode_ssid_or_empty(&ap.ssid().await?).into_owned();
        if !identity_matches(target, intent.match_mode, Some(&ssid)) {
            continue;
        }

        if intent.match_mode == MatchMode::Exact {
            return Ok((ssid, ap_path));
        }

        let strength = ap.strength().await.unwrap_or(0);
        if best.as_ref().is_none_or(|(_, s, _)| strength > *s) {
            best = Some((ssid, strength, ap_path));
        }
    }

    match (best, intent.match_mode) {
        (Some((ssid, strength, path)), _) => {
            debug!("Resolved prefix '{target}' to '{ssid}' ({strength}%)");
            Ok((ssid, path))
        }
        (None, MatchMode::Exact) if intent.hidden => {
            debug!("'{target}' not visible, joining as hidden network");
            let any = OwnedObjectPath::try_from("/").map_err(zbus::Error::from)?;
            Ok((target.to_string(), any))
        }
        (None, _) => Err(PlatformError::new(
            PlatformCode::NotFound,
            format!("no access point matching '{target}' ({})", intent.match_mode),
        )),
    }
}

/// Fails with the device's state reason if activation already failed.
async fn ensure_device_not_failed(conn: &Connection, device: &OwnedObjectPath) -> NmResult<()> {
    let dev = NMDeviceProxy::builder(conn)
        .path(device.clone())?
        .build()
        .await?;

    let (state, reason) = dev.state_reason().await?;
    if state == device_state::FAILED {
        let iface = dev.interface().await.unwrap_or_default();
        return Err(PlatformError::new(
            PlatformCode::Device(StateReason::from(reason)),
            format!("{iface} entered failed state"),
        ));
    }
    Ok(())
}

/// Returns the SSID of the active access point on any Wi-Fi device.
async fn current_ssid(conn: &Connection) -> Option<String> {
    let nm = try_log!(NMProxy::new(conn).await, "Failed to create NM proxy");
    let devices = try_log!(nm.get_devices().await, "Failed to get devices");

    for dp in devices {
        let dev_builder = try_log!(
            NMDeviceProxy::builder(conn).path(dp.clone()),
            "Failed to create device proxy builder"
        );
        let dev = try_log!(dev_builder.build().await, "Failed to build device proxy");
        if try_log!(dev.device_type().await, "Failed to get device type") != device_type::WIFI {
            continue;
        }

        let wifi_builder = try_log!(
            NMWirelessProxy::builder(conn).path(dp),
            "Failed to create wireless proxy builder"
        );
        let wifi = try_log!(wifi_builder.build().await, "Failed to build wireless proxy");

        let Ok(active_ap) = wifi.active_access_point().await else {
            continue;
        };
        if active_ap.as_str() == "/" {
            continue;
        }

        let ap_builder = try_log!(
            NMAccessPointProxy::builder(conn).path(active_ap),
            "Failed to create access point proxy builder"
        );
        let ap = try_log!(ap_builder.build().await, "Failed to build access point proxy");
        let ssid_bytes = try_log!(ap.ssid().await, "Failed to get SSID bytes");
        return Some(decode_ssid_or_empty(&ssid_bytes).into_owned());
    }
    None
}

/// Reapplies the Wi-Fi device's active connection with `metric` on both IP families.
async fn set_route_metric(conn: &Connection, nm: &NMProxy<'_>, metric: i64) -> NmResult<()> {
    let device = find_wifi_device(conn, nm).await?;
    let dev = NMDeviceProxy::builder(conn)
        .path(device)?
        .build()
        .await?;

    let (mut applied, version) = dev.get_applied_connection(0).await?;
    for family in ["ipv4", "ipv6"] {
        applied
            .entry(family.to_string())
            .or_default()
            .insert("route-metric".to_string(), OwnedValue::from(metric));
    }

    dev.reapply(applied, version, 0).await?;
    debug!("Reapplied Wi-Fi connection with route metric {metric}");
    Ok(())
}

/// Runs `delete` on every saved profile, counting the ones it removed.
///
/// A profile that errors is logged and skipped; the rest are still visited.
async fn delete_each<F, Fut>(paths: Vec<OwnedObjectPath>, mut delete: F) -> usize
where
    F: FnMut(OwnedObjectPath) -> Fut,
    Fut: Future<Output = zbus::Result<bool>>,
{
    let mut removed = 0;
    for path in paths {
        let name = path.as_str().to_string();
        match delete(path).await {
            Ok(true) => {
                removed += 1;
                debug!("Deleted connection: {name}");
            }
            Ok(false) => {}
            Err(e) => warn!("Skipping connection {name}: {e}"),
        }
    }
    removed
}

/// Returns `true` if a saved profile's id or SSID equals `identity`.
fn profile_matches(settings: &HashMap<String, HashMap<String, Value<'_>>>, identity: &str) -> bool {
    if let Some(Value::Str(id)) = settings.get("connection").and_then(|c| c.get("id")) {
        if id.as_str() == identity {
            return true;
        }
    }

    if let Some(Value::Array(arr)) = settings.get("802-11-wireless").and_then(|w| w.get("ssid")) {
        let raw: Vec<u8> = arr
            .iter()
            .filter_map(|v| match v {
                Value::U8(b) => Some(*b),
                _ => None,
            })
            .collect();
        return decode_ssid_or_empty(&raw) == identity;
    }

    false
}
