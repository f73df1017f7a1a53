//! D-Bus helpers shared by the NetworkManager adapter.

use log::warn;
use std::borrow::Cow;
use std::str;
use zbus::Connection;
use zvariant::OwnedObjectPath;

/// Decode SSID bytes for comparison purposes, defaulting to empty string if invalid.
pub(crate) fn decode_ssid_or_empty(bytes: &[u8]) -> Cow<'static, str> {
    if bytes.is_empty() {
        return Cow::Borrowed("");
    }

    match str::from_utf8(bytes) {
        Ok(s) => Cow::Owned(s.to_owned()),
        Err(e) => {
            warn!("Invalid UTF-8 in SSID during comparison: {e}");
            Cow::Borrowed("")
        }
    }
}

/// Helper to create a NetworkManager D-Bus proxy for a given path and interface.
pub(crate) async fn nm_proxy<'a, P>(
    conn: &'a Connection,
    path: P,
    interface: &'a str,
) -> zbus::Result<zbus::Proxy<'a>>
where
    P: TryInto<OwnedObjectPath>,
    P::Error: Into<zbus::Error>,
{
    let owned_path = path.try_into().map_err(Into::into)?;
    zbus::proxy::Builder::new(conn)
        .destination("org.freedesktop.NetworkManager")?
        .path(owned_path)?
        .interface(interface)?
        .build()
        .await
}

/// Proxy for NetworkManager's saved-profile store.
pub(crate) async fn settings_proxy(conn: &Connection) -> zbus::Result<zbus::Proxy<'_>> {
    nm_proxy(
        conn,
        "/org/freedesktop/NetworkManager/Settings",
        "org.freedesktop.NetworkManager.Settings",
    )
    .await
}

/// Proxy for one saved profile.
pub(crate) async fn connection_settings_proxy(
    conn: &Connection,
    connection_path: OwnedObjectPath,
) -> zbus::Result<zbus::Proxy<'_>> {
    nm_proxy(
        conn,
        connection_path,
        "org.freedesktop.NetworkManager.Settings.Connection",
    )
    .await
}

/// Macro to convert Result to Option with error logging.
/// Usage: `try_log!(result, "context message")`
#[macro_export]
macro_rules! try_log {
    ($result:expr, $context:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("{}: {:?}", $context, e);
                return None;
            }
        }
    };
}
