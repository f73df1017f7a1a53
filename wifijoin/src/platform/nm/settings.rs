//! NetworkManager connection settings for on-demand joins.
//!
//! Constructs the nested dictionary `AddAndActivateConnection` expects:
//! - `connection`: type, id, uuid, autoconnect
//! - `802-11-wireless`: ssid, mode, hidden, security reference
//! - `802-11-wireless-security`: WPA-PSK or WEP key material
//! - `ipv4` / `ipv6`: automatic configuration

use std::collections::HashMap;
use uuid::Uuid;
use zvariant::Value;

use crate::api::models::{ConnectIntent, SecretCipher};

/// Settings dictionary in the shape NetworkManager's D-Bus API takes.
pub(crate) type Settings = HashMap<&'static str, HashMap<&'static str, Value<'static>>>;

const WIRELESS: &str = "802-11-wireless";
const WIRELESS_SECURITY: &str = "802-11-wireless-security";

/// Builder for a Wi-Fi profile.
///
/// Defaults to an open, visible network that autoconnects.
pub(crate) struct WifiProfileBuilder {
    ssid: String,
    uuid: Uuid,
    autoconnect: bool,
    hidden: bool,
    security: Option<HashMap<&'static str, Value<'static>>>,
}

impl WifiProfileBuilder {
    pub(crate) fn new(ssid: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            uuid: Uuid::new_v4(),
            autoconnect: true,
            hidden: false,
            security: None,
        }
    }

    /// Sets a specific UUID instead of a random one.
    #[cfg(test)]
    pub(crate) fn uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub(crate) fn autoconnect(mut self, enabled: bool) -> Self {
        self.autoconnect = enabled;
        self
    }

    /// Marks the network as not broadcasting its SSID, so NetworkManager probes for it.
    pub(crate) fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// WPA/WPA2 personal with the given passphrase.
    pub(crate) fn wpa_psk(mut self, psk: impl Into<String>) -> Self {
        let mut security = HashMap::new();
        security.insert("key-mgmt", Value::from("wpa-psk"));
        security.insert("psk", Value::from(psk.into()));
        security.insert("psk-flags", Value::from(0u32));
        security.insert("auth-alg", Value::from("open"));
        self.security = Some(security);
        self
    }

    /// Static WEP with the key in slot 0.
    pub(crate) fn wep_key(mut self, key: impl Into<String>) -> Self {
        let mut security = HashMap::new();
        security.insert("key-mgmt", Value::from("none"));
        security.insert("wep-key0", Value::from(key.into()));
        // 1 = hex or ASCII key, 2 = passphrase to be hashed
        security.insert("wep-key-type", Value::from(1u32));
        security.insert("wep-tx-keyidx", Value::from(0u32));
        security.insert("auth-alg", Value::from("open"));
        self.security = Some(security);
        self
    }

    pub(crate) fn build(self) -> Settings {
        let mut settings = HashMap::new();

        let mut connection = HashMap::new();
        connection.insert("type", Value::from(WIRELESS));
        connection.insert("id", Value::from(self.ssid.clone()));
        connection.insert("uuid", Value::from(self.uuid.to_string()));
        connection.insert("autoconnect", Value::from(self.autoconnect));
        settings.insert("connection", connection);

        let mut wireless = HashMap::new();
        wireless.insert("ssid", Value::from(self.ssid.into_bytes()));
        wireless.insert("mode", Value::from("infrastructure"));
        if self.hidden {
            wireless.insert("hidden", Value::from(true));
        }
        if let Some(security) = self.security {
            wireless.insert("security", Value::from(WIRELESS_SECURITY));
            settings.insert(WIRELESS_SECURITY, security);
        }
        settings.insert(WIRELESS, wireless);

        let mut ipv4 = HashMap::new();
        ipv4.insert("method", Value::from("auto"));
        settings.insert("ipv4", ipv4);

        let mut ipv6 = HashMap::new();
        ipv6.insert("method", Value::from("auto"));
        settings.insert("ipv6", ipv6);

        settings
    }
}

/// Builds the profile for `intent`, joining the concrete SSID `ssid`.
///
/// For prefix intents `ssid` is the resolved access point's SSID, not the prefix.
pub(crate) fn build_join_settings(ssid: &str, intent: &ConnectIntent) -> Settings {
    let builder = WifiProfileBuilder::new(ssid)
        .autoconnect(!intent.single_use)
        .hidden(intent.hidden);

    let secret = intent.secret.clone().unwrap_or_default();
    match intent.secret_cipher {
        SecretCipher::None => builder,
        SecretCipher::Wpa => builder.wpa_psk(secret),
        SecretCipher::Wep => builder.wep_key(secret),
    }
    .build()
}
