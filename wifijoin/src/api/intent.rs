//! Connect call shapes and their normalisation.
//!
//! Historically a join could be requested in many near-identical ways: open,
//! by prefix, protected, protected with options, join-once. They all differ
//! only in a couple of flags, so they are expressed here as constructors on a
//! single loose [`ConnectRequest`] and funnelled through [`normalize`] into one
//! canonical [`ConnectIntent`]. There is exactly one orchestration path.

use std::time::Duration;

use crate::api::models::{
    BindOptions, ConnectIntent, ErrorKind, JoinError, MatchMode, SecretCipher,
};

/// A raw connect call, before normalisation.
///
/// Exactly one of `ssid` or `ssid_prefix` must be set (and non-empty).
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use wifijoin::{ConnectRequest, MatchMode, SecretCipher, normalize};
///
/// // Open IoT access point, forgotten when the app lets go of it.
/// let intent = normalize(ConnectRequest::open("IoT-Device-42").join_once()).unwrap();
/// assert!(intent.single_use);
///
/// // Any camera whose SSID starts with "cam-", WPA protected.
/// let intent = normalize(
///     ConnectRequest::protected_prefix("cam-", "password123", false)
///         .with_timeout(Duration::from_secs(30)),
/// )
/// .unwrap();
/// assert_eq!(intent.match_mode, MatchMode::PrefixCaseInsensitive);
/// assert_eq!(intent.secret_cipher, SecretCipher::Wpa);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Exact SSID to join.
    pub ssid: Option<String>,
    /// SSID prefix to join, matched case-insensitively.
    pub ssid_prefix: Option<String>,
    /// Passphrase or key. Empty means open.
    pub password: Option<String>,
    /// Treat `password` as a WEP key instead of a WPA passphrase.
    pub is_wep: bool,
    /// The network does not broadcast its SSID.
    pub is_hidden: bool,
    /// Ask the platform to drop the network when the app is done with it.
    pub join_once: bool,
    /// Verification window for this call only.
    pub timeout: Option<Duration>,
    /// Wait for a permission decision before touching the radio.
    pub permission_required: bool,
    /// Pin application traffic to the link once verified.
    pub bind_traffic: Option<BindOptions>,
}

impl ConnectRequest {
    /// Join an open network by exact SSID.
    pub fn open(ssid: impl Into<String>) -> Self {
        Self {
            ssid: Some(ssid.into()),
            ..Self::default()
        }
    }

    /// Join an open network whose SSID starts with `prefix`.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            ssid_prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    /// Join a protected network by exact SSID.
    pub fn protected(
        ssid: impl Into<String>,
        password: impl Into<String>,
        is_wep: bool,
        is_hidden: bool,
    ) -> Self {
        Self {
            ssid: Some(ssid.into()),
            password: Some(password.into()),
            is_wep,
            is_hidden,
            ..Self::default()
        }
    }

    /// Join a protected network whose SSID starts with `prefix`.
    pub fn protected_prefix(
        prefix: impl Into<String>,
        password: impl Into<String>,
        is_wep: bool,
    ) -> Self {
        Self {
            ssid_prefix: Some(prefix.into()),
            password: Some(password.into()),
            is_wep,
            ..Self::default()
        }
    }

    /// Request join-once semantics.
    pub fn join_once(mut self) -> Self {
        self.join_once = true;
        self
    }

    /// Overrides the verification window for this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Waits for a permission decision before touching the radio.
    pub fn require_permission(mut self) -> Self {
        self.permission_required = true;
        self
    }

    /// Pins application traffic to the link once it is verified.
    pub fn bind_traffic(mut self, no_internet_allowed: bool) -> Self {
        self.bind_traffic = Some(BindOptions {
            no_internet_allowed,
        });
        self
    }
}

/// Maps a raw connect call into the canonical [`ConnectIntent`].
///
/// Pure and deterministic. An empty password always yields an open network,
/// whatever `is_wep` says.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidIntent`] if both or neither of `ssid` and
/// `ssid_prefix` are given. Empty strings count as absent.
pub fn normalize(request: ConnectRequest) -> Result<ConnectIntent, JoinError> {
    let ssid = request.ssid.filter(|s| !s.is_empty());
    let prefix = request.ssid_prefix.filter(|s| !s.is_empty());

    let (target_identity, match_mode) = match (ssid, prefix) {
        (Some(ssid), None) => (ssid, MatchMode::Exact),
        (None, Some(prefix)) => (prefix, MatchMode::PrefixCaseInsensitive),
        (Some(_), Some(_)) => {
            return Err(JoinError::new(
                ErrorKind::InvalidIntent,
                "specify either an SSID or an SSID prefix, not both",
            ));
        }
        (None, None) => {
            return Err(JoinError::new(
                ErrorKind::InvalidIntent,
                "an SSID or an SSID prefix is required",
            ));
        }
    };

    let secret = request.password.filter(|p| !p.is_empty());
    let secret_cipher = match (&secret, request.is_wep) {
        (None, _) => SecretCipher::None,
        (Some(_), true) => SecretCipher::Wep,
        (Some(_), false) => SecretCipher::Wpa,
    };

    Ok(ConnectIntent {
        target_identity,
        match_mode,
        secret,
        secret_cipher,
        hidden: request.is_hidden,
        single_use: request.join_once,
        permission_required: request.permission_required,
        bind_traffic: request.bind_traffic,
        timeout: request.timeout,
    })
}
