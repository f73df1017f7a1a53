use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Longest SSID the 802.11 standard allows, in bytes.
pub const MAX_SSID_BYTES: usize = 32;

/// How an observed network identity is compared against the requested target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    /// The observed SSID must equal the target exactly (case-sensitive).
    Exact,
    /// The observed SSID must start with the target, ignoring case.
    PrefixCaseInsensitive,
}

impl Display for MatchMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::PrefixCaseInsensitive => write!(f, "prefix"),
        }
    }
}

/// Cipher family used to protect the network secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecretCipher {
    /// Open network, no secret.
    #[default]
    None,
    /// WPA/WPA2 personal (pre-shared passphrase).
    Wpa,
    /// Legacy WEP key.
    Wep,
}

/// Options applied when application traffic is pinned to the joined link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BindOptions {
    /// Allow binding even when the link has no general internet reachability.
    ///
    /// IoT devices that advertise their own access point almost never have
    /// an uplink, so callers talking to them should set this.
    pub no_internet_allowed: bool,
}

/// The canonical, platform-independent description of one join attempt.
///
/// Build one with [`normalize`](crate::normalize) from a
/// [`ConnectRequest`](crate::ConnectRequest), or fill the fields directly and
/// let [`WifiJoin::connect`](crate::WifiJoin::connect) validate it.
///
/// # Example
///
/// ```rust
/// use wifijoin::{ConnectIntent, MatchMode, SecretCipher};
///
/// let intent = ConnectIntent {
///     target_identity: "IoT-Device-42".into(),
///     match_mode: MatchMode::Exact,
///     secret: None,
///     secret_cipher: SecretCipher::None,
///     hidden: false,
///     single_use: true,
///     permission_required: false,
///     bind_traffic: None,
///     timeout: None,
/// };
/// assert!(intent.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectIntent {
    /// SSID (exact mode) or SSID prefix (prefix mode).
    pub target_identity: String,
    /// How the target is compared against the observed SSID.
    pub match_mode: MatchMode,
    /// Passphrase or key; `None` for open networks.
    pub secret: Option<String>,
    /// Cipher the secret belongs to.
    pub secret_cipher: SecretCipher,
    /// The network does not broadcast its SSID.
    pub hidden: bool,
    /// Join-once: the platform should forget the network when it is dropped.
    pub single_use: bool,
    /// Wait for a permission decision before touching the radio.
    pub permission_required: bool,
    /// Pin application traffic to the link once it is verified.
    pub bind_traffic: Option<BindOptions>,
    /// Overrides the verification window for this attempt.
    pub timeout: Option<Duration>,
}

impl ConnectIntent {
    /// Checks the intent invariants before any platform call is made.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidIdentity`] for an empty or over-long exact SSID
    /// - [`ErrorKind::InvalidIdentityPrefix`] for an empty or over-long prefix
    /// - [`ErrorKind::InvalidSecret`] when the secret and cipher disagree or
    ///   the secret has an impossible length for its cipher
    pub fn validate(&self) -> Result<(), JoinError> {
        let target_len = self.target_identity.len();
        let target_bad = target_len == 0 || target_len > MAX_SSID_BYTES;

        match self.match_mode {
            MatchMode::Exact if target_bad => {
                return Err(JoinError::new(
                    ErrorKind::InvalidIdentity,
                    format!("SSID must be 1..={MAX_SSID_BYTES} bytes, got {target_len}"),
                ));
            }
            MatchMode::PrefixCaseInsensitive if target_bad => {
                return Err(JoinError::new(
                    ErrorKind::InvalidIdentityPrefix,
                    format!("SSID prefix must be 1..={MAX_SSID_BYTES} bytes, got {target_len}"),
                ));
            }
            _ => {}
        }

        let secret = self.secret.as_deref().filter(|s| !s.is_empty());
        match (secret, self.secret_cipher) {
            (None, SecretCipher::None) => Ok(()),
            (Some(_), SecretCipher::None) => Err(JoinError::new(
                ErrorKind::InvalidSecret,
                "secret supplied for an open network",
            )),
            (None, cipher) => Err(JoinError::new(
                ErrorKind::InvalidSecret,
                format!("{cipher:?} network requires a secret"),
            )),
            (Some(psk), SecretCipher::Wpa) if !is_valid_wpa_passphrase(psk) => Err(JoinError::new(
                ErrorKind::InvalidSecret,
                "WPA passphrase must be 8..=63 characters or 64 hex digits",
            )),
            (Some(key), SecretCipher::Wep) if !is_valid_wep_key(key) => Err(JoinError::new(
                ErrorKind::InvalidSecret,
                "WEP key must be 5 or 13 characters, or 10 or 26 hex digits",
            )),
            (Some(_), _) => Ok(()),
        }
    }

    /// Returns `true` if the intent carries a secret.
    pub fn secured(&self) -> bool {
        self.secret_cipher != SecretCipher::None
    }
}

fn is_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_valid_wpa_passphrase(psk: &str) -> bool {
    let len = psk.chars().count();
    (8..=63).contains(&len) || (len == 64 && is_hex(psk))
}

fn is_valid_wep_key(key: &str) -> bool {
    match key.len() {
        5 | 13 => key.is_ascii(),
        10 | 26 => is_hex(key),
        _ => false,
    }
}

/// Platform permission decision for joining networks and reading the SSID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionState {
    /// The application may proceed.
    Granted,
    /// The user or administrator refused.
    Denied,
    /// Policy forbids the application from ever asking.
    Restricted,
    /// No decision yet; requesting permission may prompt.
    Undetermined,
}

impl Display for PermissionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Restricted => write!(f, "restricted"),
            Self::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Successful answers to an apply-configuration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The platform accepted the configuration and started associating.
    Accepted,
    /// The platform refused because the link is already up. Treated as success.
    AlreadyAssociated,
}

/// Lifecycle of a single connection attempt.
///
/// `Succeeded` and `Failed` are terminal. Every state from
/// `AwaitingPermission` to `RollingBack` means an attempt is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttemptState {
    /// No attempt has started, or a new one is about to.
    #[default]
    Idle,
    /// Suspended until the permission collaborator reports a decision.
    AwaitingPermission,
    /// Asking the platform to apply the configuration.
    Applying,
    /// Polling the current identity until it matches.
    Verifying,
    /// Pinning application traffic to the verified link.
    Bound,
    /// The link is up and verified.
    Succeeded,
    /// Releasing whatever the attempt acquired.
    RollingBack,
    /// The attempt ended with the given error.
    Failed(ErrorKind),
}

impl AttemptState {
    /// Returns `true` while an attempt occupies the radio.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::AwaitingPermission
                | Self::Applying
                | Self::Verifying
                | Self::Bound
                | Self::RollingBack
        )
    }

    /// Returns `true` for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }
}

impl Display for AttemptState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingPermission => write!(f, "awaiting permission"),
            Self::Applying => write!(f, "applying"),
            Self::Verifying => write!(f, "verifying"),
            Self::Bound => write!(f, "binding traffic"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::RollingBack => write!(f, "rolling back"),
            Self::Failed(kind) => write!(f, "failed ({kind})"),
        }
    }
}

/// Whether application traffic is currently pinned to the joined link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindingState {
    /// Traffic is pinned.
    pub bound: bool,
    /// When the current binding was established.
    pub bound_since: Option<SystemTime>,
}

/// Canonical failure categories reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The platform is too old to support the requested operation.
    UnsupportedPlatformVersion,
    /// The request was malformed, the orchestrator was busy, or it was cancelled.
    InvalidIntent,
    /// The SSID is empty or too long.
    InvalidIdentity,
    /// The SSID prefix is empty or too long.
    InvalidIdentityPrefix,
    /// The passphrase or key does not fit its cipher.
    InvalidSecret,
    /// The user dismissed the permission request.
    UserDenied,
    /// Permission was refused.
    PermissionDenied,
    /// Permission cannot be granted under current policy.
    PermissionRestricted,
    /// No matching access point is in range.
    NetworkNotFound,
    /// The current SSID could not be read.
    IdentityUndetectable,
    /// The link did not come up within the verification window.
    ConnectTimeout,
    /// Application traffic could not be pinned or released.
    BindFailed,
    /// The access point rejected the credentials.
    AuthenticationFailed,
    /// Any other platform failure.
    UnableToConnect,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedPlatformVersion => write!(f, "unsupported platform version"),
            Self::InvalidIntent => write!(f, "invalid connection request"),
            Self::InvalidIdentity => write!(f, "invalid SSID"),
            Self::InvalidIdentityPrefix => write!(f, "invalid SSID prefix"),
            Self::InvalidSecret => write!(f, "invalid passphrase"),
            Self::UserDenied => write!(f, "user denied"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::PermissionRestricted => write!(f, "permission restricted"),
            Self::NetworkNotFound => write!(f, "network not found"),
            Self::IdentityUndetectable => write!(f, "could not detect SSID"),
            Self::ConnectTimeout => write!(f, "connection timeout"),
            Self::BindFailed => write!(f, "traffic binding failed"),
            Self::AuthenticationFailed => write!(f, "authentication failed"),
            Self::UnableToConnect => write!(f, "unable to connect"),
        }
    }
}

/// The single error type surfaced to callers: a kind plus a readable message.
///
/// # Example
///
/// ```no_run
/// use wifijoin::{ConnectRequest, ErrorKind, WifiJoin};
///
/// # async fn example() -> wifijoin::Result<()> {
/// let join = WifiJoin::system().await?;
///
/// match join.connect_request(ConnectRequest::open("IoT-Device-42")).await {
///     Ok(()) => println!("joined"),
///     Err(e) if e.kind() == ErrorKind::ConnectTimeout => eprintln!("device not in range"),
///     Err(e) => eprintln!("{e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct JoinError {
    kind: ErrorKind,
    message: String,
}

impl JoinError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The canonical category.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable detail.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// NetworkManager device state reason codes relevant to Wi-Fi joins.
///
/// Use `StateReason::from(code)` to convert the raw `u32` NetworkManager
/// reports alongside a device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateReason {
    /// The reason is unknown.
    Unknown,
    /// No specific reason given.
    None,
    /// The user disconnected the device.
    UserDisconnected,
    /// The device was disconnected by the system.
    DeviceDisconnected,
    /// The carrier/link status changed.
    CarrierChanged,
    /// The Wi-Fi supplicant disconnected unexpectedly.
    SupplicantDisconnected,
    /// The Wi-Fi supplicant's configuration failed.
    SupplicantConfigFailed,
    /// The Wi-Fi supplicant failed (authentication issue).
    SupplicantFailed,
    /// The Wi-Fi supplicant timed out during authentication.
    SupplicantTimeout,
    /// DHCP client failed to start.
    DhcpStartFailed,
    /// DHCP client encountered an error.
    DhcpError,
    /// DHCP client failed to obtain an IP address.
    DhcpFailed,
    /// Failed to set the device mode.
    ModeSetFailed,
    /// Required firmware is missing for the device.
    FirmwareMissing,
    /// The device was removed from the system.
    DeviceRemoved,
    /// The system is entering sleep mode.
    Sleeping,
    /// The connection profile was removed.
    ConnectionRemoved,
    /// The user requested the operation.
    UserRequested,
    /// The requested SSID was not found.
    SsidNotFound,
    /// A new connection activation was queued.
    NewActivationEnqueued,
    /// Unknown reason code not mapped to a specific variant.
    Other(u32),
}

impl From<u32> for StateReason {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::None,
            2 => Self::UserDisconnected,
            3 => Self::DeviceDisconnected,
            4 => Self::CarrierChanged,
            7 => Self::SupplicantDisconnected,
            8 => Self::SupplicantConfigFailed,
            9 => Self::SupplicantFailed,
            10 => Self::SupplicantTimeout,
            15 => Self::DhcpStartFailed,
            16 => Self::DhcpError,
            17 => Self::DhcpFailed,
            45 => Self::ModeSetFailed,
            52 => Self::FirmwareMissing,
            53 => Self::DeviceRemoved,
            54 => Self::Sleeping,
            55 => Self::ConnectionRemoved,
            56 => Self::UserRequested,
            70 => Self::SsidNotFound,
            77 => Self::NewActivationEnqueued,
            v => Self::Other(v),
        }
    }
}

impl Display for StateReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::None => write!(f, "none"),
            Self::UserDisconnected => write!(f, "user disconnected"),
            Self::DeviceDisconnected => write!(f, "device disconnected"),
            Self::CarrierChanged => write!(f, "carrier changed"),
            Self::SupplicantDisconnected => write!(f, "supplicant disconnected"),
            Self::SupplicantConfigFailed => write!(f, "supplicant config failed"),
            Self::SupplicantFailed => write!(f, "supplicant failed"),
            Self::SupplicantTimeout => write!(f, "supplicant timeout"),
            Self::DhcpStartFailed => write!(f, "DHCP start failed"),
            Self::DhcpError => write!(f, "DHCP error"),
            Self::DhcpFailed => write!(f, "DHCP failed"),
            Self::ModeSetFailed => write!(f, "mode set failed"),
            Self::FirmwareMissing => write!(f, "firmware missing"),
            Self::DeviceRemoved => write!(f, "device removed"),
            Self::Sleeping => write!(f, "sleeping"),
            Self::ConnectionRemoved => write!(f, "connection removed"),
            Self::UserRequested => write!(f, "user requested"),
            Self::SsidNotFound => write!(f, "SSID not found"),
            Self::NewActivationEnqueued => write!(f, "new activation enqueued"),
            Self::Other(v) => write!(f, "unknown reason ({v})"),
        }
    }
}

/// Failure codes a platform adapter reports.
///
/// These are translated exactly once into an [`ErrorKind`] by
/// [`map_platform_code`](crate::map_platform_code).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCode {
    /// No capable device, or the platform lacks the required API.
    Unsupported,
    /// The platform rejected the configuration as malformed.
    InvalidConfiguration,
    /// The platform rejected the SSID.
    InvalidSsid,
    /// The platform rejected the SSID prefix.
    InvalidSsidPrefix,
    /// The platform rejected the passphrase or key.
    InvalidPassphrase,
    /// The user dismissed an authorisation prompt.
    UserDenied,
    /// The caller lacks permission.
    PermissionDenied,
    /// Policy forbids the caller from acquiring permission.
    PermissionRestricted,
    /// No matching access point is visible.
    NotFound,
    /// The current SSID cannot be read.
    IdentityUnavailable,
    /// Credentials were rejected by the access point.
    AuthFailed,
    /// The platform gave up waiting.
    Timeout,
    /// The link has no general internet reachability.
    NoInternet,
    /// The Wi-Fi device failed with a NetworkManager reason.
    Device(StateReason),
    /// An unclassified D-Bus error, by error name.
    Bus(String),
}

impl Display for PlatformCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "unsupported"),
            Self::InvalidConfiguration => write!(f, "invalid configuration"),
            Self::InvalidSsid => write!(f, "invalid SSID"),
            Self::InvalidSsidPrefix => write!(f, "invalid SSID prefix"),
            Self::InvalidPassphrase => write!(f, "invalid passphrase"),
            Self::UserDenied => write!(f, "user denied"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::PermissionRestricted => write!(f, "permission restricted"),
            Self::NotFound => write!(f, "not found"),
            Self::IdentityUnavailable => write!(f, "identity unavailable"),
            Self::AuthFailed => write!(f, "authentication failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::NoInternet => write!(f, "no internet connectivity"),
            Self::Device(reason) => write!(f, "device failed: {reason}"),
            Self::Bus(name) => write!(f, "D-Bus error {name}"),
        }
    }
}

/// An adapter-level failure: a code plus whatever detail the platform gave.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {detail}")]
pub struct PlatformError {
    /// What went wrong, in platform terms.
    pub code: PlatformCode,
    /// Free-form detail from the platform.
    pub detail: String,
}

impl PlatformError {
    /// Creates a platform error.
    pub fn new(code: PlatformCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}
