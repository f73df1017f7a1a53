//! Translation of platform failure codes into canonical error kinds.

use crate::api::models::{ErrorKind, JoinError, PlatformCode, PlatformError, StateReason};

/// Maps a platform failure code to a canonical [`ErrorKind`].
///
/// Unrecognised codes map to [`ErrorKind::UnableToConnect`]; nothing is
/// silently dropped.
pub fn map_platform_code(code: &PlatformCode) -> ErrorKind {
    match code {
        PlatformCode::Unsupported => ErrorKind::UnsupportedPlatformVersion,
        PlatformCode::InvalidConfiguration => ErrorKind::InvalidIntent,
        PlatformCode::InvalidSsid => ErrorKind::InvalidIdentity,
        PlatformCode::InvalidSsidPrefix => ErrorKind::InvalidIdentityPrefix,
        PlatformCode::InvalidPassphrase => ErrorKind::InvalidSecret,
        PlatformCode::UserDenied => ErrorKind::UserDenied,
        PlatformCode::PermissionDenied => ErrorKind::PermissionDenied,
        PlatformCode::PermissionRestricted => ErrorKind::PermissionRestricted,
        PlatformCode::NotFound => ErrorKind::NetworkNotFound,
        PlatformCode::IdentityUnavailable => ErrorKind::IdentityUndetectable,
        PlatformCode::AuthFailed => ErrorKind::AuthenticationFailed,
        PlatformCode::Timeout => ErrorKind::ConnectTimeout,
        PlatformCode::NoInternet => ErrorKind::BindFailed,
        PlatformCode::Device(reason) => reason_to_kind(*reason),
        PlatformCode::Bus(_) => ErrorKind::UnableToConnect,
    }
}

/// Maps a NetworkManager device state reason to a canonical [`ErrorKind`].
fn reason_to_kind(reason: StateReason) -> ErrorKind {
    match reason {
        // Authentication failures
        StateReason::SupplicantFailed | StateReason::SupplicantDisconnected => {
            ErrorKind::AuthenticationFailed
        }

        // The supplicant could not use the key we gave it
        StateReason::SupplicantConfigFailed => ErrorKind::InvalidSecret,

        StateReason::SupplicantTimeout => ErrorKind::ConnectTimeout,

        StateReason::SsidNotFound => ErrorKind::NetworkNotFound,

        _ => ErrorKind::UnableToConnect,
    }
}

/// Translates an adapter failure into the caller-visible error, once.
pub(crate) fn to_join_error(err: PlatformError) -> JoinError {
    let kind = map_platform_code(&err.code);
    JoinError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_codes() {
        assert_eq!(
            map_platform_code(&PlatformCode::Unsupported),
            ErrorKind::UnsupportedPlatformVersion
        );
        assert_eq!(
            map_platform_code(&PlatformCode::InvalidSsidPrefix),
            ErrorKind::InvalidIdentityPrefix
        );
        assert_eq!(
            map_platform_code(&PlatformCode::PermissionRestricted),
            ErrorKind::PermissionRestricted
        );
        assert_eq!(
            map_platform_code(&PlatformCode::NotFound),
            ErrorKind::NetworkNotFound
        );
        assert_eq!(
            map_platform_code(&PlatformCode::IdentityUnavailable),
            ErrorKind::IdentityUndetectable
        );
    }

    #[test]
    fn device_reasons() {
        assert_eq!(
            map_platform_code(&PlatformCode::Device(StateReason::from(9))),
            ErrorKind::AuthenticationFailed
        );
        assert_eq!(
            map_platform_code(&PlatformCode::Device(StateReason::from(8))),
            ErrorKind::InvalidSecret
        );
        assert_eq!(
            map_platform_code(&PlatformCode::Device(StateReason::from(10))),
            ErrorKind::ConnectTimeout
        );
        assert_eq!(
            map_platform_code(&PlatformCode::Device(StateReason::from(70))),
            ErrorKind::NetworkNotFound
        );
    }

    #[test]
    fn unrecognised_codes_are_unable_to_connect() {
        assert_eq!(
            map_platform_code(&PlatformCode::Device(StateReason::Other(999))),
            ErrorKind::UnableToConnect
        );
        assert_eq!(
            map_platform_code(&PlatformCode::Bus("org.example.Weird".into())),
            ErrorKind::UnableToConnect
        );
    }

    #[test]
    fn join_error_keeps_platform_detail() {
        let err = to_join_error(PlatformError::new(PlatformCode::NotFound, "no AP 'Cam'"));
        assert_eq!(err.kind(), ErrorKind::NetworkNotFound);
        assert_eq!(err.message(), "not found: no AP 'Cam'");
    }
}
