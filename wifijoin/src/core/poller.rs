//! Identity verification by bounded polling.
//!
//! After the platform accepts a configuration the radio still has to
//! associate, and nothing on the adapter surface signals when that happens.
//! The poller asks for the current SSID once per interval until it matches
//! the target or the attempts run out.
//!
//! Every tick is a suspension point: the wait is a timer, not a blocked
//! thread, and the cancel signal is checked alongside it so a cancel stops
//! polling immediately.

use futures::{FutureExt, select};
use futures_timer::Delay;
use log::debug;
use std::pin::pin;
use tokio_util::sync::CancellationToken;

use crate::api::config::PollPolicy;
use crate::api::models::MatchMode;
use crate::platform::PlatformAdapter;

/// How a verification run ended. `ticks` counts identity checks performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The identity matched on check number `ticks`.
    Matched {
        /// Checks performed, including the matching one.
        ticks: u32,
    },
    /// All attempts ran without a match.
    TimedOut {
        /// Checks performed.
        ticks: u32,
    },
    /// The cancel signal fired before a match.
    Cancelled {
        /// Checks performed before cancellation.
        ticks: u32,
    },
}

/// Returns `true` if `observed` satisfies `target` under `mode`.
///
/// An absent identity never matches.
pub fn identity_matches(target: &str, mode: MatchMode, observed: Option<&str>) -> bool {
    let Some(observed) = observed else {
        return false;
    };

    match mode {
        MatchMode::Exact => observed == target,
        MatchMode::PrefixCaseInsensitive => {
            !target.is_empty() && observed.to_lowercase().starts_with(&target.to_lowercase())
        }
    }
}

/// Polls `adapter` until the current identity matches `target`.
///
/// Waits `policy.interval` before each check and performs at most
/// `policy.max_attempts` checks. Returns as soon as a check matches.
pub async fn verify(
    adapter: &dyn PlatformAdapter,
    target: &str,
    mode: MatchMode,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> PollOutcome {
    let mut cancelled = pin!(cancel.cancelled().fuse());
    let mut ticks = 0;

    while ticks < policy.max_attempts {
        let mut tick = pin!(
            async {
                Delay::new(policy.interval).await;
                adapter.current_identity().await
            }
            .fuse()
        );

        let observed = select! {
            _ = cancelled => {
                debug!("Verification of '{target}' cancelled after {ticks} check(s)");
                return PollOutcome::Cancelled { ticks };
            }
            observed = tick => observed,
        };
        ticks += 1;

        if identity_matches(target, mode, observed.as_deref()) {
            debug!("Check {ticks}/{}: '{target}' matched", policy.max_attempts);
            return PollOutcome::Matched { ticks };
        }

        match observed {
            Some(current) => debug!(
                "Check {ticks}/{}: on '{current}', waiting for '{target}' ({mode})",
                policy.max_attempts
            ),
            None => debug!(
                "Check {ticks}/{}: no identity yet, waiting for '{target}'",
                policy.max_attempts
            ),
        }
    }

    PollOutcome::TimedOut { ticks }
}
