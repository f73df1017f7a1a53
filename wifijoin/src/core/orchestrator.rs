//! Connection orchestrator.
//!
//! Drives one join attempt through its states:
//!
//! ```text
//! Idle ─┬─> AwaitingPermission ──> Applying ──> Verifying ──> [Bound] ──> Succeeded
//!       └──────────────────────────^   │            │
//!                                      │            └──> RollingBack ──> Failed
//!                                      └──> Failed
//! ```
//!
//! At most one attempt is in flight at a time. A second `connect` while one
//! is running is rejected immediately rather than queued, since the radio
//! cannot hold two associations. Every exit path publishes exactly one
//! terminal state and returns exactly one error kind. An attempt whose future
//! is dropped mid-flight still rolls back, on a task of its own.

use futures::{FutureExt, select};
use log::{debug, error, info, warn};
use std::pin::pin;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::api::config::PollPolicy;
use crate::api::models::{
    ApplyOutcome, AttemptState, ConnectIntent, ErrorKind, JoinError, MatchMode, PermissionState,
};
use crate::core::binding::TrafficBinder;
use crate::core::error_map::to_join_error;
use crate::core::poller::{PollOutcome, identity_matches, verify};
use crate::platform::PlatformAdapter;

pub(crate) struct Orchestrator {
    adapter: Arc<dyn PlatformAdapter>,
    binder: Arc<TrafficBinder>,
    policy: PollPolicy,
    slot: Arc<AttemptSlot>,
}

/// Published attempt state plus the cancel signal of the attempt in flight.
struct AttemptSlot {
    state: watch::Sender<AttemptState>,
    /// `Some` exactly while an attempt runs, including abandoned-attempt cleanup.
    active: Mutex<Option<CancellationToken>>,
}

impl AttemptSlot {
    fn state(&self) -> AttemptState {
        *self.state.borrow()
    }

    fn transition(&self, next: AttemptState) {
        let prev = self.state.send_replace(next);
        debug!("Attempt state: {prev} -> {next}");
    }

    /// Frees the slot and publishes `terminal` under the same lock, so a
    /// watcher that sees the terminal state can start the next attempt.
    fn release(&self, terminal: AttemptState) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.take();
        self.transition(terminal);
    }
}

/// Releases the in-flight slot, publishing a terminal state.
///
/// Dropped without [`finish`](AttemptGuard::finish) only when the caller
/// abandons the `connect` future mid-attempt, e.g. under an outer timeout.
/// The rollback then runs on a spawned task and the slot stays claimed until
/// it completes.
struct AttemptGuard<'a> {
    orchestrator: &'a Orchestrator,
    intent: &'a ConnectIntent,
    finished: bool,
}

impl AttemptGuard<'_> {
    fn finish(mut self, terminal: AttemptState) {
        self.orchestrator.slot.release(terminal);
        self.finished = true;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let orchestrator = self.orchestrator;
        let abandoned_in = orchestrator.slot.state();
        warn!("Connection attempt abandoned while {abandoned_in}");
        let terminal = AttemptState::Failed(ErrorKind::UnableToConnect);

        // Nothing reached the radio before the permission gate cleared.
        if matches!(abandoned_in, AttemptState::Idle | AttemptState::AwaitingPermission) {
            orchestrator.slot.release(terminal);
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime to roll back abandoned attempt on");
            orchestrator.slot.release(terminal);
            return;
        };

        orchestrator.slot.transition(AttemptState::RollingBack);
        let adapter = Arc::clone(&orchestrator.adapter);
        let binder = Arc::clone(&orchestrator.binder);
        let slot = Arc::clone(&orchestrator.slot);
        let intent = self.intent.clone();
        runtime.spawn(async move {
            roll_back(&*adapter, &binder, &intent).await;
            slot.release(terminal);
        });
    }
}

impl Orchestrator {
    pub(crate) fn new(
        adapter: Arc<dyn PlatformAdapter>,
        binder: Arc<TrafficBinder>,
        policy: PollPolicy,
    ) -> Self {
        let (state, _) = watch::channel(AttemptState::Idle);
        Self {
            adapter,
            binder,
            policy,
            slot: Arc::new(AttemptSlot {
                state,
                active: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub(crate) fn state(&self) -> AttemptState {
        self.slot.state()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<AttemptState> {
        self.slot.state.subscribe()
    }

    /// Signals the attempt in flight, if any, to stop at its next suspension point.
    pub(crate) fn cancel(&self) -> bool {
        let active = self.slot.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some(token) => {
                debug!("Cancelling connection attempt ({})", self.state());
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Runs one attempt to a terminal state.
    pub(crate) async fn connect(&self, intent: &ConnectIntent) -> Result<()> {
        intent.validate()?;
        let (guard, cancel) = self.begin(intent)?;

        debug!(
            "Connecting to '{}' | mode={} secured={} hidden={} single_use={} bind={}",
            intent.target_identity,
            intent.match_mode,
            intent.secured(),
            intent.hidden,
            intent.single_use,
            intent.bind_traffic.is_some()
        );

        let result = self.run(intent, &cancel).await;
        let terminal = match &result {
            Ok(()) => AttemptState::Succeeded,
            Err(e) => AttemptState::Failed(e.kind()),
        };
        guard.finish(terminal);
        result
    }

    /// Claims the in-flight slot or rejects the call as busy.
    fn begin<'a>(
        &'a self,
        intent: &'a ConnectIntent,
    ) -> Result<(AttemptGuard<'a>, CancellationToken)> {
        let mut active = self.slot.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            return Err(JoinError::new(
                ErrorKind::InvalidIntent,
                format!("another connection attempt is in progress ({})", self.state()),
            ));
        }

        let cancel = CancellationToken::new();
        *active = Some(cancel.clone());
        self.slot.state.send_replace(AttemptState::Idle);

        Ok((
            AttemptGuard {
                orchestrator: self,
                intent,
                finished: false,
            },
            cancel,
        ))
    }

    fn transition(&self, next: AttemptState) {
        self.slot.transition(next);
    }

    async fn run(&self, intent: &ConnectIntent, cancel: &CancellationToken) -> Result<()> {
        let target = intent.target_identity.as_str();

        if intent.permission_required {
            self.await_permission(cancel).await?;
        }

        self.transition(AttemptState::Applying);

        let current = self.adapter.current_identity().await;
        if identity_matches(target, intent.match_mode, current.as_deref()) {
            info!(
                "Already connected to '{}', skipping apply",
                current.as_deref().unwrap_or(target)
            );
            self.bind_if_requested(intent).await;
            return Ok(());
        }

        match self.adapter.apply_configuration(intent).await {
            Ok(ApplyOutcome::Accepted) => debug!("Configuration for '{target}' accepted"),
            Ok(ApplyOutcome::AlreadyAssociated) => {
                debug!("Platform reports '{target}' already associated, verifying")
            }
            Err(e) => {
                error!("Applying configuration for '{target}' failed: {e}");
                return Err(to_join_error(e));
            }
        }

        self.transition(AttemptState::Verifying);

        let policy = intent
            .timeout
            .map_or(self.policy, |timeout| self.policy.for_timeout(timeout));

        match verify(&*self.adapter, target, intent.match_mode, policy, cancel).await {
            PollOutcome::Matched { ticks } => {
                info!("Successfully connected to '{target}' after {ticks} check(s)");
                self.bind_if_requested(intent).await;
                Ok(())
            }
            PollOutcome::TimedOut { ticks } => {
                warn!("'{target}' not observed within {:?}", policy.window());
                self.roll_back(intent).await;
                Err(JoinError::new(
                    ErrorKind::ConnectTimeout,
                    format!(
                        "'{target}' not observed after {ticks} check(s) over {:?}",
                        policy.window()
                    ),
                ))
            }
            PollOutcome::Cancelled { ticks } => {
                self.roll_back(intent).await;
                Err(JoinError::new(
                    ErrorKind::ConnectTimeout,
                    format!("cancelled while verifying '{target}' after {ticks} check(s)"),
                ))
            }
        }
    }

    /// Resolves the permission gate, suspending on an undecided state.
    async fn await_permission(&self, cancel: &CancellationToken) -> Result<()> {
        let decision = match self.adapter.permission_state().await {
            PermissionState::Undetermined => {
                self.transition(AttemptState::AwaitingPermission);

                let mut cancelled = pin!(cancel.cancelled().fuse());
                let mut requested = pin!(self.adapter.request_permission().fuse());

                select! {
                    _ = cancelled => {
                        return Err(JoinError::new(
                            ErrorKind::InvalidIntent,
                            "cancelled while awaiting permission",
                        ));
                    }
                    decision = requested => decision,
                }
            }
            decided => decided,
        };

        debug!("Permission decision: {decision}");

        match decision {
            PermissionState::Granted => Ok(()),
            PermissionState::Denied => Err(JoinError::new(
                ErrorKind::PermissionDenied,
                "permission to join networks was denied",
            )),
            PermissionState::Restricted => Err(JoinError::new(
                ErrorKind::PermissionRestricted,
                "permission to join networks is restricted by policy",
            )),
            PermissionState::Undetermined => Err(JoinError::new(
                ErrorKind::UserDenied,
                "permission request was dismissed without a decision",
            )),
        }
    }

    /// Pins traffic when the intent asks for it. Failure keeps the join.
    async fn bind_if_requested(&self, intent: &ConnectIntent) {
        let Some(opts) = intent.bind_traffic else {
            return;
        };

        self.transition(AttemptState::Bound);
        if let Err(e) = self.binder.bind(opts.no_internet_allowed).await {
            warn!(
                "Joined '{}' but traffic binding failed, continuing unbound: {e}",
                intent.target_identity
            );
        }
    }

    /// Best-effort cleanup after verification fails. Never escalates.
    async fn roll_back(&self, intent: &ConnectIntent) {
        self.transition(AttemptState::RollingBack);
        roll_back(&*self.adapter, &self.binder, intent).await;
    }
}

/// Releases any traffic binding and removes a join-once profile.
async fn roll_back(adapter: &dyn PlatformAdapter, binder: &TrafficBinder, intent: &ConnectIntent) {
    if let Err(e) = binder.unbind().await {
        warn!("Rollback could not release traffic binding: {e}");
    }

    // Join-once profiles must not outlive a failed attempt. Anything else
    // may be the user's own saved network.
    if intent.single_use && intent.match_mode == MatchMode::Exact {
        if let Err(e) = adapter.remove_configuration(&intent.target_identity).await {
            warn!(
                "Rollback could not remove configuration for '{}': {e}",
                intent.target_identity
            );
        }
    }
}
