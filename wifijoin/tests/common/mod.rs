//! Scripted platform adapter shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use wifijoin::{
    ApplyOutcome, ConnectIntent, MatchMode, PermissionState, PlatformAdapter, PlatformCode,
    PlatformError, PollPolicy, SecretCipher,
};

/// Adapter whose answers are set up front.
///
/// `current_identity` pops from `script` first and falls back to `fallback`
/// once the script is exhausted. `request_permission` never resolves when no
/// decision is configured.
pub struct MockAdapter {
    script: Mutex<VecDeque<Option<String>>>,
    fallback: Mutex<Option<String>>,
    apply_result: Mutex<Result<ApplyOutcome, PlatformError>>,
    permission: Mutex<PermissionState>,
    decision: Mutex<Option<PermissionState>>,
    fail_bind: AtomicBool,
    fail_unbind: AtomicBool,
    hold_apply: AtomicBool,

    /// Signalled each time `apply_configuration` is entered.
    pub apply_entered: Notify,
    /// Lets a held `apply_configuration` return.
    pub apply_release: Notify,
    pub apply_calls: AtomicUsize,
    pub identity_calls: AtomicUsize,
    pub bind_calls: AtomicUsize,
    pub unbind_calls: AtomicUsize,
    pub removed: Mutex<Vec<String>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            apply_result: Mutex::new(Ok(ApplyOutcome::Accepted)),
            permission: Mutex::new(PermissionState::Granted),
            decision: Mutex::new(None),
            fail_bind: AtomicBool::new(false),
            fail_unbind: AtomicBool::new(false),
            hold_apply: AtomicBool::new(false),
            apply_entered: Notify::new(),
            apply_release: Notify::new(),
            apply_calls: AtomicUsize::new(0),
            identity_calls: AtomicUsize::new(0),
            bind_calls: AtomicUsize::new(0),
            unbind_calls: AtomicUsize::new(0),
            removed: Mutex::new(Vec::new()),
        }
    }

    /// Identity reported once the script runs out.
    pub fn on(self, identity: Option<&str>) -> Self {
        *self.fallback.lock().unwrap() = identity.map(String::from);
        self
    }

    /// Identities reported by the first calls, in order.
    pub fn script(self, identities: &[Option<&str>]) -> Self {
        *self.script.lock().unwrap() = identities.iter().map(|i| i.map(String::from)).collect();
        self
    }

    pub fn apply(self, result: Result<ApplyOutcome, PlatformError>) -> Self {
        *self.apply_result.lock().unwrap() = result;
        self
    }

    pub fn permission(self, state: PermissionState) -> Self {
        *self.permission.lock().unwrap() = state;
        self
    }

    pub fn decision(self, decision: PermissionState) -> Self {
        *self.decision.lock().unwrap() = Some(decision);
        self
    }

    pub fn failing_bind(self) -> Self {
        self.fail_bind.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_unbind(self) -> Self {
        self.fail_unbind.store(true, Ordering::SeqCst);
        self
    }

    /// Makes `apply_configuration` wait for `apply_release` before returning.
    pub fn holding_apply(self) -> Self {
        self.hold_apply.store(true, Ordering::SeqCst);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn apply_count(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn identity_count(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    pub fn bind_count(&self) -> usize {
        self.bind_calls.load(Ordering::SeqCst)
    }

    pub fn unbind_count(&self) -> usize {
        self.unbind_calls.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformAdapter for MockAdapter {
    async fn apply_configuration(
        &self,
        _intent: &ConnectIntent,
    ) -> Result<ApplyOutcome, PlatformError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        self.apply_entered.notify_one();
        if self.hold_apply.load(Ordering::SeqCst) {
            self.apply_release.notified().await;
        }
        self.apply_result.lock().unwrap().clone()
    }

    async fn remove_configuration(&self, identity: &str) -> Result<(), PlatformError> {
        self.removed.lock().unwrap().push(identity.to_string());
        Ok(())
    }

    async fn current_identity(&self) -> Option<String> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(identity) => identity,
            None => self.fallback.lock().unwrap().clone(),
        }
    }

    async fn bind_traffic(&self, _no_internet_allowed: bool) -> Result<(), PlatformError> {
        self.bind_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_bind.load(Ordering::SeqCst) {
            return Err(PlatformError::new(PlatformCode::NoInternet, "mock"));
        }
        Ok(())
    }

    async fn unbind_traffic(&self) -> Result<(), PlatformError> {
        self.unbind_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_unbind.load(Ordering::SeqCst) {
            return Err(PlatformError::new(
                PlatformCode::Bus("org.freedesktop.NetworkManager.Failed".into()),
                "mock",
            ));
        }
        Ok(())
    }

    async fn permission_state(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> PermissionState {
        let decision = *self.decision.lock().unwrap();
        match decision {
            Some(decision) => decision,
            None => futures::future::pending().await,
        }
    }
}

/// Fast policy so timeouts finish in milliseconds.
pub fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy::new()
        .with_max_attempts(max_attempts)
        .with_interval(Duration::from_millis(1))
}

/// Open exact-match intent for `target`.
pub fn open_intent(target: &str) -> ConnectIntent {
    ConnectIntent {
        target_identity: target.into(),
        match_mode: MatchMode::Exact,
        secret: None,
        secret_cipher: SecretCipher::None,
        hidden: false,
        single_use: false,
        permission_required: false,
        bind_traffic: None,
        timeout: None,
    }
}
