//! End-to-end attempts against a scripted adapter.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockAdapter, fast_policy, open_intent};
use wifijoin::{
    ApplyOutcome, AttemptState, BindOptions, ConnectIntent, ConnectRequest, ErrorKind,
    MatchMode, PermissionState, PlatformCode, PlatformError, PollPolicy, WifiJoin,
};

const TARGET: &str = "IoT-Device-42";

fn join_with(adapter: &Arc<MockAdapter>) -> WifiJoin {
    WifiJoin::with_policy(adapter.clone(), fast_policy(20))
}

fn bound_once(target: &str) -> ConnectIntent {
    ConnectIntent {
        single_use: true,
        bind_traffic: Some(BindOptions {
            no_internet_allowed: true,
        }),
        ..open_intent(target)
    }
}

#[tokio::test]
async fn already_connected_skips_apply() {
    let adapter = MockAdapter::new().on(Some(TARGET)).build();
    let join = join_with(&adapter);

    join.connect(bound_once(TARGET)).await.unwrap();

    assert_eq!(adapter.apply_count(), 0);
    assert_eq!(join.attempt_state(), AttemptState::Succeeded);
    assert!(join.binding_state().await.bound);
}

#[tokio::test]
async fn already_associated_still_verifies() {
    let adapter = MockAdapter::new()
        .script(&[None])
        .on(Some(TARGET))
        .apply(Ok(ApplyOutcome::AlreadyAssociated))
        .build();
    let join = join_with(&adapter);

    join.connect(open_intent(TARGET)).await.unwrap();

    assert_eq!(adapter.apply_count(), 1);
    assert_eq!(join.attempt_state(), AttemptState::Succeeded);
}

#[tokio::test]
async fn joins_after_a_few_checks_and_binds() {
    let adapter = MockAdapter::new()
        .script(&[None, None, None])
        .on(Some(TARGET))
        .build();
    let join = join_with(&adapter);

    join.connect(bound_once(TARGET)).await.unwrap();

    assert_eq!(join.attempt_state(), AttemptState::Succeeded);
    assert_eq!(adapter.apply_count(), 1);
    // One pre-apply check plus three verification checks.
    assert_eq!(adapter.identity_count(), 4);
    assert_eq!(adapter.bind_count(), 1);
    assert!(join.binding_state().await.bound);
    assert!(adapter.removed().is_empty());
}

#[tokio::test]
async fn timeout_rolls_back_join_once_profile() {
    let adapter = MockAdapter::new().on(None).build();
    let join = join_with(&adapter);

    let err = join.connect(bound_once(TARGET)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConnectTimeout);
    assert_eq!(
        join.attempt_state(),
        AttemptState::Failed(ErrorKind::ConnectTimeout)
    );
    assert_eq!(adapter.identity_count(), 21);
    assert_eq!(adapter.bind_count(), 0);
    assert!(!join.binding_state().await.bound);
    assert_eq!(adapter.removed(), vec![TARGET.to_string()]);
}

#[tokio::test]
async fn timeout_keeps_saved_profile() {
    let adapter = MockAdapter::new().on(Some("Home")).build();
    let join = join_with(&adapter);

    let err = join.connect(open_intent(TARGET)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConnectTimeout);
    assert!(adapter.removed().is_empty());
}

#[tokio::test]
async fn prefix_timeout_never_removes() {
    let adapter = MockAdapter::new().on(None).build();
    let join = join_with(&adapter);

    let intent = ConnectIntent {
        match_mode: MatchMode::PrefixCaseInsensitive,
        single_use: true,
        ..open_intent("cam-")
    };
    let err = join.connect(intent).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConnectTimeout);
    assert!(adapter.removed().is_empty());
}

#[tokio::test]
async fn rollback_releases_prior_binding_even_if_platform_fails() {
    let adapter = MockAdapter::new().on(None).failing_unbind().build();
    let join = join_with(&adapter);

    join.set_traffic_binding(true, true).await.unwrap();
    assert!(join.binding_state().await.bound);

    let err = join.connect(open_intent(TARGET)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConnectTimeout);
    assert_eq!(adapter.unbind_count(), 1);
    assert!(!join.binding_state().await.bound);
}

#[tokio::test]
async fn denied_permission_touches_nothing() {
    let adapter = MockAdapter::new()
        .on(Some(TARGET))
        .permission(PermissionState::Denied)
        .build();
    let join = join_with(&adapter);

    let intent = ConnectIntent {
        permission_required: true,
        ..open_intent(TARGET)
    };
    let err = join.connect(intent).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(adapter.apply_count(), 0);
    assert_eq!(adapter.identity_count(), 0);
    assert_eq!(
        join.attempt_state(),
        AttemptState::Failed(ErrorKind::PermissionDenied)
    );
}

#[tokio::test]
async fn restricted_permission_fails() {
    let adapter = MockAdapter::new()
        .permission(PermissionState::Restricted)
        .build();
    let join = join_with(&adapter);

    let intent = ConnectIntent {
        permission_required: true,
        ..open_intent(TARGET)
    };
    let err = join.connect(intent).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermissionRestricted);
}

#[tokio::test]
async fn permission_not_required_ignores_state() {
    let adapter = MockAdapter::new()
        .on(Some(TARGET))
        .permission(PermissionState::Denied)
        .build();
    let join = join_with(&adapter);

    join.connect(open_intent(TARGET)).await.unwrap();
}

#[tokio::test]
async fn undetermined_permission_granted_on_request() {
    let adapter = MockAdapter::new()
        .script(&[None])
        .on(Some(TARGET))
        .permission(PermissionState::Undetermined)
        .decision(PermissionState::Granted)
        .build();
    let join = join_with(&adapter);

    let intent = ConnectIntent {
        permission_required: true,
        ..open_intent(TARGET)
    };
    join.connect(intent).await.unwrap();

    assert_eq!(join.attempt_state(), AttemptState::Succeeded);
}

#[tokio::test]
async fn dismissed_prompt_is_user_denied() {
    let adapter = MockAdapter::new()
        .permission(PermissionState::Undetermined)
        .decision(PermissionState::Undetermined)
        .build();
    let join = join_with(&adapter);

    let intent = ConnectIntent {
        permission_required: true,
        ..open_intent(TARGET)
    };
    let err = join.connect(intent).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserDenied);
    assert_eq!(adapter.apply_count(), 0);
}

#[tokio::test]
async fn second_connect_while_busy_is_rejected() {
    let adapter = MockAdapter::new()
        .permission(PermissionState::Undetermined)
        .build();
    let join = Arc::new(join_with(&adapter));

    let mut states = join.watch_attempt_state();
    let first = tokio::spawn({
        let join = Arc::clone(&join);
        async move {
            let intent = ConnectIntent {
                permission_required: true,
                ..open_intent(TARGET)
            };
            join.connect(intent).await
        }
    });

    states
        .wait_for(|s| *s == AttemptState::AwaitingPermission)
        .await
        .unwrap();

    let err = join.connect(open_intent("Other")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidIntent);
    assert_eq!(join.attempt_state(), AttemptState::AwaitingPermission);

    assert!(join.cancel());
    let err = first.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidIntent);
    assert_eq!(
        join.attempt_state(),
        AttemptState::Failed(ErrorKind::InvalidIntent)
    );

    assert!(!join.cancel());
}

#[tokio::test]
async fn cancel_during_verification_rolls_back() {
    let adapter = MockAdapter::new().on(None).build();
    let policy = PollPolicy::new()
        .with_max_attempts(10_000)
        .with_interval(Duration::from_millis(10));
    let join = Arc::new(WifiJoin::with_policy(adapter.clone(), policy));

    let mut states = join.watch_attempt_state();
    let attempt = tokio::spawn({
        let join = Arc::clone(&join);
        async move { join.connect(bound_once(TARGET)).await }
    });

    states
        .wait_for(|s| *s == AttemptState::Verifying)
        .await
        .unwrap();
    assert!(join.cancel());

    let err = attempt.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectTimeout);
    assert!(err.message().contains("cancelled"));
    assert_eq!(adapter.removed(), vec![TARGET.to_string()]);
}

#[tokio::test]
async fn cancel_during_apply_rolls_back_before_polling() {
    let adapter = MockAdapter::new().on(None).holding_apply().build();
    let join = Arc::new(join_with(&adapter));
    join.set_traffic_binding(true, true).await.unwrap();

    let attempt = tokio::spawn({
        let join = Arc::clone(&join);
        async move { join.connect(bound_once(TARGET)).await }
    });

    adapter.apply_entered.notified().await;
    assert_eq!(join.attempt_state(), AttemptState::Applying);
    assert!(join.cancel());
    adapter.apply_release.notify_one();

    let err = attempt.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectTimeout);
    assert!(err.message().contains("cancelled"));
    assert_eq!(
        join.attempt_state(),
        AttemptState::Failed(ErrorKind::ConnectTimeout)
    );
    // Only the pre-apply check ran; verification stopped before its first tick.
    assert_eq!(adapter.identity_count(), 1);
    assert_eq!(adapter.unbind_count(), 1);
    assert!(!join.binding_state().await.bound);
    assert_eq!(adapter.removed(), vec![TARGET.to_string()]);
}

#[tokio::test]
async fn abandoned_attempt_still_rolls_back() {
    let adapter = MockAdapter::new().on(None).build();
    let join = WifiJoin::with_policy(adapter.clone(), fast_policy(100_000));
    join.set_traffic_binding(true, true).await.unwrap();

    let intent = ConnectIntent {
        single_use: true,
        ..open_intent(TARGET)
    };
    let mut states = join.watch_attempt_state();
    let outcome = tokio::time::timeout(Duration::from_millis(50), join.connect(intent)).await;
    assert!(outcome.is_err());

    states
        .wait_for(|s| *s == AttemptState::Failed(ErrorKind::UnableToConnect))
        .await
        .unwrap();

    assert_eq!(adapter.unbind_count(), 1);
    assert!(!join.binding_state().await.bound);
    assert_eq!(adapter.removed(), vec![TARGET.to_string()]);

    // The slot is free again once cleanup has finished.
    assert!(!join.cancel());
}

#[tokio::test]
async fn abandoned_permission_wait_frees_slot_without_rollback() {
    let adapter = MockAdapter::new()
        .permission(PermissionState::Undetermined)
        .build();
    let join = join_with(&adapter);

    let intent = ConnectIntent {
        permission_required: true,
        single_use: true,
        ..open_intent(TARGET)
    };
    let outcome = tokio::time::timeout(Duration::from_millis(20), join.connect(intent)).await;
    assert!(outcome.is_err());

    assert_eq!(
        join.attempt_state(),
        AttemptState::Failed(ErrorKind::UnableToConnect)
    );
    assert!(adapter.removed().is_empty());
    assert!(!join.cancel());
}

#[tokio::test]
async fn apply_failure_maps_once_without_rollback() {
    let adapter = MockAdapter::new()
        .apply(Err(PlatformError::new(PlatformCode::NotFound, "no AP")))
        .build();
    let join = join_with(&adapter);

    let err = join.connect(bound_once(TARGET)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NetworkNotFound);
    assert_eq!(
        join.attempt_state(),
        AttemptState::Failed(ErrorKind::NetworkNotFound)
    );
    assert!(adapter.removed().is_empty());
    assert_eq!(adapter.bind_count(), 0);
}

#[tokio::test]
async fn invalid_intent_never_leaves_idle() {
    let adapter = MockAdapter::new().build();
    let join = join_with(&adapter);

    let err = join.connect(open_intent("")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidIdentity);
    assert_eq!(join.attempt_state(), AttemptState::Idle);
    assert_eq!(adapter.identity_count(), 0);
    assert_eq!(adapter.apply_count(), 0);
}

#[tokio::test]
async fn failed_bind_keeps_successful_join() {
    let adapter = MockAdapter::new()
        .script(&[None])
        .on(Some(TARGET))
        .failing_bind()
        .build();
    let join = join_with(&adapter);

    join.connect(bound_once(TARGET)).await.unwrap();

    assert_eq!(join.attempt_state(), AttemptState::Succeeded);
    assert_eq!(adapter.bind_count(), 1);
    assert!(!join.binding_state().await.bound);
}

#[tokio::test]
async fn prefix_request_joins_matching_ssid() {
    let adapter = MockAdapter::new()
        .script(&[Some("Home")])
        .on(Some("CAM-0042"))
        .build();
    let join = join_with(&adapter);

    join.connect_request(ConnectRequest::prefix("cam-"))
        .await
        .unwrap();

    assert_eq!(join.attempt_state(), AttemptState::Succeeded);
}

#[tokio::test]
async fn per_intent_timeout_overrides_policy() {
    let adapter = MockAdapter::new().on(None).build();
    let join = join_with(&adapter);

    let intent = ConnectIntent {
        timeout: Some(Duration::from_millis(5)),
        ..open_intent(TARGET)
    };
    let err = join.connect(intent).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConnectTimeout);
    // 5ms at a 1ms interval is five checks, after the pre-apply check.
    assert_eq!(adapter.identity_count(), 6);
}

#[tokio::test]
async fn disconnect_releases_binding_and_profile() {
    let adapter = MockAdapter::new().on(Some(TARGET)).build();
    let join = join_with(&adapter);

    join.connect(bound_once(TARGET)).await.unwrap();
    join.disconnect(TARGET).await;

    assert!(!join.binding_state().await.bound);
    assert_eq!(adapter.unbind_count(), 1);
    assert_eq!(adapter.removed(), vec![TARGET.to_string()]);
}

#[tokio::test]
async fn current_identity_reports_absence_and_denial() {
    let adapter = MockAdapter::new().build();
    let join = join_with(&adapter);
    let err = join.get_current_identity().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IdentityUndetectable);

    let adapter = MockAdapter::new()
        .on(Some(TARGET))
        .permission(PermissionState::Denied)
        .build();
    let join = join_with(&adapter);
    let err = join.get_current_identity().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(adapter.identity_count(), 0);

    let adapter = MockAdapter::new().on(Some(TARGET)).build();
    let join = join_with(&adapter);
    assert_eq!(join.get_current_identity().await.unwrap(), TARGET);
}
