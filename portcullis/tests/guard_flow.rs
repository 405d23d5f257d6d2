//! End-to-end flows through the wired guard: login gating, lockout
//! escalation, capability checks, and event publication.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use portcullis::{
    Broadcaster, LoginGate, MemoryLockoutStore, Portcullis, ProjectPermission, ProjectRole,
    capabilities,
};
use portcullis_core::{DomainEvent, Room, error::EventError};

struct RecordingBroadcaster {
    delivered: Mutex<Vec<(Room, String)>>,
}

impl RecordingBroadcaster {
    fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
        }
    }

    fn events(&self) -> Vec<(Room, String)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn broadcast(&self, room: &Room, event: &DomainEvent) -> Result<(), EventError> {
        self.delivered
            .lock()
            .unwrap()
            .push((room.clone(), event.name.clone()));
        Ok(())
    }
}

fn guard() -> Portcullis<MemoryLockoutStore> {
    Portcullis::new(Arc::new(MemoryLockoutStore::new()))
}

#[tokio::test]
async fn login_flow_locks_after_five_failures_and_resets_on_success() {
    let guard = guard();
    let email = "alice@example.com";
    let ip = "203.0.113.7";

    assert_eq!(
        guard.check_login(email, ip).await.unwrap(),
        LoginGate::Allowed
    );

    for _ in 0..4 {
        assert_eq!(guard.record_failed_login(email, ip).await.unwrap(), None);
        assert_eq!(
            guard.check_login(email, ip).await.unwrap(),
            LoginGate::Allowed
        );
    }

    // Fifth failure arms a fifteen-minute lock.
    assert_eq!(
        guard.record_failed_login(email, ip).await.unwrap(),
        Some(900)
    );
    match guard.check_login(email, ip).await.unwrap() {
        LoginGate::AccountLocked {
            retry_after_seconds,
        } => {
            assert!((1..=900).contains(&retry_after_seconds));
        }
        other => panic!("expected AccountLocked, got {other:?}"),
    }

    // A sixth failure does not arm a new lock.
    assert_eq!(guard.record_failed_login(email, ip).await.unwrap(), None);

    guard.record_successful_login(email).await.unwrap();
    assert_eq!(
        guard.check_login(email, ip).await.unwrap(),
        LoginGate::Allowed
    );

    let status = guard.lockout_status(email).await.unwrap();
    assert_eq!(status.failed_attempts, 0);
    assert!(!status.is_locked);
}

#[tokio::test]
async fn ip_window_throttles_after_twenty_failures() {
    let guard = guard();
    let ip = "10.0.0.5";

    for i in 0..20 {
        let email = format!("victim{i}@example.com");
        guard.record_failed_login(&email, ip).await.unwrap();
    }

    match guard.check_login("fresh@example.com", ip).await.unwrap() {
        LoginGate::IpRateLimited {
            retry_after_seconds,
        } => {
            assert!((1..=900).contains(&retry_after_seconds));
        }
        other => panic!("expected IpRateLimited, got {other:?}"),
    }

    // A different IP is unaffected.
    assert_eq!(
        guard
            .check_login("fresh@example.com", "10.0.0.6")
            .await
            .unwrap(),
        LoginGate::Allowed
    );
}

#[tokio::test]
async fn lockout_lifecycle_events_reach_the_user_room() {
    let guard = guard();
    let broadcaster = Arc::new(RecordingBroadcaster::new());
    guard.attach_broadcaster(broadcaster.clone()).await;

    for _ in 0..5 {
        guard
            .record_failed_login("Alice@Example.com", "203.0.113.7")
            .await
            .unwrap();
    }
    guard
        .record_successful_login("Alice@Example.com")
        .await
        .unwrap();

    let events = broadcaster.events();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        (
            Room::User("alice@example.com".to_string()),
            "auth.lockout_armed".to_string()
        )
    );
    assert_eq!(
        events[1],
        (
            Room::User("alice@example.com".to_string()),
            "auth.lockout_cleared".to_string()
        )
    );
}

#[tokio::test]
async fn events_are_dropped_quietly_without_a_broadcaster() {
    let guard = guard();

    // No broadcaster attached: arming a lock must still succeed.
    for _ in 0..5 {
        guard
            .record_failed_login("bob@example.com", "203.0.113.8")
            .await
            .unwrap();
    }
    assert!(matches!(
        guard
            .check_login("bob@example.com", "203.0.113.8")
            .await
            .unwrap(),
        LoginGate::AccountLocked { .. }
    ));
}

#[tokio::test]
async fn authorize_delegates_to_the_resolver() {
    let guard = guard();

    let owner = ProjectPermission::from_role(ProjectRole::Owner);
    let editor = ProjectPermission::from_role(ProjectRole::Editor);
    let viewer = ProjectPermission::from_role(ProjectRole::Viewer);

    assert!(guard.authorize(&owner, capabilities::MEMBERS_MANAGE));
    assert!(guard.authorize(&editor, capabilities::TASK_CREATE));
    assert!(!guard.authorize(&editor, capabilities::MEMBERS_MANAGE));
    assert!(!guard.authorize(&viewer, capabilities::TASK_CREATE));
}

#[tokio::test]
async fn sweep_lifecycle_starts_and_shuts_down() {
    let guard = guard();
    guard.start_sweep();
    // Idempotent while running.
    guard.start_sweep();
    guard.shutdown().await;
}
