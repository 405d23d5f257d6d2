//! Real-time event fan-out to broadcast rooms.
//!
//! A thin publishing layer over whatever real-time transport the deployment
//! runs. Domain code emits a [`DomainEvent`] to a project- or user-scoped
//! [`Room`]; the attached [`Broadcaster`] delivers it to every connected
//! client in that room. Delivery is strictly best-effort: no acknowledgment,
//! ordering, replay, or persistence. A client offline at emission time
//! misses the event permanently and recovers state by re-fetching on
//! reconnect.
//!
//! Emission never fails from the caller's point of view. If no broadcaster
//! is attached yet (startup, tests) or the transport errors, the fan-out
//! logs a warning and returns normally.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::error::EventError;

/// A named broadcast channel grouping connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    /// Every client viewing the given project.
    Project(String),
    /// Every connection belonging to the given user.
    User(String),
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Room::Project(id) => write!(f, "project:{id}"),
            Room::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// An event-name string plus a JSON payload.
#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent {
    pub name: String,
    pub payload: Value,
}

impl DomainEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    pub fn task_created(task_id: &str, payload: Value) -> Self {
        Self::new("task.created", json!({ "taskId": task_id, "task": payload }))
    }

    pub fn task_status_changed(task_id: &str, status: &str) -> Self {
        Self::new(
            "task.status_changed",
            json!({ "taskId": task_id, "status": status }),
        )
    }

    pub fn comment_posted(task_id: &str, comment: Value) -> Self {
        Self::new(
            "comment.posted",
            json!({ "taskId": task_id, "comment": comment }),
        )
    }

    pub fn notification(payload: Value) -> Self {
        Self::new("notification", payload)
    }

    /// Security event: a lockout was armed for an account.
    pub fn lockout_armed(email: &str, lockout_seconds: i64) -> Self {
        Self::new(
            "auth.lockout_armed",
            json!({ "email": email, "lockoutSeconds": lockout_seconds }),
        )
    }

    /// Security event: an account's lockout state was cleared.
    pub fn lockout_cleared(email: &str) -> Self {
        Self::new("auth.lockout_cleared", json!({ "email": email }))
    }
}

/// The transport seam: delivers one event to every client in a room.
///
/// Implemented over the deployment's real-time server (a WebSocket layer in
/// practice) and injected into [`EventFanOut`] explicitly rather than
/// fetched from a process-wide global.
#[async_trait]
pub trait Broadcaster: Send + Sync + 'static {
    async fn broadcast(&self, room: &Room, event: &DomainEvent) -> Result<(), EventError>;
}

/// Fire-and-forget event publisher.
///
/// Cheap to clone; all clones share the attached broadcaster.
#[derive(Clone)]
pub struct EventFanOut {
    broadcaster: Arc<RwLock<Option<Arc<dyn Broadcaster>>>>,
}

impl Default for EventFanOut {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFanOut {
    /// Create a fan-out with no transport attached. Emissions are logged
    /// and dropped until [`attach`](Self::attach) is called.
    pub fn new() -> Self {
        Self {
            broadcaster: Arc::new(RwLock::new(None)),
        }
    }

    /// Attach (or replace) the broadcast transport.
    pub async fn attach(&self, broadcaster: Arc<dyn Broadcaster>) {
        *self.broadcaster.write().await = Some(broadcaster);
    }

    /// Detach the transport, e.g. during shutdown.
    pub async fn detach(&self) {
        *self.broadcaster.write().await = None;
    }

    /// Publish an event to every client in the given project's room.
    pub async fn emit_to_project(&self, project_id: &str, event: DomainEvent) {
        self.emit(&Room::Project(project_id.to_string()), event)
            .await;
    }

    /// Publish an event to every connection of the given user.
    pub async fn emit_to_user(&self, user_id: &str, event: DomainEvent) {
        self.emit(&Room::User(user_id.to_string()), event).await;
    }

    /// Publish an event to a room. Never fails: a missing transport or a
    /// transport error is logged at warning level and swallowed, since
    /// real-time updates are a convenience layer over data that is also
    /// fetchable via request/response.
    pub async fn emit(&self, room: &Room, event: DomainEvent) {
        let broadcaster = self.broadcaster.read().await;
        match broadcaster.as_ref() {
            None => {
                tracing::warn!(
                    event = %event.name,
                    room = %room,
                    "Dropping event: no broadcaster attached"
                );
            }
            Some(b) => {
                if let Err(e) = b.broadcast(room, &event).await {
                    tracing::warn!(
                        event = %event.name,
                        room = %room,
                        error = %e,
                        "Failed to broadcast event"
                    );
                }
            }
        }
    }
}
