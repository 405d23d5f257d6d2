//! # Portcullis
//!
//! Portcullis is the access-guard layer for a collaborative project
//! application: it decides, before a request handler does any real work,
//! whether a login attempt should be rejected outright, whether a member is
//! allowed to perform an operation in a project, and it pushes domain events
//! to the clients that should see them in real time.
//!
//! It deliberately does none of the application's actual work. CRUD
//! handlers, credential verification, permission-record loading, and the
//! WebSocket transport all live elsewhere; portcullis sits at the seams:
//!
//! - **Account lockout guard** — per-account escalating lockouts plus a
//!   per-IP failure window, consulted before credentials are checked.
//! - **Capability resolver** — a pure yes/no answer for a
//!   (member, project, capability) triple.
//! - **Event fan-out** — best-effort broadcast of domain events to
//!   project- and user-scoped rooms.
//!
//! ## Single-process scope
//!
//! The default [`MemoryLockoutStore`] keeps lockout state in process
//! memory. Behind more than one server instance each instance sees only its
//! own counters; back the [`LockoutStore`] trait with a shared external
//! store for multi-instance correctness.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use portcullis::{LoginGate, MemoryLockoutStore, Portcullis};
//!
//! #[tokio::main]
//! async fn main() {
//!     let guard = Portcullis::new(Arc::new(MemoryLockoutStore::new()));
//!     guard.start_sweep();
//!
//!     match guard.check_login("user@example.com", "203.0.113.7").await.unwrap() {
//!         LoginGate::Allowed => { /* verify credentials */ }
//!         LoginGate::AccountLocked { retry_after_seconds }
//!         | LoginGate::IpRateLimited { retry_after_seconds } => {
//!             // respond 429 with Retry-After
//!             let _ = retry_after_seconds;
//!         }
//!     }
//! }
//! ```

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Re-export core types from portcullis_core
///
/// These types are commonly used when working with the Portcullis API.
pub use portcullis_core::{
    Broadcaster, DomainEvent, EventFanOut, IpWindowEntry, LockoutConfig, LockoutEntry,
    LockoutService, LockoutStatus, LockoutStore, MemoryLockoutStore, ProjectPermission,
    ProjectRole, Room, SweepOutcome, capabilities, is_capability_allowed,
};

/// Errors that can occur when using Portcullis.
#[derive(Debug, thiserror::Error)]
pub enum PortcullisError {
    /// Error when interacting with the lockout store
    #[error("Storage error: {0}")]
    StorageError(String),
    /// Error in the event layer
    #[error("Event error: {0}")]
    EventError(String),
}

impl From<portcullis_core::Error> for PortcullisError {
    fn from(err: portcullis_core::Error) -> Self {
        match err {
            portcullis_core::Error::Event(e) => PortcullisError::EventError(e.to_string()),
            other => PortcullisError::StorageError(other.to_string()),
        }
    }
}

/// Verdict for a login attempt, checked before credential verification.
///
/// The IP window is consulted first, then the account lock, matching the
/// order the authentication flow applies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginGate {
    /// Proceed to credential verification.
    Allowed,
    /// The source IP exhausted its failure window.
    IpRateLimited { retry_after_seconds: i64 },
    /// The account is locked.
    AccountLocked { retry_after_seconds: i64 },
}

/// The wired-up guard: lockout service, event fan-out, and the sweep
/// lifecycle, behind one handle.
pub struct Portcullis<S: LockoutStore> {
    lockout: LockoutService<S>,
    fan_out: EventFanOut,
    shutdown_tx: watch::Sender<bool>,
    sweep_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<S: LockoutStore> Portcullis<S> {
    /// Create a guard over the given store with the default lockout policy.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, LockoutConfig::default())
    }

    /// Create a guard with a custom lockout policy.
    pub fn with_config(store: Arc<S>, config: LockoutConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            lockout: LockoutService::new(store, config),
            fan_out: EventFanOut::new(),
            shutdown_tx,
            sweep_handle: Mutex::new(None),
        }
    }

    /// The underlying lockout service.
    pub fn lockout(&self) -> &LockoutService<S> {
        &self.lockout
    }

    /// The event fan-out, for services that publish domain events.
    pub fn fan_out(&self) -> &EventFanOut {
        &self.fan_out
    }

    /// Attach the real-time transport. Until this is called, emitted events
    /// are logged and dropped.
    pub async fn attach_broadcaster(&self, broadcaster: Arc<dyn Broadcaster>) {
        self.fan_out.attach(broadcaster).await;
    }

    /// Gate a login attempt before touching credentials.
    pub async fn check_login(&self, email: &str, ip: &str) -> Result<LoginGate, PortcullisError> {
        if let Some(retry_after_seconds) = self.lockout.check_ip_rate_limit(ip).await? {
            return Ok(LoginGate::IpRateLimited {
                retry_after_seconds,
            });
        }
        if let Some(retry_after_seconds) = self.lockout.check_lockout(email).await? {
            return Ok(LoginGate::AccountLocked {
                retry_after_seconds,
            });
        }
        Ok(LoginGate::Allowed)
    }

    /// Record a failed login against both the account and the source IP.
    ///
    /// Returns the lockout length in seconds when this failure armed a new
    /// lock. When it did, an `auth.lockout_armed` event is published to the
    /// account's user room.
    pub async fn record_failed_login(
        &self,
        email: &str,
        ip: &str,
    ) -> Result<Option<i64>, PortcullisError> {
        self.lockout.record_ip_failed_attempt(ip).await?;
        let armed = self.lockout.record_failed_attempt(email).await?;

        if let Some(lockout_seconds) = armed {
            self.fan_out
                .emit(
                    &Room::User(email.to_lowercase()),
                    DomainEvent::lockout_armed(email, lockout_seconds),
                )
                .await;
        }

        Ok(armed)
    }

    /// Record a successful login: clears the account's tracking state and
    /// publishes `auth.lockout_cleared` to its user room.
    pub async fn record_successful_login(&self, email: &str) -> Result<(), PortcullisError> {
        self.lockout.reset_lockout(email).await?;
        self.fan_out
            .emit(
                &Room::User(email.to_lowercase()),
                DomainEvent::lockout_cleared(email),
            )
            .await;
        Ok(())
    }

    /// Current lockout status report for an account.
    pub async fn lockout_status(&self, email: &str) -> Result<LockoutStatus, PortcullisError> {
        Ok(self.lockout.lockout_status(email).await?)
    }

    /// Decide whether a member may perform `capability` under `permission`.
    ///
    /// Pure delegation to the capability resolver; loading the permission
    /// record (and treating its absence as forbidden) is the caller's job.
    pub fn authorize(&self, permission: &ProjectPermission, capability: &str) -> bool {
        is_capability_allowed(permission, capability)
    }

    /// Start the background sweep that purges stale tracking entries.
    /// Calling it again replaces a finished task; an already-running sweep
    /// is left alone.
    pub fn start_sweep(&self) {
        let mut handle = self.sweep_handle.lock().unwrap();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        *handle = Some(self.lockout.start_sweep_task(self.shutdown_tx.subscribe()));
    }

    /// Signal the sweep task to stop and wait for it to finish.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.sweep_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Sweep task did not shut down cleanly");
            }
        }
        self.fan_out.detach().await;
    }
}
