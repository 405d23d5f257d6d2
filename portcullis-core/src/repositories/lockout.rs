//! Store trait for lockout and rate-limit tracking state.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{
    Error,
    storage::{IpWindowEntry, LockoutEntry, SweepOutcome},
};

/// Storage for per-account lockout entries and per-IP failure windows.
///
/// The default implementation is [`MemoryLockoutStore`], which keeps both
/// maps in process memory: state is lost on restart, and horizontally scaled
/// deployments see inconsistent per-instance state. Correct multi-instance
/// behavior requires backing this trait with a shared external store; that
/// is a deployment concern, not a policy one.
///
/// Keys are caller-normalized: emails are lowercased before reaching the
/// store.
///
/// [`MemoryLockoutStore`]: crate::storage::MemoryLockoutStore
#[async_trait]
pub trait LockoutStore: Send + Sync + 'static {
    /// Fetch the lockout entry for an email, if one exists.
    async fn get_entry(&self, email: &str) -> Result<Option<LockoutEntry>, Error>;

    /// Insert or replace the lockout entry for an email.
    async fn put_entry(&self, email: &str, entry: LockoutEntry) -> Result<(), Error>;

    /// Record one failed attempt: create the entry if missing, increment
    /// its counter, stamp `last_attempt`, and return the updated entry.
    ///
    /// The whole read-modify-write must be atomic with respect to other
    /// callers of this method, so concurrent failures for one account never
    /// lose increments.
    async fn record_failure(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<LockoutEntry, Error>;

    /// Set `locked_until` on an existing entry without touching its
    /// counter. A missing entry is a no-op.
    async fn arm_lock(&self, email: &str, locked_until: DateTime<Utc>) -> Result<(), Error>;

    /// Clear `locked_until` on an existing entry, leaving the counter
    /// intact. A missing entry is a no-op.
    async fn clear_lock(&self, email: &str) -> Result<(), Error>;

    /// Remove the lockout entry for an email. Removing a missing entry is
    /// not an error.
    async fn delete_entry(&self, email: &str) -> Result<(), Error>;

    /// Fetch the failure window for a source IP, if one exists.
    async fn get_ip_window(&self, ip: &str) -> Result<Option<IpWindowEntry>, Error>;

    /// Insert or replace the failure window for a source IP.
    async fn put_ip_window(&self, ip: &str, window: IpWindowEntry) -> Result<(), Error>;

    /// Record one failed attempt from a source IP: start a fresh window if
    /// none exists or the current one is older than `window_length`,
    /// increment the counter, and return the updated window.
    ///
    /// Atomic with respect to other callers, like [`record_failure`].
    ///
    /// [`record_failure`]: Self::record_failure
    async fn record_ip_failure(
        &self,
        ip: &str,
        now: DateTime<Utc>,
        window_length: Duration,
    ) -> Result<IpWindowEntry, Error>;

    /// Remove the failure window for a source IP. Removing a missing window
    /// is not an error.
    async fn delete_ip_window(&self, ip: &str) -> Result<(), Error>;

    /// Purge entries whose `last_attempt` / `window_start` is older than
    /// `older_than`, from both maps, and report how many were removed.
    async fn sweep(&self, older_than: DateTime<Utc>) -> Result<SweepOutcome, Error>;
}
