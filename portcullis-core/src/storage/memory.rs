//! In-process lockout store backed by concurrent maps.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::{
    Error,
    repositories::LockoutStore,
    storage::{IpWindowEntry, LockoutEntry, SweepOutcome},
};

/// Default [`LockoutStore`] keeping both maps in process memory.
///
/// All operations are bounded map lookups with no I/O, so none of them can
/// fail. State does not survive a restart, and each server instance sees
/// only its own counters.
#[derive(Debug, Default)]
pub struct MemoryLockoutStore {
    entries: DashMap<String, LockoutEntry>,
    ip_windows: DashMap<String, IpWindowEntry>,
}

impl MemoryLockoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked account entries. Used by tests and diagnostics.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of tracked IP windows. Used by tests and diagnostics.
    pub fn window_count(&self) -> usize {
        self.ip_windows.len()
    }
}

#[async_trait]
impl LockoutStore for MemoryLockoutStore {
    async fn get_entry(&self, email: &str) -> Result<Option<LockoutEntry>, Error> {
        Ok(self.entries.get(email).map(|e| e.clone()))
    }

    async fn put_entry(&self, email: &str, entry: LockoutEntry) -> Result<(), Error> {
        self.entries.insert(email.to_string(), entry);
        Ok(())
    }

    async fn record_failure(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<LockoutEntry, Error> {
        // The entry guard holds the shard lock for the whole mutation, so
        // concurrent failures for one account never lose increments.
        let mut entry = self
            .entries
            .entry(email.to_string())
            .or_insert_with(|| LockoutEntry::new(now));
        entry.failed_attempts += 1;
        entry.last_attempt = now;
        Ok(entry.clone())
    }

    async fn arm_lock(&self, email: &str, locked_until: DateTime<Utc>) -> Result<(), Error> {
        if let Some(mut entry) = self.entries.get_mut(email) {
            entry.locked_until = Some(locked_until);
        }
        Ok(())
    }

    async fn clear_lock(&self, email: &str) -> Result<(), Error> {
        if let Some(mut entry) = self.entries.get_mut(email) {
            entry.locked_until = None;
        }
        Ok(())
    }

    async fn delete_entry(&self, email: &str) -> Result<(), Error> {
        self.entries.remove(email);
        Ok(())
    }

    async fn get_ip_window(&self, ip: &str) -> Result<Option<IpWindowEntry>, Error> {
        Ok(self.ip_windows.get(ip).map(|w| w.clone()))
    }

    async fn put_ip_window(&self, ip: &str, window: IpWindowEntry) -> Result<(), Error> {
        self.ip_windows.insert(ip.to_string(), window);
        Ok(())
    }

    async fn record_ip_failure(
        &self,
        ip: &str,
        now: DateTime<Utc>,
        window_length: Duration,
    ) -> Result<IpWindowEntry, Error> {
        let mut window = self
            .ip_windows
            .entry(ip.to_string())
            .or_insert_with(|| IpWindowEntry::new(now));
        if now - window.window_start >= window_length {
            *window = IpWindowEntry::new(now);
        }
        window.attempts += 1;
        Ok(window.clone())
    }

    async fn delete_ip_window(&self, ip: &str) -> Result<(), Error> {
        self.ip_windows.remove(ip);
        Ok(())
    }

    async fn sweep(&self, older_than: DateTime<Utc>) -> Result<SweepOutcome, Error> {
        let entries_before = self.entries.len();
        self.entries.retain(|_, e| e.last_attempt >= older_than);
        let windows_before = self.ip_windows.len();
        self.ip_windows.retain(|_, w| w.window_start >= older_than);

        Ok(SweepOutcome {
            entries_removed: (entries_before - self.entries.len()) as u64,
            windows_removed: (windows_before - self.ip_windows.len()) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_entry_round_trip() {
        let store = MemoryLockoutStore::new();
        let now = Utc::now();

        assert!(store.get_entry("a@example.com").await.unwrap().is_none());

        let mut entry = LockoutEntry::new(now);
        entry.failed_attempts = 3;
        store.put_entry("a@example.com", entry).await.unwrap();

        let fetched = store.get_entry("a@example.com").await.unwrap().unwrap();
        assert_eq!(fetched.failed_attempts, 3);
        assert!(fetched.locked_until.is_none());

        store.delete_entry("a@example.com").await.unwrap();
        assert!(store.get_entry("a@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_failure_creates_and_increments() {
        let store = MemoryLockoutStore::new();
        let now = Utc::now();

        let first = store.record_failure("a@example.com", now).await.unwrap();
        assert_eq!(first.failed_attempts, 1);

        let later = now + Duration::seconds(5);
        let second = store.record_failure("a@example.com", later).await.unwrap();
        assert_eq!(second.failed_attempts, 2);
        assert_eq!(second.last_attempt, later);
    }

    #[tokio::test]
    async fn test_arm_and_clear_lock_leave_counter_alone() {
        let store = MemoryLockoutStore::new();
        let now = Utc::now();
        store.record_failure("a@example.com", now).await.unwrap();

        let until = now + Duration::minutes(15);
        store.arm_lock("a@example.com", until).await.unwrap();
        let entry = store.get_entry("a@example.com").await.unwrap().unwrap();
        assert_eq!(entry.locked_until, Some(until));
        assert_eq!(entry.failed_attempts, 1);

        store.clear_lock("a@example.com").await.unwrap();
        let entry = store.get_entry("a@example.com").await.unwrap().unwrap();
        assert!(entry.locked_until.is_none());
        assert_eq!(entry.failed_attempts, 1);

        // Both are no-ops for unknown emails.
        store.arm_lock("missing@example.com", until).await.unwrap();
        store.clear_lock("missing@example.com").await.unwrap();
        assert!(store.get_entry("missing@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_ip_failure_restarts_elapsed_window() {
        let store = MemoryLockoutStore::new();
        let now = Utc::now();
        let window_length = Duration::minutes(15);

        let first = store
            .record_ip_failure("10.0.0.5", now, window_length)
            .await
            .unwrap();
        assert_eq!(first.attempts, 1);

        let inside = store
            .record_ip_failure("10.0.0.5", now + Duration::minutes(5), window_length)
            .await
            .unwrap();
        assert_eq!(inside.attempts, 2);
        assert_eq!(inside.window_start, now);

        let restarted = store
            .record_ip_failure("10.0.0.5", now + Duration::minutes(20), window_length)
            .await
            .unwrap();
        assert_eq!(restarted.attempts, 1);
        assert_eq!(restarted.window_start, now + Duration::minutes(20));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_an_error() {
        let store = MemoryLockoutStore::new();
        store.delete_entry("missing@example.com").await.unwrap();
        store.delete_ip_window("203.0.113.9").await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_removes_only_stale_records() {
        let store = MemoryLockoutStore::new();
        let now = Utc::now();

        store
            .put_entry("stale@example.com", LockoutEntry::new(now - Duration::hours(3)))
            .await
            .unwrap();
        store
            .put_entry("fresh@example.com", LockoutEntry::new(now))
            .await
            .unwrap();
        store
            .put_ip_window("198.51.100.1", IpWindowEntry::new(now - Duration::hours(3)))
            .await
            .unwrap();
        store
            .put_ip_window("198.51.100.2", IpWindowEntry::new(now))
            .await
            .unwrap();

        let outcome = store.sweep(now - Duration::hours(2)).await.unwrap();
        assert_eq!(outcome.entries_removed, 1);
        assert_eq!(outcome.windows_removed, 1);

        assert!(store.get_entry("stale@example.com").await.unwrap().is_none());
        assert!(store.get_entry("fresh@example.com").await.unwrap().is_some());
        assert!(store.get_ip_window("198.51.100.1").await.unwrap().is_none());
        assert!(store.get_ip_window("198.51.100.2").await.unwrap().is_some());
    }
}
