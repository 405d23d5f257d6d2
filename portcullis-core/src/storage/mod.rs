//! Data types held by a lockout store, plus the in-memory default backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod memory;

pub use memory::MemoryLockoutStore;

/// Per-account failure tracking record, keyed by lowercased email.
///
/// Created on the first failed attempt and mutated on each subsequent one.
/// An expired `locked_until` is cleared lazily on check, but
/// `failed_attempts` survives until an explicit reset, so failure counts
/// accumulate across lockout cycles and durations escalate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutEntry {
    /// Consecutive failed attempts since the last successful login.
    pub failed_attempts: u32,
    /// When the current lock expires, if one is armed.
    pub locked_until: Option<DateTime<Utc>>,
    /// Timestamp of the most recent failed attempt. Drives the sweep TTL.
    pub last_attempt: DateTime<Utc>,
}

impl LockoutEntry {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            failed_attempts: 0,
            locked_until: None,
            last_attempt: now,
        }
    }
}

/// Fixed-window failure counter for one source IP, regardless of target
/// account. Reset when the window elapses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpWindowEntry {
    /// Failed attempts recorded inside the current window.
    pub attempts: u32,
    /// When the current window opened.
    pub window_start: DateTime<Utc>,
}

impl IpWindowEntry {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            attempts: 0,
            window_start: now,
        }
    }
}

/// Snapshot of an account's lockout state, as reported to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutStatus {
    /// The (lowercased) email address this status describes.
    pub email: String,
    /// Accumulated failed attempts.
    pub failed_attempts: u32,
    /// Whether a lock is currently active.
    pub is_locked: bool,
    /// When the active lock expires, if `is_locked`.
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutStatus {
    /// Seconds until the active lock expires, suitable for a `Retry-After`
    /// header. `None` when the account is not locked.
    pub fn retry_after_seconds(&self) -> Option<i64> {
        if !self.is_locked {
            return None;
        }
        self.locked_until
            .map(|until| (until - Utc::now()).num_seconds().max(1))
    }
}

/// Counts reported by a store sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Stale account entries removed.
    pub entries_removed: u64,
    /// Stale IP windows removed.
    pub windows_removed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_retry_after_seconds_unlocked() {
        let status = LockoutStatus {
            email: "test@example.com".to_string(),
            failed_attempts: 3,
            is_locked: false,
            locked_until: None,
        };
        assert_eq!(status.retry_after_seconds(), None);
    }

    #[test]
    fn test_retry_after_seconds_locked() {
        let status = LockoutStatus {
            email: "test@example.com".to_string(),
            failed_attempts: 5,
            is_locked: true,
            locked_until: Some(Utc::now() + Duration::minutes(15)),
        };
        let retry_after = status.retry_after_seconds().unwrap();
        assert!(retry_after > 890 && retry_after <= 900);
    }

    #[test]
    fn test_retry_after_seconds_is_at_least_one() {
        // Sub-second remainders still surface as a block.
        let status = LockoutStatus {
            email: "test@example.com".to_string(),
            failed_attempts: 5,
            is_locked: true,
            locked_until: Some(Utc::now() + Duration::milliseconds(200)),
        };
        assert_eq!(status.retry_after_seconds(), Some(1));
    }
}
