//! Configuration for the lockout guard.

use chrono::Duration;

/// Configuration for account lockout and per-IP rate limiting.
///
/// The defaults implement the standard policy: a lock is armed at every 5th
/// consecutive failure with escalating durations (15, 30, then 60 minutes),
/// and an IP is throttled after 20 failures inside a 15-minute window.
#[derive(Debug, Clone)]
pub struct LockoutConfig {
    /// Whether protection is active. When `false`, every check returns
    /// "not blocked" and recording is a no-op.
    pub enabled: bool,

    /// A lock is (re)armed only when the failure count is an exact multiple
    /// of this step. Intermediate counts never arm a new lock, even after a
    /// previous lock has expired. A step of 0 disables arming entirely.
    pub arming_step: u32,

    /// Escalation table as `(minimum_failures, lockout_duration)` pairs,
    /// ordered highest threshold first. The first threshold the failure
    /// count meets determines the duration.
    pub escalation: Vec<(u32, Duration)>,

    /// Length of the fixed per-IP failure window.
    pub ip_window: Duration,

    /// Failures within one window before an IP is throttled.
    pub ip_max_attempts: u32,

    /// How often the background sweep runs.
    pub sweep_interval: Duration,

    /// Entries untouched for longer than this are purged by the sweep.
    pub entry_ttl: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            arming_step: 5,
            escalation: vec![
                (15, Duration::minutes(60)),
                (10, Duration::minutes(30)),
                (5, Duration::minutes(15)),
            ],
            ip_window: Duration::minutes(15),
            ip_max_attempts: 20,
            sweep_interval: Duration::minutes(10),
            entry_ttl: Duration::hours(2),
        }
    }
}

impl LockoutConfig {
    /// Configuration with protection switched off entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Lockout duration for a given failure count: the highest escalation
    /// threshold met so far, or `None` below the lowest threshold.
    pub fn lockout_duration(&self, failed_attempts: u32) -> Option<Duration> {
        self.escalation
            .iter()
            .find(|(threshold, _)| failed_attempts >= *threshold)
            .map(|(_, duration)| *duration)
    }
}
