//! Account lockout guard with per-IP rate limiting.
//!
//! Tracks failed login attempts per account and per source IP, arming
//! escalating lockouts at fixed failure thresholds. Callers consult the
//! guard before touching credentials and record the outcome afterwards; a
//! `Some(seconds)` answer from a check means the attempt should be rejected
//! (typically as HTTP 429) without verifying anything.
//!
//! # Example
//!
//! ```rust,ignore
//! use portcullis_core::{LockoutConfig, LockoutService, MemoryLockoutStore};
//!
//! let service = LockoutService::new(
//!     Arc::new(MemoryLockoutStore::new()),
//!     LockoutConfig::default(),
//! );
//!
//! if let Some(seconds) = service.check_lockout("user@example.com").await? {
//!     // Account is locked; reject before credential verification.
//! }
//!
//! // After a failed password check:
//! service.record_failed_attempt("user@example.com").await?;
//! ```

use std::sync::Arc;

use chrono::Utc;

use crate::{Error, LockoutConfig, repositories::LockoutStore, storage::LockoutStatus};

/// Service deciding whether login attempts should be rejected, and recording
/// their outcomes.
///
/// # Thread Safety
///
/// The service is thread-safe and can be shared across tasks; concurrent
/// access is handled by the underlying store.
///
/// # Lockout policy
///
/// Failure counts accumulate until an explicit reset. A lock is (re)armed
/// only when the count reaches an exact multiple of the arming step
/// (5/10/15/...); intermediate counts never arm a new lock, even after a
/// previous lock has expired. The lock duration is the highest escalation
/// threshold met so far, so repeat offenders are locked out for longer.
pub struct LockoutService<S: LockoutStore> {
    store: Arc<S>,
    config: LockoutConfig,
}

impl<S: LockoutStore> LockoutService<S> {
    /// Create a new lockout service over the given store.
    pub fn new(store: Arc<S>, config: LockoutConfig) -> Self {
        Self { store, config }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    /// Check if lockout protection is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Check whether an account is currently locked.
    ///
    /// Returns `Some(remaining_seconds)` while a lock is active. An expired
    /// lock is cleared in place, but the failure counter survives so that
    /// further failures keep escalating. Unknown emails return `None`.
    pub async fn check_lockout(&self, email: &str) -> Result<Option<i64>, Error> {
        if !self.config.enabled {
            return Ok(None);
        }

        let email = normalize_email(email);
        let Some(entry) = self.store.get_entry(&email).await? else {
            return Ok(None);
        };

        if let Some(until) = entry.locked_until {
            let now = Utc::now();
            if until > now {
                return Ok(Some((until - now).num_seconds().max(1)));
            }
            // Lock expired: clear it, keep the counter.
            self.store.clear_lock(&email).await?;
        }

        Ok(None)
    }

    /// Record a failed login attempt for an account.
    ///
    /// Returns `Some(lockout_seconds)` only when this attempt armed a new
    /// lock, i.e. when the updated failure count is an exact multiple of the
    /// arming step. Counts between multiples return `None` even though the
    /// account may still be locked from the previous trigger.
    pub async fn record_failed_attempt(&self, email: &str) -> Result<Option<i64>, Error> {
        if !self.config.enabled {
            return Ok(None);
        }

        let email = normalize_email(email);
        let now = Utc::now();
        // The increment happens store-side so concurrent failures for one
        // account cannot lose counts.
        let entry = self.store.record_failure(&email, now).await?;

        // An arming step of 0 means locks are never armed.
        let on_arming_step = self.config.arming_step > 0
            && entry.failed_attempts % self.config.arming_step == 0;
        let armed = if on_arming_step {
            self.config.lockout_duration(entry.failed_attempts)
        } else {
            None
        };

        if let Some(duration) = armed {
            self.store.arm_lock(&email, now + duration).await?;
            tracing::warn!(
                email = %email,
                failed_attempts = entry.failed_attempts,
                lockout_seconds = duration.num_seconds(),
                "Account locked after repeated failed login attempts"
            );
        }

        Ok(armed.map(|d| d.num_seconds()))
    }

    /// Clear all tracking state for an account on successful login.
    pub async fn reset_lockout(&self, email: &str) -> Result<(), Error> {
        let email = normalize_email(email);
        self.store.delete_entry(&email).await
    }

    /// Check if an account is currently locked (convenience method).
    pub async fn is_locked(&self, email: &str) -> Result<bool, Error> {
        Ok(self.check_lockout(email).await?.is_some())
    }

    /// Unlock an account regardless of its state (e.g. after password reset).
    ///
    /// Returns `true` if a lock was active at the time.
    pub async fn unlock(&self, email: &str) -> Result<bool, Error> {
        let was_locked = self.is_locked(email).await?;
        self.reset_lockout(email).await?;
        Ok(was_locked)
    }

    /// Full lockout status report for an account.
    pub async fn lockout_status(&self, email: &str) -> Result<LockoutStatus, Error> {
        let email = normalize_email(email);
        let entry = self.store.get_entry(&email).await?;
        let now = Utc::now();

        let (failed_attempts, locked_until) = match entry {
            Some(e) => (e.failed_attempts, e.locked_until),
            None => (0, None),
        };
        let is_locked = self.config.enabled && locked_until.is_some_and(|until| until > now);

        Ok(LockoutStatus {
            email,
            failed_attempts,
            is_locked,
            locked_until: if is_locked { locked_until } else { None },
        })
    }

    /// Check whether a source IP is currently throttled.
    ///
    /// Returns `Some(seconds_until_window_reset)` once the IP has reached
    /// the per-window failure budget. Expired windows are deleted lazily
    /// here rather than waiting for the sweep.
    pub async fn check_ip_rate_limit(&self, ip: &str) -> Result<Option<i64>, Error> {
        if !self.config.enabled {
            return Ok(None);
        }

        let Some(window) = self.store.get_ip_window(ip).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        let window_end = window.window_start + self.config.ip_window;
        if now >= window_end {
            self.store.delete_ip_window(ip).await?;
            return Ok(None);
        }

        if window.attempts >= self.config.ip_max_attempts {
            return Ok(Some((window_end - now).num_seconds().max(1)));
        }

        Ok(None)
    }

    /// Record a failed login attempt from a source IP, regardless of which
    /// account it targeted.
    pub async fn record_ip_failed_attempt(&self, ip: &str) -> Result<(), Error> {
        if !self.config.enabled {
            return Ok(());
        }

        let now = Utc::now();
        let window = self
            .store
            .record_ip_failure(ip, now, self.config.ip_window)
            .await?;

        if window.attempts == self.config.ip_max_attempts {
            tracing::warn!(
                ip = %ip,
                attempts = window.attempts,
                "IP reached failed login attempt limit"
            );
        }

        Ok(())
    }

    /// Start the background sweep task.
    ///
    /// The task periodically purges entries from both maps whose last
    /// activity is older than the configured TTL, bounding memory growth.
    /// It stops when the `shutdown` channel signals.
    pub fn start_sweep_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let ttl = self.config.entry_ttl;
        let interval = self
            .config
            .sweep_interval
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(600));

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so the sweep runs on
            // the configured cadence after startup.
            interval_timer.tick().await;

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let older_than = Utc::now() - ttl;
                        match store.sweep(older_than).await {
                            Ok(outcome) if outcome.entries_removed > 0 || outcome.windows_removed > 0 => {
                                tracing::info!(
                                    entries = outcome.entries_removed,
                                    windows = outcome.windows_removed,
                                    "Swept stale lockout tracking records"
                                );
                            }
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    "Failed to sweep lockout tracking records"
                                );
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down lockout sweep task");
                        break;
                    }
                }
            }
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
