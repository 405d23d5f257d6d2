//! Core functionality for the portcullis project
//!
//! Portcullis provides the access-guard services a collaborative project
//! application needs in front of its request handlers: an account lockout
//! guard with per-IP rate limiting, a capability-based authorization
//! resolver, and a best-effort real-time event fan-out.
//!
//! The three services are independent; they share only the error types and
//! the store abstraction defined here. See [`LockoutService`] for the
//! lockout guard, [`services::capability`] for authorization, and
//! [`EventFanOut`] for event publishing.

pub mod config;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;
pub mod storage;

pub use config::LockoutConfig;
pub use error::Error;
pub use events::{Broadcaster, DomainEvent, EventFanOut, Room};
pub use repositories::LockoutStore;
pub use services::{
    LockoutService, ProjectPermission, ProjectRole, capabilities, is_capability_allowed,
};
pub use storage::{IpWindowEntry, LockoutEntry, LockoutStatus, MemoryLockoutStore, SweepOutcome};
