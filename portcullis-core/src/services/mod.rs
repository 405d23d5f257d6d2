//! Service layer for guard logic
//!
//! This module contains the concrete services that make access decisions:
//! the account lockout guard and the capability resolver.

pub mod capability;
pub mod lockout;

pub use capability::{ProjectPermission, ProjectRole, capabilities, is_capability_allowed};
pub use lockout::LockoutService;
