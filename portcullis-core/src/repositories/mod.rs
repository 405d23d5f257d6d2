//! Repository traits for the guard's data access layer.
//!
//! Services talk to storage only through these traits, so a deployment can
//! swap the in-process maps for a shared backend without touching policy
//! code.

pub mod lockout;

pub use lockout::LockoutStore;
