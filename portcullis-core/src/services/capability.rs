//! Capability-based authorization for project members.
//!
//! A capability is a named permission atom (e.g. `task.create`) checked
//! independently of role names. Resolution is a pure function over an
//! already-loaded [`ProjectPermission`] record; loading that record, and
//! treating its absence as "forbidden", is the caller's job.
//!
//! The model is flat and boolean: no capability hierarchy, no negative
//! overrides. Custom-role maps and per-permission overrides can only grant
//! beyond the role defaults; anything not explicitly allowed is denied.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Well-known capability names.
pub mod capabilities {
    pub const TASK_CREATE: &str = "task.create";
    pub const TASK_EDIT_ANY: &str = "task.edit_any";
    pub const TASK_DELETE: &str = "task.delete";
    pub const TASK_CHANGE_STATUS: &str = "task.change_status";
    pub const FILE_UPLOAD: &str = "file.upload";
    pub const FILE_DELETE_OWN: &str = "file.delete_own";
    pub const MEMBERS_MANAGE: &str = "members.manage";
    pub const PROJECT_SETTINGS: &str = "project.settings";
    pub const ROLES_MANAGE: &str = "roles.manage";
}

/// Capabilities granted to the fixed `Editor` role.
const EDITOR_CAPABILITIES: &[&str] = &[
    capabilities::TASK_CREATE,
    capabilities::TASK_EDIT_ANY,
    capabilities::TASK_DELETE,
    capabilities::TASK_CHANGE_STATUS,
    capabilities::FILE_UPLOAD,
    capabilities::FILE_DELETE_OWN,
];

/// A member's role within one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectRole {
    /// Full control, every capability allowed.
    Owner,
    /// Day-to-day task and file work, no administration.
    Editor,
    /// Read-only; no capability granted by role.
    Viewer,
    /// Capabilities come entirely from a custom role's grant map.
    Custom,
}

/// A member's resolved permission record for one project.
///
/// This mirrors what the membership storage hands back: the fixed role,
/// the grant map of an attached custom role (if the role is [`Custom`]),
/// and any per-member capability overrides.
///
/// [`Custom`]: ProjectRole::Custom
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPermission {
    pub role: ProjectRole,
    /// Grant map of the attached custom role, `capability name -> granted`.
    #[serde(default)]
    pub custom_capabilities: Option<HashMap<String, bool>>,
    /// Per-member capability overrides. Can only grant, never revoke.
    #[serde(default)]
    pub overrides: HashMap<String, bool>,
}

impl ProjectPermission {
    /// Permission record carrying only a fixed role.
    pub fn from_role(role: ProjectRole) -> Self {
        Self {
            role,
            custom_capabilities: None,
            overrides: HashMap::new(),
        }
    }
}

/// Decide whether `capability` is permitted under `permission`.
///
/// Short-circuit resolution, first match wins:
/// 1. `Owner` always allows.
/// 2. `Editor` allows capabilities in its fixed allow-list, then falls
///    through.
/// 3. A `Custom` role's grant map allows capabilities mapped to `true`.
/// 4. A per-member override explicitly set to `true` allows.
/// 5. Deny.
pub fn is_capability_allowed(permission: &ProjectPermission, capability: &str) -> bool {
    match permission.role {
        ProjectRole::Owner => return true,
        ProjectRole::Editor => {
            if EDITOR_CAPABILITIES.contains(&capability) {
                return true;
            }
        }
        ProjectRole::Custom => {
            if let Some(caps) = &permission.custom_capabilities {
                if caps.get(capability).copied().unwrap_or(false) {
                    return true;
                }
            }
        }
        ProjectRole::Viewer => {}
    }

    permission.overrides.get(capability).copied().unwrap_or(false)
}
