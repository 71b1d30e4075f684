// src/permissions.rs

//! Build-server permissions derived from TeamForge project roles
//!
//! A fixed catalogue of project roles maps onto build permissions. A user
//! holds the union of the permissions of every catalogue role they have in a
//! project. Roles outside the catalogue grant nothing.
//!
//! [`PermissionCache`] remembers each user's set per project for a limited
//! time, so an authorization check does not cost a role listing every time.

use crate::error::{Error, Result};
use crate::rbac::Roles;
use crate::session::Session;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Something a build-server user may be allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    Read,
    Build,
    Cancel,
    Workspace,
    Tag,
    Configure,
    Delete,
    Promote,
}

impl Permission {
    pub const ALL: [Permission; 8] = [
        Permission::Read,
        Permission::Build,
        Permission::Cancel,
        Permission::Workspace,
        Permission::Tag,
        Permission::Configure,
        Permission::Delete,
        Permission::Promote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Build => "build",
            Permission::Cancel => "cancel",
            Permission::Workspace => "workspace",
            Permission::Tag => "tag",
            Permission::Configure => "configure",
            Permission::Delete => "delete",
            Permission::Promote => "promote",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| Error::ParseError(format!("Unknown permission '{}'", s)))
    }
}

/// A project role the build server knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogueRole {
    pub title: &'static str,
    pub description: &'static str,
    pub permissions: &'static [Permission],
}

impl CatalogueRole {
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Catalogue roles, in the order they are created and offered
pub static CATALOGUE: [CatalogueRole; 5] = [
    CatalogueRole {
        title: "Hudson Read",
        description: "Allows users read-access to Hudson jobs.",
        permissions: &[Permission::Read],
    },
    CatalogueRole {
        title: "Hudson Build/Cancel",
        description: "Allow users to start a new build, or to cancel a build.",
        permissions: &[Permission::Build, Permission::Cancel, Permission::Workspace, Permission::Tag],
    },
    CatalogueRole {
        title: "Hudson Configure",
        description: "Allow users to configure a build.",
        permissions: &[Permission::Configure],
    },
    CatalogueRole {
        title: "Hudson Delete",
        description: "Allow users to delete builds.",
        permissions: &[Permission::Delete],
    },
    CatalogueRole {
        title: "Hudson Promote",
        description: "Allow users to promote builds.",
        permissions: &[Permission::Promote],
    },
];

/// Roles granted to every project member by default
pub const DEFAULT_MEMBER_ROLES: [&str; 1] = ["Hudson Read"];

/// Catalogue entry titled exactly `title`
pub fn catalogue_role(title: &str) -> Option<&'static CatalogueRole> {
    CATALOGUE.iter().find(|role| role.title == title)
}

/// Union of the permissions granted by the given role titles
pub fn permissions_for<S: AsRef<str>>(user_roles: &[S]) -> BTreeSet<Permission> {
    user_roles
        .iter()
        .filter_map(|title| catalogue_role(title.as_ref()))
        .flat_map(|role| role.permissions.iter().copied())
        .collect()
}

/// First catalogue role that grants `permission`
pub fn granting_role(permission: Permission) -> Option<&'static CatalogueRole> {
    CATALOGUE.iter().find(|role| role.grants(permission))
}

#[derive(Debug, Clone)]
struct CacheEntry {
    created_at: Instant,
    permissions: BTreeSet<Permission>,
}

/// Per-project, per-user permission sets with a time-to-live
///
/// Empty sets are never cached, so a user who has just been granted a role
/// is picked up on the next check.
#[derive(Debug)]
pub struct PermissionCache {
    entries: Mutex<HashMap<(String, String), CacheEntry>>,
    ttl: Duration,
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn cached(&self, key: &(String, String)) -> Option<BTreeSet<Permission>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let fresh = entries
            .get(key)
            .filter(|entry| entry.created_at.elapsed() < self.ttl)
            .map(|entry| entry.permissions.clone());
        if fresh.is_none() {
            entries.remove(key);
        }
        fresh
    }

    /// Permissions `username` holds in a project
    ///
    /// A failed role lookup is returned as an error, never as an empty set.
    pub fn permissions(&self, session: &Session, project_id: &str, username: &str) -> Result<BTreeSet<Permission>> {
        let key = (project_id.to_string(), username.to_string());
        if let Some(permissions) = self.cached(&key) {
            return Ok(permissions);
        }

        let roles = Roles::new(session).user_roles(project_id, username)?;
        let permissions = permissions_for(&roles);
        debug!("{} in {}: roles {:?} grant {:?}", username, project_id, roles, permissions);

        if !permissions.is_empty() {
            self.entries.lock().unwrap_or_else(|e| e.into_inner()).insert(
                key,
                CacheEntry {
                    created_at: Instant::now(),
                    permissions: permissions.clone(),
                },
            );
        }
        Ok(permissions)
    }

    pub fn has_permission(
        &self,
        session: &Session,
        project_id: &str,
        username: &str,
        permission: Permission,
    ) -> Result<bool> {
        Ok(self.permissions(session, project_id, username)?.contains(&permission))
    }

    pub fn invalidate(&self, project_id: &str, username: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(project_id.to_string(), username.to_string()));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PermissionCache {
    /// Five minute time-to-live
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}
