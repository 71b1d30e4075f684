// src/resolve.rs

//! Title-to-id resolution
//!
//! TeamForge has no lookup-by-name call for most entities. Resolution lists
//! the children of a scope (one remote call, no paging) and scans for an exact,
//! case-sensitive title match. Sibling titles are not unique on the server;
//! the first match in the order the server returned wins, and nothing is
//! reported about duplicates. Server order is not assumed to be stable between
//! calls.
//!
//! An empty title resolves to `None` without contacting the server. A failed
//! listing is an error ([`Error::RemoteLookup`](crate::Error::RemoteLookup)),
//! never `None`.

use crate::error::Result;
use crate::model::{ArtifactRow, DocumentRow, ReleaseFileRow, ScopedEntity};
use crate::session::{Session, Subsystem};
use serde_json::Value;
use tracing::debug;

/// Rows that can be matched by title
pub trait Titled {
    fn id(&self) -> &str;
    fn title(&self) -> &str;
}

macro_rules! impl_titled {
    ($($ty:ty),*) => {
        $(impl Titled for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn title(&self) -> &str {
                &self.title
            }
        })*
    };
}

impl_titled!(ScopedEntity, ArtifactRow, DocumentRow, ReleaseFileRow);

/// First row whose title equals `title`, in list order
pub fn first_match<T: Titled>(rows: impl IntoIterator<Item = T>, title: &str) -> Option<T> {
    rows.into_iter().find(|row| row.title() == title)
}

/// Row with the greatest key; ties keep the earliest row
///
/// Rows without a key rank below every row that has one.
pub fn latest_by<T, K, F>(rows: impl IntoIterator<Item = T>, key: F) -> Option<T>
where
    K: Ord,
    F: Fn(&T) -> Option<K>,
{
    let mut best: Option<T> = None;
    for row in rows {
        let newer = match &best {
            None => true,
            Some(current) => key(&row) > key(current),
        };
        if newer {
            best = Some(row);
        }
    }
    best
}

/// Maps a title within a scope to a server id
///
/// Callers depend on this trait rather than on the list-and-scan strategy, so
/// an indexed lookup can replace it without touching them.
pub trait Resolver {
    /// Entity kind, for logging
    fn kind(&self) -> &str;

    /// Resolve a title to the matching entity
    fn resolve_entity(&self, session: &Session, scope_id: &str, title: &str) -> Result<Option<ScopedEntity>>;

    /// Resolve a title to the matching id
    fn resolve_id(&self, session: &Session, scope_id: &str, title: &str) -> Result<Option<String>> {
        Ok(self.resolve_entity(session, scope_id, title)?.map(|e| e.id))
    }
}

/// List-and-scan resolver over one listing operation
#[derive(Debug, Clone, Copy)]
pub struct TitleResolver {
    kind: &'static str,
    subsystem: Subsystem,
    operation: &'static str,
    /// Whether the listing takes the scope id as its argument
    scoped: bool,
}

impl TitleResolver {
    /// Projects visible to the session user (the scope is the server)
    pub const PROJECT: Self = Self::server_wide("project", Subsystem::CollabNet, "getProjectList");
    /// Packages of a project
    pub const PACKAGE: Self = Self::scoped("package", Subsystem::Frs, "getPackageList");
    /// Releases of a package
    pub const RELEASE: Self = Self::scoped("release", Subsystem::Frs, "getReleaseList");
    /// Trackers of a project
    pub const TRACKER: Self = Self::scoped("tracker", Subsystem::Tracker, "getTrackerList");
    /// Roles of a project
    pub const ROLE: Self = Self::scoped("role", Subsystem::Rbac, "getRoleList");
    /// Child folders of a document folder (or root folders of a project)
    pub const FOLDER: Self = Self::scoped("document folder", Subsystem::Document, "getDocumentFolderList");

    pub const fn scoped(kind: &'static str, subsystem: Subsystem, operation: &'static str) -> Self {
        Self {
            kind,
            subsystem,
            operation,
            scoped: true,
        }
    }

    pub const fn server_wide(kind: &'static str, subsystem: Subsystem, operation: &'static str) -> Self {
        Self {
            kind,
            subsystem,
            operation,
            scoped: false,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// List every child of the scope, in server order
    pub fn list(&self, session: &Session, scope_id: &str) -> Result<Vec<ScopedEntity>> {
        let args = if self.scoped {
            vec![Value::String(scope_id.to_string())]
        } else {
            Vec::new()
        };

        let mut rows: Vec<ScopedEntity> = session.lookup_rows(self.subsystem, self.operation, args)?;
        for row in rows.iter_mut().filter(|r| r.parent_id.is_empty()) {
            row.parent_id = scope_id.to_string();
        }
        Ok(rows)
    }

    /// Titles of every child of the scope, in server order
    pub fn titles(&self, session: &Session, scope_id: &str) -> Result<Vec<String>> {
        Ok(self.list(session, scope_id)?.into_iter().map(|e| e.title).collect())
    }
}

impl Resolver for TitleResolver {
    fn kind(&self) -> &str {
        self.kind
    }

    fn resolve_entity(&self, session: &Session, scope_id: &str, title: &str) -> Result<Option<ScopedEntity>> {
        session.validate()?;
        if title.is_empty() {
            debug!("Empty {} title, not resolving", self.kind);
            return Ok(None);
        }

        let found = first_match(self.list(session, scope_id)?, title);
        match &found {
            Some(entity) => debug!("Resolved {} '{}' to {}", self.kind, title, entity.id),
            None => debug!("No {} titled '{}' in {}", self.kind, title, scope_id),
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, title: &str) -> ScopedEntity {
        ScopedEntity::new(id, title, "pkg1")
    }

    #[test]
    fn test_first_match_keeps_server_order() {
        let rows = vec![row("1", "rel"), row("2", "rel"), row("3", "other")];
        for _ in 0..3 {
            assert_eq!(first_match(rows.clone(), "rel").unwrap().id, "1");
        }
    }

    #[test]
    fn test_first_match_is_exact() {
        let rows = vec![row("1", "Release"), row("2", "release ")];
        assert!(first_match(rows.clone(), "release").is_none());
        assert_eq!(first_match(rows, "Release").unwrap().id, "1");
    }

    #[test]
    fn test_latest_by_ties_keep_first() {
        let rows = vec![("a", Some(2)), ("b", Some(5)), ("c", Some(5)), ("d", None)];
        let latest = latest_by(rows, |r| r.1).unwrap();
        assert_eq!(latest.0, "b");
    }

    #[test]
    fn test_latest_by_undated_rows() {
        let rows = vec![("a", None), ("b", None::<u32>)];
        assert_eq!(latest_by(rows, |r| r.1).unwrap().0, "a");

        let empty: Vec<(&str, Option<u32>)> = Vec::new();
        assert!(latest_by(empty, |r| r.1).is_none());
    }
}
