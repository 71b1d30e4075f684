// src/model.rs

//! Rows and records exchanged with the TeamForge services
//!
//! Field names follow the service's camelCase spelling on the wire. Every
//! optional field defaults, so a server that omits a column still decodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Status given to releases created on demand
pub const DEFAULT_RELEASE_STATUS: &str = "active";

/// Maturity given to releases created on demand
pub const DEFAULT_RELEASE_MATURITY: &str = "Prototype";

/// Status given to documents created by a publisher
pub const DEFAULT_DOCUMENT_STATUS: &str = "final";

/// Artifact status class of an unresolved issue
pub const STATUS_CLASS_OPEN: &str = "Open";

/// Artifact status class of a resolved issue
pub const STATUS_CLASS_CLOSE: &str = "Close";

/// A titled child of some scope: project, package, release, tracker, role,
/// document folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopedEntity {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub parent_id: String,
}

impl ScopedEntity {
    pub fn new(id: impl Into<String>, title: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            parent_id: parent_id.into(),
        }
    }
}

/// One row of an artifact listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_class: String,
    #[serde(default)]
    pub submitted_date: Option<DateTime<Utc>>,
}

/// Full artifact record, as read before and sent back on update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    #[serde(default)]
    pub tracker_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_class: String,
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub assigned_username: Option<String>,
    #[serde(default)]
    pub reported_release_id: Option<String>,
    #[serde(default)]
    pub submitted_date: Option<DateTime<Utc>>,
    /// Optimistic-locking counter the server checks on update
    #[serde(default)]
    pub version: u32,
    /// Remaining server fields (category, group, customer, hours, close
    /// date, resolved release, flex fields), sent back untouched on update
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Artifact {
    pub fn is_open(&self) -> bool {
        self.status_class == STATUS_CLASS_OPEN
    }
}

/// A stored file attached to an artifact or document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub file_id: String,
}

/// Values for a new tracker artifact
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewArtifact {
    pub title: String,
    pub description: String,
    pub group: Option<String>,
    pub category: Option<String>,
    pub status: String,
    pub customer: Option<String>,
    pub priority: Priority,
    pub estimated_hours: u32,
    pub assign_to: Option<String>,
    pub release_id: Option<String>,
    pub attachment: Option<Attachment>,
}

/// One row of a document listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub date_version_created: Option<DateTime<Utc>>,
}

/// One file in a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseFileRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub path: String,
}

/// A user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

/// Artifact priority, 1 (highest) to 5 (lowest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    P1,
    P2,
    #[default]
    P3,
    P4,
    P5,
}

impl Priority {
    pub const ALL: [Priority; 5] = [Priority::P1, Priority::P2, Priority::P3, Priority::P4, Priority::P5];

    pub fn number(&self) -> u8 {
        match self {
            Priority::P1 => 1,
            Priority::P2 => 2,
            Priority::P3 => 3,
            Priority::P4 => 4,
            Priority::P5 => 5,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Priority::P1 => "Highest",
            Priority::P2 => "High",
            Priority::P3 => "Medium",
            Priority::P4 => "Low",
            Priority::P5 => "Lowest",
        }
    }

    /// Priority for a number; out-of-range values fall back to the default
    pub fn from_number(n: u8) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| p.number() == n)
            .unwrap_or_default()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.number(), self.text())
    }
}
