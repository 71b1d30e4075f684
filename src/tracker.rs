// src/tracker.rs

//! Trackers and tracker artifacts
//!
//! Besides the plain create/update calls this module carries the policy that
//! keeps one artifact per recurring build problem: find the latest artifact
//! with the configured title, then open, update, reopen or close it depending
//! on the build outcome (see [`IssueAction::decide`]).

use crate::error::{Error, Result};
use crate::model::{
    Artifact, ArtifactRow, Attachment, NewArtifact, Priority, STATUS_CLASS_CLOSE, STATUS_CLASS_OPEN,
};
use crate::resolve::{Resolver, TitleResolver, latest_by};
use crate::session::{Session, Subsystem, decode};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

/// Status given to artifacts opened for a failing build
pub const STATUS_OPEN: &str = "Open";

/// Status given to artifacts closed by a passing build
pub const STATUS_CLOSED: &str = "Closed";

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

fn opt_text(s: Option<&str>) -> Value {
    s.map_or(Value::Null, text)
}

/// Tracker operations on a session
pub struct Trackers<'a> {
    session: &'a Session,
}

impl<'a> Trackers<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub fn tracker_titles(&self, project_id: &str) -> Result<Vec<String>> {
        self.session.validate()?;
        TitleResolver::TRACKER.titles(self.session, project_id)
    }

    pub fn find_tracker_id(&self, project_id: &str, title: &str) -> Result<Option<String>> {
        TitleResolver::TRACKER.resolve_id(self.session, project_id, title)
    }

    /// Artifacts of a tracker whose title is exactly `title` (filtered by the
    /// server)
    pub fn list_artifacts(&self, tracker_id: &str, title: &str) -> Result<Vec<ArtifactRow>> {
        self.session.validate()?;
        self.session.lookup_rows(
            Subsystem::Tracker,
            "getArtifactList",
            vec![text(tracker_id), json!([{"name": "title", "value": title}])],
        )
    }

    /// Most recently submitted artifact titled `title`
    ///
    /// Artifacts with the same submission time keep server order: the first
    /// one listed wins.
    pub fn find_latest_artifact(&self, tracker_id: &str, title: &str) -> Result<Option<ArtifactRow>> {
        self.session.validate()?;
        if title.is_empty() {
            return Ok(None);
        }
        let rows = self.list_artifacts(tracker_id, title)?;
        debug!("{} artifacts titled '{}' in {}", rows.len(), title, tracker_id);
        Ok(latest_by(rows, |row| row.submitted_date))
    }

    /// Full data of an artifact
    pub fn artifact(&self, artifact_id: &str) -> Result<Artifact> {
        self.session.validate()?;
        let reply = self
            .session
            .lookup(Subsystem::Tracker, "getArtifactData", vec![text(artifact_id)])?;
        decode("getArtifactData", reply)
    }

    /// Full data of the most recently submitted artifact titled `title`
    pub fn find_last_artifact(&self, tracker_id: &str, title: &str) -> Result<Option<Artifact>> {
        match self.find_latest_artifact(tracker_id, title)? {
            Some(row) => self.artifact(&row.id).map(Some),
            None => Ok(None),
        }
    }

    /// Create an artifact in a tracker
    pub fn create_artifact(&self, tracker_id: &str, new: &NewArtifact) -> Result<Artifact> {
        let attachment = new.attachment.as_ref();
        let reply = self.session.invoke(
            Subsystem::Tracker,
            "createArtifact",
            vec![
                text(tracker_id),
                text(&new.title),
                text(&new.description),
                opt_text(new.group.as_deref()),
                opt_text(new.category.as_deref()),
                text(&new.status),
                opt_text(new.customer.as_deref()),
                Value::from(new.priority.number()),
                Value::from(new.estimated_hours),
                opt_text(new.assign_to.as_deref()),
                opt_text(new.release_id.as_deref()),
                Value::Null,
                opt_text(attachment.map(|a| a.file_name.as_str())),
                opt_text(attachment.map(|a| a.mime_type.as_str())),
                opt_text(attachment.map(|a| a.file_id.as_str())),
            ],
        )?;
        info!("Created artifact '{}' in tracker {}", new.title, tracker_id);
        decode("createArtifact", reply)
    }

    /// Store changed artifact data, with a comment and an optional attachment
    pub fn update_artifact(&self, artifact: &Artifact, comment: &str, attachment: Option<&Attachment>) -> Result<()> {
        let data = serde_json::to_value(artifact).map_err(|e| Error::ParseError(e.to_string()))?;
        self.session.invoke(
            Subsystem::Tracker,
            "setArtifactData",
            vec![
                data,
                text(comment),
                opt_text(attachment.map(|a| a.file_name.as_str())),
                opt_text(attachment.map(|a| a.mime_type.as_str())),
                opt_text(attachment.map(|a| a.file_id.as_str())),
            ],
        )?;
        info!("Updated artifact {}", artifact.id);
        Ok(())
    }

    /// Bring the build-problem artifact in line with a build outcome
    pub fn report_build(&self, tracker_id: &str, report: &BuildReport, policy: IssuePolicy) -> Result<IssueAction> {
        let existing = self.find_last_artifact(tracker_id, &report.title)?;
        let action = IssueAction::decide(existing.as_ref(), report.succeeded, policy);
        let attachment = report.attachment.as_ref();

        match (action, existing) {
            (IssueAction::Create { status }, _) => {
                let new = NewArtifact {
                    title: report.title.clone(),
                    description: report.summary.clone(),
                    status: status.to_string(),
                    priority: report.priority,
                    assign_to: report.assign_to.clone(),
                    release_id: report.release_id.clone(),
                    attachment: report.attachment.clone(),
                    ..Default::default()
                };
                self.create_artifact(tracker_id, &new)?;
            }
            (IssueAction::ReportFailure, Some(mut artifact)) => {
                if artifact.status != STATUS_OPEN {
                    artifact.status = STATUS_OPEN.to_string();
                    info!("Reopening artifact {}", artifact.id);
                }
                self.update_artifact(&artifact, &report.summary, attachment)?;
            }
            (IssueAction::ReportSuccess, Some(artifact)) => {
                self.update_artifact(&artifact, &report.summary, attachment)?;
            }
            (IssueAction::Close, Some(mut artifact)) => {
                artifact.status_class = STATUS_CLASS_CLOSE.to_string();
                artifact.status = STATUS_CLOSED.to_string();
                self.update_artifact(&artifact, &report.summary, attachment)?;
            }
            (IssueAction::Nothing, _) => {}
            (other, None) => warn!("No artifact to apply {:?} to", other),
        }
        Ok(action)
    }
}

/// How build outcomes map onto artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IssuePolicy {
    /// Record passing builds too, and reopen instead of filing anew
    pub always_update: bool,
    /// Close an open artifact when the build passes
    pub close_on_success: bool,
}

/// A build outcome to record in a tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub title: String,
    pub succeeded: bool,
    /// Description for new artifacts, comment for updates
    pub summary: String,
    pub priority: Priority,
    pub assign_to: Option<String>,
    pub release_id: Option<String>,
    pub attachment: Option<Attachment>,
}

/// What to do with the build-problem artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueAction {
    /// File a new artifact with this status
    Create { status: &'static str },
    /// Comment on the artifact, reopening it if needed
    ReportFailure,
    /// Comment on the artifact without changing its status
    ReportSuccess,
    /// Close the artifact
    Close,
    Nothing,
}

impl IssueAction {
    /// Decide from the latest artifact (if any) and the build outcome
    pub fn decide(existing: Option<&Artifact>, succeeded: bool, policy: IssuePolicy) -> Self {
        let Some(artifact) = existing else {
            return match (succeeded, policy.always_update) {
                (false, _) => IssueAction::Create { status: STATUS_OPEN },
                (true, true) => IssueAction::Create { status: STATUS_CLOSED },
                (true, false) => IssueAction::Nothing,
            };
        };

        match (artifact.status_class.as_str(), succeeded) {
            (STATUS_CLASS_OPEN, false) => IssueAction::ReportFailure,
            (STATUS_CLASS_OPEN, true) if policy.close_on_success => IssueAction::Close,
            (STATUS_CLASS_OPEN, true) => IssueAction::ReportSuccess,
            (STATUS_CLASS_CLOSE, false) if policy.always_update => IssueAction::ReportFailure,
            (STATUS_CLASS_CLOSE, false) => IssueAction::Create { status: STATUS_OPEN },
            (STATUS_CLASS_CLOSE, true) if policy.always_update => IssueAction::ReportSuccess,
            (STATUS_CLASS_CLOSE, true) => IssueAction::Nothing,
            (class, _) => {
                warn!("Artifact {} has unexpected status class '{}'", artifact.id, class);
                IssueAction::Nothing
            }
        }
    }
}
