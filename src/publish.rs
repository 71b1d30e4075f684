// src/publish.rs

//! Publishing local files to TeamForge
//!
//! Two flows, both driven by titles rather than ids:
//! - [`ReleasePublisher`]: files into a release of the File Release System.
//!   The release is created if missing. An existing release file with the
//!   same name is replaced when `overwrite` is set and skipped otherwise.
//! - [`DocumentPublisher`]: files into a document folder path, created as
//!   needed. A file updates the newest document with its name or becomes a
//!   new document.
//!
//! A failure on one file is recorded in the [`PublishReport`] and the next
//! file is tried. Failures that invalidate the session end the run.

use crate::config::UploadSection;
use crate::docman::{Documents, NewDocument};
use crate::error::{Error, Result};
use crate::frs::FileReleases;
use crate::progress::{LogProgress, ProgressTracker};
use crate::projects::Projects;
use crate::session::Session;
use crate::storage::{FileStorage, mime_type_for};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Stored; `id` is the release file or document id
    Uploaded { id: String },
    Skipped { reason: String },
    Failed { message: String },
}

/// Outcome for one local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// Result of a publish run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishReport {
    /// Release id or document folder id the files went to
    pub target_id: String,
    pub files: Vec<FileResult>,
}

impl PublishReport {
    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }

    pub fn uploaded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Uploaded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    fn record(&mut self, path: &Path, outcome: FileOutcome) {
        self.files.push(FileResult {
            path: path.to_path_buf(),
            outcome,
        });
    }

    /// Record a per-file error, or give up if the session is gone
    fn record_error(&mut self, path: &Path, err: Error) -> Result<()> {
        if err.requires_login() {
            return Err(err);
        }
        warn!("Failed to publish {}: {}", path.display(), err);
        self.record(
            path,
            FileOutcome::Failed {
                message: err.to_string(),
            },
        );
        Ok(())
    }
}

type ProgressFactory<'a> = Box<dyn Fn(&Path) -> Box<dyn ProgressTracker> + 'a>;

fn log_progress(path: &Path) -> Box<dyn ProgressTracker> {
    Box::new(LogProgress::new(format!("upload {}", path.display())))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::IoError(format!("{} has no file name", path.display())))
}

fn resolve_project(session: &Session, project: &str) -> Result<String> {
    Projects::new(session)
        .find_project_id(project)?
        .ok_or_else(|| Error::TargetNotFound {
            kind: "project".to_string(),
            title: project.to_string(),
        })
}

/// Publishes files into a File Release System release
pub struct ReleasePublisher<'a> {
    session: &'a Session,
    upload: UploadSection,
    overwrite: bool,
    progress: ProgressFactory<'a>,
}

impl<'a> ReleasePublisher<'a> {
    pub fn new(session: &'a Session, upload: &UploadSection) -> Self {
        Self {
            session,
            upload: upload.clone(),
            overwrite: false,
            progress: Box::new(log_progress),
        }
    }

    /// Replace existing release files with the same name
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Report upload progress through trackers made by `factory`
    pub fn with_progress(mut self, factory: impl Fn(&Path) -> Box<dyn ProgressTracker> + 'a) -> Self {
        self.progress = Box::new(factory);
        self
    }

    /// Publish `files` to project/package/release, creating the release if
    /// needed
    pub fn publish(&self, project: &str, package: &str, release: &str, files: &[PathBuf]) -> Result<PublishReport> {
        let frs = FileReleases::new(self.session);
        let project_id = resolve_project(self.session, project)?;
        let package_id = frs
            .find_package_id(&project_id, package)?
            .ok_or_else(|| Error::TargetNotFound {
                kind: "package".to_string(),
                title: package.to_string(),
            })?;
        let release = frs.find_or_create_release(&package_id, release)?;

        let mut report = PublishReport {
            target_id: release.id.clone(),
            files: Vec::new(),
        };
        for path in files {
            match self.publish_file(&frs, &release.id, path) {
                Ok(outcome) => report.record(path, outcome),
                Err(e) => report.record_error(path, e)?,
            }
        }

        info!(
            "Release '{}': {} uploaded, {} skipped, {} failed",
            release.title,
            report.uploaded(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    fn publish_file(&self, frs: &FileReleases<'_>, release_id: &str, path: &Path) -> Result<FileOutcome> {
        let name = file_name(path)?;

        if let Some(existing) = frs.find_release_file(release_id, &name)? {
            if !self.overwrite {
                info!("{} already exists in the release, skipping", name);
                return Ok(FileOutcome::Skipped {
                    reason: "already exists and overwrite is off".to_string(),
                });
            }
            frs.delete_release_file(&existing.id)?;
            info!("Deleted previously uploaded {}", name);
        }

        let progress = (self.progress)(path);
        let file_id = FileStorage::with_settings(self.session, &self.upload).upload_file(path, progress.as_ref())?;
        let row = frs.create_release_file(release_id, &name, &mime_type_for(path), &file_id)?;
        Ok(FileOutcome::Uploaded { id: row.id })
    }
}

/// Publishes files into a document folder
pub struct DocumentPublisher<'a> {
    session: &'a Session,
    upload: UploadSection,
    description: String,
    progress: ProgressFactory<'a>,
}

impl<'a> DocumentPublisher<'a> {
    pub fn new(session: &'a Session, upload: &UploadSection) -> Self {
        Self {
            session,
            upload: upload.clone(),
            description: String::new(),
            progress: Box::new(log_progress),
        }
    }

    /// Description given to newly created documents
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_progress(mut self, factory: impl Fn(&Path) -> Box<dyn ProgressTracker> + 'a) -> Self {
        self.progress = Box::new(factory);
        self
    }

    /// Publish `files` below `folder_path` of a project's document tree
    pub fn publish(&self, project: &str, folder_path: &str, files: &[PathBuf]) -> Result<PublishReport> {
        let docs = Documents::new(self.session);
        let project_id = resolve_project(self.session, project)?;
        let folder_id = docs.find_or_create_path(&project_id, folder_path)?;

        let mut report = PublishReport {
            target_id: folder_id.clone(),
            files: Vec::new(),
        };
        for path in files {
            match self.publish_file(&docs, &folder_id, path) {
                Ok(outcome) => report.record(path, outcome),
                Err(e) => report.record_error(path, e)?,
            }
        }

        info!(
            "Folder '{}': {} uploaded, {} failed",
            folder_path,
            report.uploaded(),
            report.failed()
        );
        Ok(report)
    }

    fn publish_file(&self, docs: &Documents<'_>, folder_id: &str, path: &Path) -> Result<FileOutcome> {
        let name = file_name(path)?;
        let progress = (self.progress)(path);
        let file_id = FileStorage::with_settings(self.session, &self.upload).upload_file(path, progress.as_ref())?;

        let id = match docs.find_document_id(folder_id, &name)? {
            Some(doc_id) => {
                docs.update_document(&doc_id, &file_id)?;
                doc_id
            }
            None => {
                let doc = NewDocument::for_file(&name, &self.description, &mime_type_for(path), &file_id);
                docs.create_document(folder_id, &doc)?.id
            }
        };
        Ok(FileOutcome::Uploaded { id })
    }
}
