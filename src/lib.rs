// src/lib.rs

//! TeamForge client library
//!
//! Talks to a TeamForge (CollabNet) server on behalf of build jobs: log in,
//! resolve human-readable titles to server ids, publish files into releases
//! and document folders, keep build-problem artifacts up to date and manage
//! project roles.
//!
//! # Architecture
//!
//! - Transport: every remote call goes through the [`Transport`] trait
//! - Session: one login, one token, one lazily filled cache of service proxies
//! - Facades: `Projects`, `FileReleases`, `Roles`, `Trackers`, `Documents`
//!   and `FileStorage` borrow a session and speak in titles
//! - Uploads: large files stream through a chunked upload state machine
//! - Permissions: project roles map onto build-server permissions
//!
//! "Not found" is `Ok(None)`; errors are reserved for failures.

pub mod config;
pub mod docman;
mod error;
pub mod frs;
pub mod interpolate;
pub mod links;
pub mod model;
pub mod permissions;
pub mod progress;
pub mod projects;
pub mod publish;
pub mod rbac;
pub mod resolve;
pub mod session;
pub mod storage;
pub mod tracker;
pub mod transport;
pub mod version;

pub use config::{Config, ConnectionSettings, UploadSection};
pub use docman::{Documents, NewDocument};
pub use error::{Error, Result};
pub use frs::FileReleases;
pub use model::{Artifact, Attachment, NewArtifact, Priority, ScopedEntity};
pub use permissions::{CatalogueRole, Permission, PermissionCache, granting_role, permissions_for};
pub use progress::{BarProgress, LogProgress, ProgressTracker, SilentProgress};
pub use projects::Projects;
pub use publish::{DocumentPublisher, FileOutcome, PublishReport, ReleasePublisher};
pub use rbac::Roles;
pub use resolve::{Resolver, TitleResolver};
pub use session::{Session, SessionTicket, Subsystem};
pub use storage::{ChunkedUpload, FileStorage, UploadHandle, UploadState};
pub use tracker::{BuildReport, IssueAction, IssuePolicy, Trackers};
pub use transport::{HttpTransport, Transport, TransportError};
pub use version::ApiVersion;
