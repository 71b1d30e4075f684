// src/commands/mod.rs
//! Command handlers for the ctflink CLI

mod lookup;
mod publish;
mod report;
mod roles;
mod session;

pub use lookup::cmd_resolve;
pub use publish::{cmd_publish_docs, cmd_publish_release};
pub use report::{ReportOptions, cmd_report_build};
pub use roles::{cmd_add_catalogue_roles, cmd_add_roles, cmd_grant_role, cmd_permissions};
pub use session::{cmd_login, cmd_logoff, cmd_version, connect, Connection};

use anyhow::{Context, Result};
use ctflink::interpolate::interpolate_env;
use ctflink::progress::{BarProgress, LogProgress, ProgressTracker};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Expand `${VAR}` references from the environment
pub(crate) fn expand(text: &str) -> Result<String> {
    Ok(interpolate_env(text)?)
}

/// Expand variables and glob patterns into a list of regular files
///
/// Patterns are expanded in order; a file matched twice is listed once.
pub(crate) fn expand_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let pattern = expand(pattern)?;
        let mut matched = false;
        for entry in glob::glob(&pattern).with_context(|| format!("Invalid file pattern '{}'", pattern))? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }
            matched = true;
            if !files.contains(&path) {
                files.push(path);
            }
        }
        if !matched {
            warn!("No files match '{}'", pattern);
        }
    }

    Ok(files)
}

/// Progress trackers for uploads: a bar on a terminal, log lines otherwise
pub(crate) fn progress_factory(bar: bool) -> impl Fn(&Path) -> Box<dyn ProgressTracker> {
    move |path: &Path| -> Box<dyn ProgressTracker> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if bar {
            Box::new(BarProgress::new(&name))
        } else {
            Box::new(LogProgress::new(format!("upload {}", name)))
        }
    }
}
