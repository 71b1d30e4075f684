// src/commands/report.rs

//! Build outcome reporting into trackers

use super::{Connection, connect, expand, progress_factory};
use crate::cli::ConnectionArgs;
use anyhow::{Result, anyhow};
use ctflink::storage::mime_type_for;
use ctflink::{
    Attachment, BuildReport, FileReleases, FileStorage, IssueAction, IssuePolicy, Priority, Projects, Trackers,
};
use std::path::Path;
use tracing::warn;

/// Options of `report-build`
pub struct ReportOptions<'a> {
    pub project: &'a str,
    pub tracker: &'a str,
    pub title: &'a str,
    pub failed: bool,
    pub summary: &'a str,
    pub priority: u8,
    pub assign_to: Option<&'a str>,
    pub release: Option<&'a str>,
    pub attach: Option<&'a Path>,
    pub policy: IssuePolicy,
}

fn run(conn: &Connection, opts: &ReportOptions<'_>) -> Result<IssueAction> {
    let session = &conn.session;
    let project = expand(opts.project)?;
    let project_id = Projects::new(session)
        .find_project_id(&project)?
        .ok_or_else(|| anyhow!("Project '{}' not found", project))?;

    let tracker = expand(opts.tracker)?;
    let trackers = Trackers::new(session);
    let tracker_id = trackers
        .find_tracker_id(&project_id, &tracker)?
        .ok_or_else(|| anyhow!("Tracker '{}' not found in {}", tracker, project))?;

    let release_id = match opts.release {
        Some(release) => {
            let release = expand(release)?;
            let id = FileReleases::new(session).find_release_id_in_project(&project_id, &release)?;
            if id.is_none() {
                warn!("Release '{}' not found in {}, reporting without it", release, project);
            }
            id
        }
        None => None,
    };

    let attachment = match opts.attach {
        Some(path) => {
            let progress = progress_factory(conn.progress_bar)(path);
            let file_id = FileStorage::with_settings(session, &conn.config.upload).upload_file(path, progress.as_ref())?;
            Some(Attachment {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                mime_type: mime_type_for(path),
                file_id,
            })
        }
        None => None,
    };

    let report = BuildReport {
        title: expand(opts.title)?,
        succeeded: !opts.failed,
        summary: expand(opts.summary)?,
        priority: Priority::from_number(opts.priority),
        assign_to: opts.assign_to.map(str::to_string),
        release_id,
        attachment,
    };
    Ok(trackers.report_build(&tracker_id, &report, opts.policy)?)
}

/// Record a build outcome in the tracker's build-problem artifact
pub fn cmd_report_build(args: &ConnectionArgs, opts: &ReportOptions<'_>) -> Result<()> {
    let conn = connect(args)?;
    let result = run(&conn, opts);
    conn.finish();

    match result? {
        IssueAction::Create { status } => println!("Created artifact '{}' ({})", opts.title, status),
        IssueAction::ReportFailure => println!("Recorded failure on '{}'", opts.title),
        IssueAction::ReportSuccess => println!("Recorded success on '{}'", opts.title),
        IssueAction::Close => println!("Closed '{}'", opts.title),
        IssueAction::Nothing => println!("Nothing to record for '{}'", opts.title),
    }
    Ok(())
}
