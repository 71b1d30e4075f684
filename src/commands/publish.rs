// src/commands/publish.rs

//! Publishing files to releases and document folders

use super::{connect, expand, expand_files, progress_factory};
use crate::cli::ConnectionArgs;
use anyhow::{Result, bail};
use ctflink::links;
use ctflink::{DocumentPublisher, FileOutcome, PublishReport, ReleasePublisher};
use tracing::info;

fn print_report(report: &PublishReport) {
    for file in &report.files {
        match &file.outcome {
            FileOutcome::Uploaded { id } => println!("  uploaded  {} ({})", file.path.display(), id),
            FileOutcome::Skipped { reason } => println!("  skipped   {} ({})", file.path.display(), reason),
            FileOutcome::Failed { message } => println!("  FAILED    {}: {}", file.path.display(), message),
        }
    }
    println!(
        "{} uploaded, {} skipped, {} failed",
        report.uploaded(),
        report.skipped(),
        report.failed()
    );
}

/// Upload files into a release
pub fn cmd_publish_release(
    args: &ConnectionArgs,
    project: &str,
    package: &str,
    release: &str,
    overwrite: bool,
    patterns: &[String],
) -> Result<()> {
    let files = expand_files(patterns)?;
    if files.is_empty() {
        bail!("Nothing to upload: no files match the given patterns");
    }
    let (project, package, release) = (expand(project)?, expand(package)?, expand(release)?);

    let conn = connect(args)?;
    info!("Publishing {} file(s) to {}/{}/{}", files.len(), project, package, release);
    let result = ReleasePublisher::new(&conn.session, &conn.config.upload)
        .overwrite(overwrite)
        .with_progress(progress_factory(conn.progress_bar))
        .publish(&project, &package, &release, &files);
    let server_url = conn.session.server_url().to_string();
    conn.finish();

    let report = result?;
    print_report(&report);
    println!("Release: {}", links::object_url(&server_url, &report.target_id));
    if report.failed() > 0 {
        bail!("{} file(s) failed to upload", report.failed());
    }
    Ok(())
}

/// Upload files as documents below a folder path
pub fn cmd_publish_docs(
    args: &ConnectionArgs,
    project: &str,
    path: &str,
    description: &str,
    patterns: &[String],
) -> Result<()> {
    let files = expand_files(patterns)?;
    if files.is_empty() {
        bail!("Nothing to upload: no files match the given patterns");
    }
    let (project, path, description) = (expand(project)?, expand(path)?, expand(description)?);

    let conn = connect(args)?;
    info!("Publishing {} file(s) to documents of {} under '{}'", files.len(), project, path);
    let result = DocumentPublisher::new(&conn.session, &conn.config.upload)
        .description(description)
        .with_progress(progress_factory(conn.progress_bar))
        .publish(&project, &path, &files);
    let server_url = conn.session.server_url().to_string();
    conn.finish();

    let report = result?;
    print_report(&report);
    println!("Folder: {}", links::object_url(&server_url, &report.target_id));
    if report.failed() > 0 {
        bail!("{} file(s) failed to upload", report.failed());
    }
    Ok(())
}
