// src/commands/lookup.rs

//! Title to id lookups

use super::{connect, expand};
use crate::cli::{ConnectionArgs, ResolveKind};
use anyhow::{Result, anyhow};
use ctflink::{FileReleases, Projects, Roles, Session, Trackers};

fn project_id(session: &Session, project: Option<&str>) -> Result<String> {
    let title = project.ok_or_else(|| anyhow!("--project is required for this kind"))?;
    let title = expand(title)?;
    Projects::new(session)
        .find_project_id(&title)?
        .ok_or_else(|| anyhow!("Project '{}' not found", title))
}

fn lookup(session: &Session, kind: ResolveKind, title: &str, project: Option<&str>, package: Option<&str>) -> Result<Option<String>> {
    let id = match kind {
        ResolveKind::Project => Projects::new(session).find_project_id(title)?,
        ResolveKind::Package => FileReleases::new(session).find_package_id(&project_id(session, project)?, title)?,
        ResolveKind::Release => {
            let frs = FileReleases::new(session);
            let project_id = project_id(session, project)?;
            match package {
                Some(package) => {
                    let package = expand(package)?;
                    match frs.find_package_id(&project_id, &package)? {
                        Some(package_id) => frs.find_release_id(&package_id, title)?,
                        None => None,
                    }
                }
                None => frs.find_release_id_in_project(&project_id, title)?,
            }
        }
        ResolveKind::Tracker => Trackers::new(session).find_tracker_id(&project_id(session, project)?, title)?,
        ResolveKind::Role => Roles::new(session).find_role_id(&project_id(session, project)?, title)?,
    };
    Ok(id)
}

/// Print the id of an object found by title
pub fn cmd_resolve(
    args: &ConnectionArgs,
    kind: ResolveKind,
    title: &str,
    project: Option<&str>,
    package: Option<&str>,
) -> Result<()> {
    let title = expand(title)?;
    let conn = connect(args)?;
    let result = lookup(&conn.session, kind, &title, project, package);
    conn.finish();

    match result? {
        Some(id) => {
            println!("{}", id);
            Ok(())
        }
        None => Err(anyhow!("No {:?} titled '{}'", kind, title)),
    }
}
