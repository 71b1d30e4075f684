// src/commands/roles.rs

//! Project role management

use super::{connect, expand};
use crate::cli::ConnectionArgs;
use anyhow::{Result, anyhow, bail};
use ctflink::{Permission, PermissionCache, Projects, Roles, Session, granting_role};

fn project_id(session: &Session, project: &str) -> Result<String> {
    Projects::new(session)
        .find_project_id(project)?
        .ok_or_else(|| anyhow!("Project '{}' not found", project))
}

/// Create the roles that do not exist yet
///
/// Without any `--description` every role gets an empty one.
pub fn cmd_add_roles(args: &ConnectionArgs, project: &str, roles: &[String], descriptions: &[String]) -> Result<()> {
    let project = expand(project)?;
    let titles: Vec<&str> = roles.iter().map(String::as_str).collect();
    let descriptions: Vec<&str> = if descriptions.is_empty() {
        vec![""; titles.len()]
    } else {
        descriptions.iter().map(String::as_str).collect()
    };

    let conn = connect(args)?;
    let result = project_id(&conn.session, &project)
        .and_then(|id| Ok(Roles::new(&conn.session).add_roles(&id, &titles, &descriptions)?));
    conn.finish();

    if result? {
        println!("Created missing roles in {}", project);
    } else {
        println!("All roles already exist in {}", project);
    }
    Ok(())
}

/// Create the build-server role catalogue in a project
pub fn cmd_add_catalogue_roles(args: &ConnectionArgs, project: &str) -> Result<()> {
    let project = expand(project)?;

    let conn = connect(args)?;
    let result = project_id(&conn.session, &project)
        .and_then(|id| Ok(Roles::new(&conn.session).add_catalogue_roles(&id)?));
    conn.finish();

    if result? {
        println!("Created missing catalogue roles in {}", project);
    } else {
        println!("Catalogue roles already exist in {}", project);
    }
    Ok(())
}

/// Grant a role to a user
pub fn cmd_grant_role(args: &ConnectionArgs, project: &str, role: &str, user: &str) -> Result<()> {
    let (project, role, user) = (expand(project)?, expand(role)?, expand(user)?);

    let conn = connect(args)?;
    let result = project_id(&conn.session, &project)
        .and_then(|id| Ok(Roles::new(&conn.session).grant_role(&id, &role, &user)?));
    conn.finish();

    result?;
    println!("Granted '{}' to {} in {}", role, user, project);
    Ok(())
}

/// Print a user's build permissions, optionally requiring one
pub fn cmd_permissions(args: &ConnectionArgs, project: &str, user: &str, require: Option<&str>) -> Result<()> {
    let (project, user) = (expand(project)?, expand(user)?);
    let required = require.map(str::parse::<Permission>).transpose()?;

    let conn = connect(args)?;
    let cache = PermissionCache::default();
    let result = project_id(&conn.session, &project)
        .and_then(|id| Ok(cache.permissions(&conn.session, &id, &user)?));
    conn.finish();

    let permissions = result?;
    if permissions.is_empty() {
        println!("{} holds no build permissions in {}", user, project);
    } else {
        let names: Vec<&str> = permissions.iter().map(Permission::as_str).collect();
        println!("{} in {}: {}", user, project, names.join(", "));
    }

    if let Some(permission) = required
        && !permissions.contains(&permission)
    {
        match granting_role(permission) {
            Some(role) => bail!("{} lacks '{}'; grant role '{}'", user, permission, role.title),
            None => bail!("{} lacks '{}'", user, permission),
        }
    }
    Ok(())
}
