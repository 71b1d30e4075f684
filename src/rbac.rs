// src/rbac.rs
//! Project roles and role membership

use crate::error::{Error, Result};
use crate::model::ScopedEntity;
use crate::permissions::CATALOGUE;
use crate::resolve::{Resolver, TitleResolver};
use crate::session::{Session, Subsystem, decode};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info};

/// Role operations on a session
pub struct Roles<'a> {
    session: &'a Session,
}

impl<'a> Roles<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Titles of every role in a project
    pub fn role_titles(&self, project_id: &str) -> Result<Vec<String>> {
        self.session.validate()?;
        TitleResolver::ROLE.titles(self.session, project_id)
    }

    pub fn find_role_id(&self, project_id: &str, title: &str) -> Result<Option<String>> {
        TitleResolver::ROLE.resolve_id(self.session, project_id, title)
    }

    /// Titles of the roles `username` holds in a project
    pub fn user_roles(&self, project_id: &str, username: &str) -> Result<Vec<String>> {
        self.session.validate()?;
        let rows: Vec<ScopedEntity> = self.session.lookup_rows(
            Subsystem::Rbac,
            "getUserRoleList",
            vec![Value::String(project_id.to_string()), Value::String(username.to_string())],
        )?;
        Ok(rows.into_iter().map(|r| r.title).collect())
    }

    /// Create a role without checking whether one with that title exists
    pub fn create_role(&self, project_id: &str, title: &str, description: &str) -> Result<ScopedEntity> {
        let reply = self.session.invoke(
            Subsystem::Rbac,
            "createRole",
            vec![
                Value::String(project_id.to_string()),
                Value::String(title.to_string()),
                Value::String(description.to_string()),
            ],
        )?;
        info!("Created role '{}' in {}", title, project_id);
        decode("createRole", reply)
    }

    /// Create every role in `titles` the project does not have yet
    ///
    /// `titles` and `descriptions` pair up by position. The current roles
    /// are listed once. Returns whether any role was created, so a second
    /// run with the same input returns `false` and creates nothing.
    pub fn add_roles(&self, project_id: &str, titles: &[&str], descriptions: &[&str]) -> Result<bool> {
        if titles.len() != descriptions.len() {
            return Err(Error::ArgumentMismatch {
                titles: titles.len(),
                descriptions: descriptions.len(),
            });
        }
        self.session.validate()?;

        let mut existing: HashSet<String> = TitleResolver::ROLE
            .titles(self.session, project_id)?
            .into_iter()
            .collect();

        let mut added = false;
        for (title, description) in titles.iter().zip(descriptions) {
            if existing.contains(*title) {
                debug!("Role '{}' already exists in {}", title, project_id);
                continue;
            }
            self.create_role(project_id, title, description)?;
            existing.insert(title.to_string());
            added = true;
        }
        Ok(added)
    }

    /// Create the build-server role catalogue in a project
    ///
    /// Same contract as [`Roles::add_roles`]: existing roles are left alone.
    pub fn add_catalogue_roles(&self, project_id: &str) -> Result<bool> {
        let titles: Vec<&str> = CATALOGUE.iter().map(|role| role.title).collect();
        let descriptions: Vec<&str> = CATALOGUE.iter().map(|role| role.description).collect();
        self.add_roles(project_id, &titles, &descriptions)
    }

    /// Give `username` the role titled `role_title`
    pub fn grant_role(&self, project_id: &str, role_title: &str, username: &str) -> Result<()> {
        let role_id = TitleResolver::ROLE
            .resolve_id(self.session, project_id, role_title)?
            .ok_or_else(|| Error::RoleNotFound {
                role: role_title.to_string(),
                project_id: project_id.to_string(),
            })?;

        self.session.invoke(
            Subsystem::Rbac,
            "addUser",
            vec![Value::String(role_id), Value::String(username.to_string())],
        )?;
        info!("Granted role '{}' in {} to {}", role_title, project_id, username);
        Ok(())
    }
}
