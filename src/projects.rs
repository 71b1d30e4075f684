// src/projects.rs
//! Projects, users and groups

use crate::error::Result;
use crate::model::{ScopedEntity, UserRow};
use crate::resolve::{Resolver, TitleResolver};
use crate::session::{Session, Subsystem, decode};
use serde_json::Value;
use tracing::debug;

const GROUP: TitleResolver = TitleResolver::server_wide("group", Subsystem::CollabNet, "getGroupList");

/// Project and user queries on a session
pub struct Projects<'a> {
    session: &'a Session,
}

impl<'a> Projects<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Titles of every project the session user can see
    pub fn project_titles(&self) -> Result<Vec<String>> {
        self.session.validate()?;
        TitleResolver::PROJECT.titles(self.session, "")
    }

    /// Id of the first project titled `title`
    pub fn find_project_id(&self, title: &str) -> Result<Option<String>> {
        TitleResolver::PROJECT.resolve_id(self.session, "", title)
    }

    /// Account data, or `None` when the user does not exist
    pub fn user(&self, username: &str) -> Result<Option<UserRow>> {
        self.session.validate()?;
        if username.is_empty() {
            return Ok(None);
        }

        let reply = self.session.lookup_optional(
            Subsystem::CollabNet,
            "getUserData",
            vec![Value::String(username.to_string())],
        )?;
        match reply {
            Some(Value::Null) | None => {
                debug!("No user '{}'", username);
                Ok(None)
            }
            Some(value) => decode("getUserData", value).map(Some),
        }
    }

    pub fn is_username_valid(&self, username: &str) -> Result<bool> {
        Ok(self.user(username)?.is_some())
    }

    /// Members of a project, in server order
    pub fn project_members(&self, project_id: &str) -> Result<Vec<UserRow>> {
        self.session.validate()?;
        self.session.lookup_rows(
            Subsystem::CollabNet,
            "getProjectMemberList",
            vec![Value::String(project_id.to_string())],
        )
    }

    /// Whether `username` is a member of the project
    pub fn has_member(&self, project_id: &str, username: &str) -> Result<bool> {
        if username.is_empty() {
            return Ok(false);
        }
        Ok(self
            .project_members(project_id)?
            .iter()
            .any(|member| member.username == username))
    }

    /// Active members of the first group titled `group`; empty if there is
    /// no such group
    pub fn group_users(&self, group: &str) -> Result<Vec<UserRow>> {
        let Some(group_id) = GROUP.resolve_id(self.session, "", group)? else {
            return Ok(Vec::new());
        };
        self.session.lookup_rows(
            Subsystem::CollabNet,
            "getActiveGroupMembers",
            vec![Value::String(group_id)],
        )
    }

    /// Project entity for a title (id plus title)
    pub fn find_project(&self, title: &str) -> Result<Option<ScopedEntity>> {
        TitleResolver::PROJECT.resolve_entity(self.session, "", title)
    }
}
