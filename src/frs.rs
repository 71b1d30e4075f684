// src/frs.rs

//! File Release System: packages, releases and release files
//!
//! Packages belong to a project, releases to a package, files to a release.
//! Lookups go through the title resolvers; mutations forward already resolved
//! ids to the `FrsApp` service.

use crate::error::{Error, Result};
use crate::model::{DEFAULT_RELEASE_MATURITY, DEFAULT_RELEASE_STATUS, ReleaseFileRow, ScopedEntity};
use crate::resolve::{Resolver, TitleResolver, first_match};
use crate::session::{Session, Subsystem, decode};
use serde_json::Value;
use tracing::{debug, info};

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

/// File Release System operations on a session
pub struct FileReleases<'a> {
    session: &'a Session,
}

impl<'a> FileReleases<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub fn package_titles(&self, project_id: &str) -> Result<Vec<String>> {
        self.session.validate()?;
        TitleResolver::PACKAGE.titles(self.session, project_id)
    }

    pub fn release_titles(&self, package_id: &str) -> Result<Vec<String>> {
        self.session.validate()?;
        TitleResolver::RELEASE.titles(self.session, package_id)
    }

    /// Id of the first package titled `title` in a project
    pub fn find_package_id(&self, project_id: &str, title: &str) -> Result<Option<String>> {
        TitleResolver::PACKAGE.resolve_id(self.session, project_id, title)
    }

    /// Id of the first release titled `title` in a package
    pub fn find_release_id(&self, package_id: &str, title: &str) -> Result<Option<String>> {
        TitleResolver::RELEASE.resolve_id(self.session, package_id, title)
    }

    /// Find a release by title anywhere in a project
    ///
    /// Packages are visited in server order and the search stops at the
    /// first package holding a match, so each visited package costs exactly
    /// one release listing.
    pub fn find_release_in_project(&self, project_id: &str, title: &str) -> Result<Option<ScopedEntity>> {
        self.session.validate()?;
        if title.is_empty() {
            return Ok(None);
        }

        for package in TitleResolver::PACKAGE.list(self.session, project_id)? {
            if let Some(release) = TitleResolver::RELEASE.resolve_entity(self.session, &package.id, title)? {
                debug!("Release '{}' found in package '{}'", title, package.title);
                return Ok(Some(release));
            }
        }
        Ok(None)
    }

    /// Id of a release titled `title` anywhere in a project
    pub fn find_release_id_in_project(&self, project_id: &str, title: &str) -> Result<Option<String>> {
        Ok(self.find_release_in_project(project_id, title)?.map(|r| r.id))
    }

    /// Create a package in a project
    pub fn create_package(
        &self,
        project_id: &str,
        title: &str,
        description: &str,
        published: bool,
    ) -> Result<ScopedEntity> {
        let reply = self.session.invoke(
            Subsystem::Frs,
            "createPackage",
            vec![text(project_id), text(title), text(description), Value::Bool(published)],
        )?;
        info!("Created package '{}' in {}", title, project_id);
        decode("createPackage", reply)
    }

    /// Create a release in a package
    pub fn create_release(
        &self,
        package_id: &str,
        title: &str,
        description: &str,
        status: &str,
        maturity: &str,
    ) -> Result<ScopedEntity> {
        let reply = self.session.invoke(
            Subsystem::Frs,
            "createRelease",
            vec![
                text(package_id),
                text(title),
                text(description),
                text(status),
                text(maturity),
            ],
        )?;
        info!("Created release '{}' in {}", title, package_id);
        decode("createRelease", reply)
    }

    /// Resolve a release, creating it when it does not exist yet
    ///
    /// New releases get status `active` and maturity `Prototype`. An empty
    /// title never creates anything.
    pub fn find_or_create_release(&self, package_id: &str, title: &str) -> Result<ScopedEntity> {
        if title.is_empty() {
            return Err(Error::TargetNotFound {
                kind: "release".to_string(),
                title: String::new(),
            });
        }
        if let Some(release) = TitleResolver::RELEASE.resolve_entity(self.session, package_id, title)? {
            return Ok(release);
        }
        self.create_release(package_id, title, "", DEFAULT_RELEASE_STATUS, DEFAULT_RELEASE_MATURITY)
    }

    /// Files of a release, in server order
    pub fn list_release_files(&self, release_id: &str) -> Result<Vec<ReleaseFileRow>> {
        self.session.validate()?;
        self.session
            .lookup_rows(Subsystem::Frs, "getFrsFileList", vec![text(release_id)])
    }

    /// First file of a release titled `name`
    pub fn find_release_file(&self, release_id: &str, name: &str) -> Result<Option<ReleaseFileRow>> {
        self.session.validate()?;
        if name.is_empty() {
            return Ok(None);
        }
        Ok(first_match(self.list_release_files(release_id)?, name))
    }

    /// Attach an uploaded file to a release
    pub fn create_release_file(
        &self,
        release_id: &str,
        title: &str,
        mime_type: &str,
        file_id: &str,
    ) -> Result<ReleaseFileRow> {
        let reply = self.session.invoke(
            Subsystem::Frs,
            "createFrsFile",
            vec![text(release_id), text(title), text(mime_type), text(file_id)],
        )?;
        debug!("Attached {} to release {} as '{}'", file_id, release_id, title);
        decode("createFrsFile", reply)
    }

    /// Remove a file from its release
    pub fn delete_release_file(&self, release_file_id: &str) -> Result<()> {
        self.session
            .invoke(Subsystem::Frs, "deleteFrsFile", vec![text(release_file_id)])?;
        debug!("Deleted release file {}", release_file_id);
        Ok(())
    }
}
