// src/docman.rs

//! Document folders and documents
//!
//! Every project has exactly one root document folder. Folder paths are
//! `/`-separated titles below it; a path may repeat the root folder's title
//! as its first segment or leave it out.

use crate::error::{Error, Result};
use crate::model::{DEFAULT_DOCUMENT_STATUS, DocumentRow, ScopedEntity};
use crate::resolve::{Resolver, TitleResolver, latest_by};
use crate::session::{Session, Subsystem, decode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

#[derive(Deserialize)]
struct FolderData {
    #[serde(default)]
    path: String,
}

/// Values for a new document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub title: String,
    pub description: String,
    pub status: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_id: String,
}

impl NewDocument {
    /// Document for an uploaded file, titled after the file
    pub fn for_file(file_name: &str, description: &str, mime_type: &str, file_id: &str) -> Self {
        Self {
            title: file_name.to_string(),
            description: description.to_string(),
            status: DEFAULT_DOCUMENT_STATUS.to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            file_id: file_id.to_string(),
        }
    }
}

/// Split a folder path into its non-empty segments
fn segments(path: &str) -> Vec<&str> {
    path.split('/').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Document operations on a session
pub struct Documents<'a> {
    session: &'a Session,
}

impl<'a> Documents<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// The project's root document folder
    pub fn root_folder(&self, project_id: &str) -> Result<ScopedEntity> {
        self.session.validate()?;
        let mut roots = TitleResolver::FOLDER.list(self.session, project_id)?;
        match roots.len() {
            1 => Ok(roots.remove(0)),
            0 => Err(Error::RootFolder(format!("project {} has no root folder", project_id))),
            n => Err(Error::RootFolder(format!(
                "project {} has {} root folders, expected one",
                project_id, n
            ))),
        }
    }

    /// Path segments below the root folder
    fn relative_segments<'p>(root: &ScopedEntity, path: &'p str) -> Vec<&'p str> {
        let mut parts = segments(path);
        if parts.first() == Some(&root.title.as_str()) {
            parts.remove(0);
        }
        parts
    }

    /// Create a folder below `parent_id`
    pub fn create_folder(&self, parent_id: &str, title: &str, description: &str) -> Result<ScopedEntity> {
        let reply = self.session.invoke(
            Subsystem::Document,
            "createDocumentFolder",
            vec![text(parent_id), text(title), text(description)],
        )?;
        info!("Created document folder '{}' in {}", title, parent_id);
        decode("createDocumentFolder", reply)
    }

    /// Id of the folder at `path`, creating missing folders on the way
    pub fn find_or_create_path(&self, project_id: &str, path: &str) -> Result<String> {
        let root = self.root_folder(project_id)?;
        let mut current = root.id.clone();

        for segment in Self::relative_segments(&root, path) {
            current = match TitleResolver::FOLDER.resolve_id(self.session, &current, segment)? {
                Some(id) => id,
                None => {
                    let description = format!("Created for document upload: {}", segment);
                    self.create_folder(&current, segment, &description)?.id
                }
            };
        }
        debug!("Folder path '{}' is {}", path, current);
        Ok(current)
    }

    /// First folder of `path` that does not exist, or `None` if all do
    pub fn verify_path(&self, project_id: &str, path: &str) -> Result<Option<String>> {
        let root = self.root_folder(project_id)?;
        let mut current = root.id.clone();

        for segment in Self::relative_segments(&root, path) {
            match TitleResolver::FOLDER.resolve_id(self.session, &current, segment)? {
                Some(id) => current = id,
                None => return Ok(Some(segment.to_string())),
            }
        }
        Ok(None)
    }

    /// Server path of a folder, for building browser links
    pub fn folder_path(&self, folder_id: &str) -> Result<String> {
        self.session.validate()?;
        let reply = self
            .session
            .lookup(Subsystem::Document, "getDocumentFolderData", vec![text(folder_id)])?;
        let data: FolderData = decode("getDocumentFolderData", reply)?;
        Ok(data.path)
    }

    /// Documents in a folder, in server order
    pub fn list_documents(&self, folder_id: &str) -> Result<Vec<DocumentRow>> {
        self.session.validate()?;
        self.session
            .lookup_rows(Subsystem::Document, "getDocumentList", vec![text(folder_id)])
    }

    /// Id of the newest document titled `title` in a folder
    ///
    /// Among same-titled documents the one with the latest version date
    /// wins; equal dates keep server order.
    pub fn find_document_id(&self, folder_id: &str, title: &str) -> Result<Option<String>> {
        self.session.validate()?;
        if title.is_empty() {
            return Ok(None);
        }
        let matches = self
            .list_documents(folder_id)?
            .into_iter()
            .filter(|doc| doc.title == title);
        Ok(latest_by(matches, |doc| doc.date_version_created).map(|doc| doc.id))
    }

    /// Create a document from an uploaded file
    pub fn create_document(&self, folder_id: &str, doc: &NewDocument) -> Result<DocumentRow> {
        let reply = self.session.invoke(
            Subsystem::Document,
            "createDocument",
            vec![
                text(folder_id),
                text(&doc.title),
                text(&doc.description),
                Value::Null,
                text(&doc.status),
                Value::Bool(false),
                text(&doc.file_name),
                text(&doc.mime_type),
                text(&doc.file_id),
                Value::Null,
                Value::Null,
            ],
        )?;
        info!("Created document '{}' in {}", doc.title, folder_id);
        decode("createDocument", reply)
    }

    /// Add a new version to a document from an uploaded file
    pub fn update_document(&self, document_id: &str, file_id: &str) -> Result<()> {
        self.session.invoke(
            Subsystem::Document,
            "updateDocument",
            vec![text(document_id), text(file_id)],
        )?;
        info!("Updated document {} with file {}", document_id, file_id);
        Ok(())
    }
}
