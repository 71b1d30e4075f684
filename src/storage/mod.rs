// src/storage/mod.rs

//! File storage: getting local files onto the server
//!
//! Files up to the single-shot limit go up in one `FileStorageApp.uploadFile`
//! call; anything larger is streamed through the [`ChunkedUpload`] pipeline of
//! `SimpleFileStorageApp`. Either way the result is a file id that other
//! services (releases, documents, artifacts) can attach.

mod upload;

pub use upload::{ChunkedUpload, UploadHandle, UploadState, read_block};

use crate::config::{DEFAULT_CHUNK_SIZE, DEFAULT_SINGLE_SHOT_LIMIT, UploadSection};
use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use crate::session::{Session, Subsystem, decode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// MIME type for a file name, from its extension
///
/// Build logs (`.log`) are plain text; unknown extensions are
/// `application/octet-stream`.
pub fn mime_type_for(path: &Path) -> String {
    if path.extension().is_some_and(|ext| ext == "log") {
        return "text/plain".to_string();
    }
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Upload entry point on a session
pub struct FileStorage<'a> {
    session: &'a Session,
    chunk_size: usize,
    single_shot_limit: u64,
}

impl<'a> FileStorage<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            chunk_size: DEFAULT_CHUNK_SIZE,
            single_shot_limit: DEFAULT_SINGLE_SHOT_LIMIT,
        }
    }

    pub fn with_settings(session: &'a Session, settings: &UploadSection) -> Self {
        Self {
            session,
            chunk_size: settings.chunk_size,
            single_shot_limit: settings.single_shot_limit,
        }
    }

    /// Upload a local file; returns the stored file id
    pub fn upload_file(&self, path: &Path, progress: &dyn ProgressTracker) -> Result<String> {
        self.session.validate()?;
        let size = std::fs::metadata(path)
            .map_err(|e| Error::UploadFailed {
                upload_id: None,
                bytes_written: 0,
                message: format!("cannot read {}: {}", path.display(), e),
            })?
            .len();

        if size > self.single_shot_limit {
            debug!("{} is {} bytes, using chunked upload", path.display(), size);
            return ChunkedUpload::with_chunk_size(self.session, self.chunk_size).upload_path(path, progress);
        }
        self.upload_single_shot(path, size, progress)
    }

    fn upload_single_shot(&self, path: &Path, size: u64, progress: &dyn ProgressTracker) -> Result<String> {
        let failed = |message: String| Error::UploadFailed {
            upload_id: None,
            bytes_written: 0,
            message,
        };

        progress.set_length(size);
        let content = std::fs::read(path).map_err(|e| failed(format!("cannot read {}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file_id = self
            .session
            .invoke(
                Subsystem::FileStorage,
                "uploadFile",
                vec![Value::String(name), Value::String(STANDARD.encode(&content))],
            )
            .and_then(|reply| decode::<String>("uploadFile", reply))
            .map_err(|e| {
                progress.finish_with_error(&e.to_string());
                failed(e.to_string())
            })?;

        progress.increment(content.len() as u64);
        progress.finish_with_message("uploaded");
        info!("Uploaded {} ({} bytes)", path.display(), content.len());
        Ok(file_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("build.log")), "text/plain");
        assert_eq!(mime_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_type_for(Path::new("report.html")), "text/html");
        assert_eq!(mime_type_for(Path::new("app.bin")), "application/octet-stream");
        assert_eq!(mime_type_for(Path::new("README")), "application/octet-stream");
    }
}
