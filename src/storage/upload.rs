// src/storage/upload.rs

//! Chunked upload pipeline
//!
//! The remote write primitive stores exactly the bytes it is given and has no
//! notion of a buffer length, so files are read in fixed-size blocks and only
//! the filled part of a block is ever sent. A short final block goes out at
//! its real size.
//!
//! ```text
//! NotStarted --start--> InProgress --end--> Completed
//!      \                 |  ^  |
//!       \                |  +--+ write_chunk
//!        +---------------+--------> Failed
//! ```
//!
//! Completed and Failed are terminal. Misuse (writing before `start`, after
//! `end` or after a failure) is rejected locally without a remote call.
//! Nothing is resumed or cleaned up remotely after a failure.

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use crate::session::{Session, Subsystem, decode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Lifecycle of one chunked upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

/// Server-side upload in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHandle {
    /// Id returned by `startFileUpload`; after `end` it is the stored file id
    pub upload_id: String,
    pub bytes_written: u64,
}

/// Single-writer chunked upload bound to a session
///
/// Every transition takes `&mut self`, so one handle cannot be written from
/// two places at once. Use one `ChunkedUpload` per file.
pub struct ChunkedUpload<'a> {
    session: &'a Session,
    chunk_size: usize,
    state: UploadState,
    handle: Option<UploadHandle>,
}

impl<'a> ChunkedUpload<'a> {
    /// Pipeline with 1 MiB blocks
    pub fn new(session: &'a Session) -> Self {
        Self::with_chunk_size(session, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(session: &'a Session, chunk_size: usize) -> Self {
        Self {
            session,
            chunk_size: chunk_size.max(1),
            state: UploadState::NotStarted,
            handle: None,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn handle(&self) -> Option<&UploadHandle> {
        self.handle.as_ref()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn bytes_written(&self) -> u64 {
        self.handle.as_ref().map_or(0, |h| h.bytes_written)
    }

    /// Error for the current partial state, without changing state
    fn error(&self, message: impl Into<String>) -> Error {
        Error::UploadFailed {
            upload_id: self.handle.as_ref().map(|h| h.upload_id.clone()),
            bytes_written: self.bytes_written(),
            message: message.into(),
        }
    }

    /// Move to Failed and describe what was uploaded so far
    fn fail(&mut self, message: impl Into<String>) -> Error {
        self.state = UploadState::Failed;
        let err = self.error(message);
        warn!("{}", err);
        err
    }

    fn expect_state(&self, expected: UploadState, action: &str) -> Result<()> {
        if self.state == expected {
            return Ok(());
        }
        Err(self.error(format!("cannot {} in state {:?}", action, self.state)))
    }

    /// Open a server-side upload
    pub fn start(&mut self) -> Result<&UploadHandle> {
        self.expect_state(UploadState::NotStarted, "start")?;

        let upload_id: String = match self
            .session
            .invoke(Subsystem::SimpleFileStorage, "startFileUpload", Vec::new())
            .and_then(|reply| decode("startFileUpload", reply))
        {
            Ok(id) => id,
            Err(e) => return Err(self.fail(e.to_string())),
        };

        debug!("Started upload {}", upload_id);
        self.state = UploadState::InProgress;
        Ok(self.handle.insert(UploadHandle {
            upload_id,
            bytes_written: 0,
        }))
    }

    /// Append bytes to the upload
    ///
    /// The server stores exactly `bytes`; pass only filled data.
    pub fn write_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        self.expect_state(UploadState::InProgress, "write")?;
        let Some(upload_id) = self.handle.as_ref().map(|h| h.upload_id.clone()) else {
            return Err(self.fail("upload handle missing"));
        };

        let encoded = STANDARD.encode(bytes);
        if let Err(e) = self.session.invoke(
            Subsystem::SimpleFileStorage,
            "write",
            vec![Value::String(upload_id), Value::String(encoded)],
        ) {
            return Err(self.fail(e.to_string()));
        }

        if let Some(handle) = self.handle.as_mut() {
            handle.bytes_written += bytes.len() as u64;
        }
        Ok(())
    }

    /// Finish the upload; returns the stored file id
    pub fn end(&mut self) -> Result<String> {
        self.expect_state(UploadState::InProgress, "end")?;
        let Some(upload_id) = self.handle.as_ref().map(|h| h.upload_id.clone()) else {
            return Err(self.fail("upload handle missing"));
        };

        if let Err(e) = self.session.invoke(
            Subsystem::SimpleFileStorage,
            "endFileUpload",
            vec![Value::String(upload_id.clone())],
        ) {
            return Err(self.fail(e.to_string()));
        }

        self.state = UploadState::Completed;
        debug!("Completed upload {} ({} bytes)", upload_id, self.bytes_written());
        Ok(upload_id)
    }

    /// Stream a reader to the server in blocks; returns the stored file id
    pub fn upload_reader<R: Read>(&mut self, reader: &mut R, progress: &dyn ProgressTracker) -> Result<String> {
        if self.state == UploadState::NotStarted {
            self.start()?;
        }

        let mut block = vec![0u8; self.chunk_size];
        loop {
            let filled = match read_block(reader, &mut block) {
                Ok(n) => n,
                Err(e) => {
                    let err = self.fail(format!("read failed: {e}"));
                    progress.finish_with_error(&err.to_string());
                    return Err(err);
                }
            };
            if filled == 0 {
                break;
            }

            // Only the filled prefix goes on the wire
            if let Err(e) = self.write_chunk(&block[..filled]) {
                progress.finish_with_error(&e.to_string());
                return Err(e);
            }
            progress.increment(filled as u64);

            if filled < block.len() {
                break;
            }
        }

        match self.end() {
            Ok(file_id) => {
                progress.finish_with_message("uploaded");
                Ok(file_id)
            }
            Err(e) => {
                progress.finish_with_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Upload a local file; returns the stored file id
    pub fn upload_path(&mut self, path: &Path, progress: &dyn ProgressTracker) -> Result<String> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) => return Err(self.fail(format!("cannot open {}: {}", path.display(), e))),
        };
        if let Ok(meta) = file.metadata() {
            progress.set_length(meta.len());
        }

        let file_id = self.upload_reader(&mut file, progress)?;
        info!("Uploaded {} ({} bytes)", path.display(), self.bytes_written());
        Ok(file_id)
    }
}

/// Fill `buf` from `reader` unless the input ends first
///
/// Returns the number of bytes read; less than `buf.len()` only at end of
/// input.
pub fn read_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
