//! Stage inputs: pasted text, an uploaded file, or both.

use std::fmt;
use std::path::Path;

use tracing::warn;

use crate::error::UploadError;

/// An uploaded file held in memory, like a browser `File` handle.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl FileUpload {
    /// Creates an upload, guessing the content type from the file name.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            bytes: bytes.into(),
            content_type,
        }
    }

    /// Reads a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| UploadError::MissingFileName(path.to_path_buf()))?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::ReadFile {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self::new(name, bytes))
    }

    /// Lowercased extension including the dot, e.g. `.pdf`.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
    }

    /// Whether the upload matches an advisory accept list. An empty list
    /// accepts everything.
    pub fn matches_accept(&self, accept: &[String]) -> bool {
        if accept.is_empty() {
            return true;
        }
        match self.extension() {
            Some(ext) => accept.iter().any(|a| a.eq_ignore_ascii_case(&ext)),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// File contents can be large; keep them out of debug output and logs.
impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// The single canonical value sent to a transform endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    File(FileUpload),
}

/// One stage's input. Both fields may be set at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSource {
    pub pasted_text: String,
    pub file: Option<FileUpload>,
}

impl InputSource {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            pasted_text: text.into(),
            file: None,
        }
    }

    pub fn with_file(mut self, file: FileUpload) -> Self {
        self.file = Some(file);
        self
    }

    /// Derives the canonical payload. A present file always wins over pasted
    /// text; otherwise the pasted text is sent as-is, even when empty.
    pub fn resolve_payload(&self) -> Payload {
        match &self.file {
            Some(file) => Payload::File(file.clone()),
            None => Payload::Text(self.pasted_text.clone()),
        }
    }

    /// Attaches a file, logging a warning when it falls outside the advisory
    /// accept list. The file is attached either way.
    pub fn attach(&mut self, file: FileUpload, accept: &[String]) {
        if !file.matches_accept(accept) {
            warn!(
                file = %file.name,
                accept = %accept.join(","),
                "Attached file does not match the suggested types"
            );
        }
        self.file = Some(file);
    }

    pub fn detach(&mut self) -> Option<FileUpload> {
        self.file.take()
    }
}
