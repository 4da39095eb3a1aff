use crate::input::{FileUpload, Payload};
use crate::models::ModelId;

/// Field name carrying pasted text on the transform endpoints.
pub const PASTED_FIELD: &str = "pasted";
/// Field name carrying the uploaded file on the transform endpoints.
pub const FILE_FIELD: &str = "file";
pub const MODEL_FIELD: &str = "model";
pub const SUBMISSION_FIELD: &str = "submission";
pub const CHECKLIST_FIELD: &str = "checklist";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    File(FileUpload),
}

/// Ordered multipart fields. Absent values are never added, so they are
/// omitted from the request rather than sent empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    fields: Vec<(String, FieldValue)>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields
            .push((name.to_string(), FieldValue::Text(value.into())));
        self
    }

    pub fn optional_text(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.text(name, value),
            None => self,
        }
    }

    pub fn file(mut self, name: &str, file: FileUpload) -> Self {
        self.fields.push((name.to_string(), FieldValue::File(file)));
        self
    }

    pub fn optional_file(self, name: &str, file: Option<FileUpload>) -> Self {
        match file {
            Some(file) => self.file(name, file),
            None => self,
        }
    }

    /// Fields for a transform endpoint: `pasted` or `file` (never both) plus `model`.
    pub fn for_transform(payload: &Payload, model: &ModelId) -> Self {
        let (pasted, file) = match payload {
            Payload::Text(text) => (Some(text.clone()), None),
            Payload::File(upload) => (None, Some(upload.clone())),
        };
        Self::new()
            .optional_text(PASTED_FIELD, pasted)
            .text(MODEL_FIELD, model.as_str())
            .optional_file(FILE_FIELD, file)
    }

    /// Fields for the review endpoint. Text only; every field is always sent.
    pub fn for_review(submission: &str, checklist: &str, model: &ModelId) -> Self {
        Self::new()
            .text(SUBMISSION_FIELD, submission)
            .text(CHECKLIST_FIELD, checklist)
            .text(MODEL_FIELD, model.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn get_file(&self, name: &str) -> Option<&FileUpload> {
        match self.get(name) {
            Some(FieldValue::File(file)) => Some(file),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for FormFields {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
