//! Attachment Model
//!
//! An attachment is a note record (`annotation`) flagged as a document and
//! owned by a business record.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ap_core::{format_file_size, RecordRef};
use ap_webapi::{Record, WebApi, FORMATTED_VALUE_SUFFIX};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entity holding attachments
pub const ATTACHMENT_ENTITY: &str = "annotation";

/// Fields read on every list query and point lookup
pub const ATTACHMENT_FIELDS: &[&str] = &[
    "annotationid",
    "subject",
    "notetext",
    "filename",
    "filesize",
    "mimetype",
    "documentbody",
    "createdon",
    "_createdby_value",
    "isdocument",
    "_objectid_value",
    "objecttypecode",
];

/// A stored attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Server-assigned identifier
    pub id: String,
    /// Display title
    pub subject: String,
    /// Free-form description
    pub note_text: String,
    /// Original filename
    pub file_name: String,
    /// File size in bytes
    pub file_size: u64,
    /// MIME content type
    pub mime_type: String,
    /// Base64-encoded content
    pub document_body: String,
    /// Creation timestamp; absent when the server sent none
    pub created_on: Option<DateTime<Utc>>,
    /// Display name of the creator
    pub created_by: String,
    pub is_document: bool,
    /// Owning record id
    pub object_id: String,
    /// Owning record type code
    pub object_type_code: i64,
}

impl Attachment {
    /// Map a raw annotation record, filling defaults for absent fields
    pub fn from_record(record: &Record) -> Self {
        let file_name = str_field(record, "filename");
        let subject = str_field(record, "subject")
            .or(file_name)
            .unwrap_or("Untitled");

        Self {
            id: str_field(record, "annotationid").unwrap_or_default().to_string(),
            subject: subject.to_string(),
            note_text: str_field(record, "notetext").unwrap_or_default().to_string(),
            file_name: file_name.unwrap_or_default().to_string(),
            file_size: size_field(record.get("filesize")),
            mime_type: str_field(record, "mimetype").unwrap_or_default().to_string(),
            document_body: str_field(record, "documentbody")
                .unwrap_or_default()
                .to_string(),
            created_on: str_field(record, "createdon").and_then(parse_timestamp),
            created_by: str_field(
                record,
                &format!("_createdby_value{}", FORMATTED_VALUE_SUFFIX),
            )
            .unwrap_or("Unknown")
            .to_string(),
            is_document: record
                .get("isdocument")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            object_id: str_field(record, "_objectid_value")
                .unwrap_or_default()
                .to_string(),
            object_type_code: type_code_field(record.get("objecttypecode")),
        }
    }

    /// Check if this is an image
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Check if this is a PDF
    pub fn is_pdf(&self) -> bool {
        self.mime_type.contains("pdf")
    }

    /// Get file extension
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.file_name)
    }

    /// Human-readable file size
    pub fn human_filesize(&self) -> String {
        format_file_size(self.file_size)
    }

    /// `data:` URI embedding the stored body
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.document_body)
    }
}

/// Lowercased text after the last `.`; `None` without a dot or when empty
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

fn str_field<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn size_field(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// Type codes arrive as numbers or numeric strings; anything else is 0
fn type_code_field(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Per-operation binding of the owning record and the API handle
#[derive(Clone)]
pub struct ServiceContext {
    pub record: RecordRef,
    pub api: Arc<dyn WebApi>,
}

impl ServiceContext {
    pub fn new(record: RecordRef, api: Arc<dyn WebApi>) -> Self {
        Self { record, api }
    }

    pub fn is_complete(&self) -> bool {
        self.record.is_complete()
    }

    pub fn record_id(&self) -> &str {
        &self.record.record_id
    }

    pub fn entity_name(&self) -> &str {
        &self.record.entity_name
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("record", &self.record)
            .field("api", &self.api.name())
            .finish()
    }
}

/// Where the bytes of an upload come from
#[derive(Debug, Clone)]
pub enum FileContent {
    /// Already in memory
    Bytes(Bytes),
    /// Read from disk when the upload is encoded
    Path(PathBuf),
}

/// A candidate file for upload
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// File name including extension
    pub name: String,
    /// MIME content type
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
    pub content: FileContent,
    /// Explicit title; the file name is used otherwise
    pub subject: Option<String>,
}

impl FileUpload {
    /// Upload from in-memory bytes; the MIME type is guessed from the name
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let data = data.into();
        Self {
            mime_type: guess_mime_type(&name),
            size: data.len() as u64,
            content: FileContent::Bytes(data),
            subject: None,
            name,
        }
    }

    /// Upload from a file on disk; size comes from the file metadata
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("not a file path: {}", path.display()),
                )
            })?;

        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }

        Ok(Self {
            mime_type: guess_mime_type(&name),
            size: metadata.len(),
            content: FileContent::Path(path.to_path_buf()),
            subject: None,
            name,
        })
    }

    /// Set the display title
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Get file extension
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.name)
    }
}

fn guess_mime_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .to_string()
}
