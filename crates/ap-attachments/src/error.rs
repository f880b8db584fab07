//! Attachment errors

use ap_webapi::WebApiError;
use thiserror::Error;

use crate::codec::CodecError;

/// Repository errors
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Failed to retrieve attachments: {0}")]
    Retrieval(#[source] WebApiError),
    #[error("Failed to upload {file_name}: {source}")]
    Upload {
        file_name: String,
        #[source]
        source: UploadFailure,
    },
    #[error("Failed to delete attachment {id}: {source}")]
    Delete {
        id: String,
        #[source]
        source: WebApiError,
    },
    #[error("Failed to download {file_name}: {source}")]
    Download {
        file_name: String,
        #[source]
        source: DownloadFailure,
    },
    #[error("Record context is incomplete")]
    IncompleteContext,
}

/// Step of an upload that failed
#[derive(Debug, Error)]
pub enum UploadFailure {
    #[error("{0}")]
    Read(#[from] CodecError),
    #[error("{0}")]
    Create(#[source] WebApiError),
    /// The record exists on the server but could not be read back
    #[error("created record {id} could not be read back: {source}")]
    Lookup {
        id: String,
        #[source]
        source: WebApiError,
    },
}

/// Step of a download that failed
#[derive(Debug, Error)]
pub enum DownloadFailure {
    #[error("{0}")]
    Decode(#[from] CodecError),
    #[error("could not save file: {0}")]
    Save(#[from] std::io::Error),
}

pub type AttachmentResult<T> = Result<T, AttachmentError>;

impl AttachmentError {
    /// Id of a record left behind by a failed upload
    pub fn orphaned_id(&self) -> Option<&str> {
        match self {
            Self::Upload {
                source: UploadFailure::Lookup { id, .. },
                ..
            } => Some(id),
            _ => None,
        }
    }
}
