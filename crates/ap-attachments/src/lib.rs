//! # ap-attachments
//!
//! Attachment lifecycle for a business record.
//!
//! ## Features
//!
//! - Transfer codec: base64 encoding of uploads, decoding of stored bodies
//! - Validation gate: extension allow-list and size limit per file
//! - Repository over `annotation` records of the Web API
//! - Lifecycle controller that owns the collection and publishes views
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ap_attachments::{AnnotationRepository, FileUpload, LifecycleController};
//! use ap_core::{ControlConfig, RecordRef};
//!
//! let controller = Arc::new(LifecycleController::new(
//!     Arc::new(AnnotationRepository::new()),
//!     Arc::new(RecordRef::new("account", account_id)),
//!     presenter,
//!     api,
//!     &ControlConfig::default(),
//! ));
//! controller.spawn_init().await?;
//!
//! let report = controller
//!     .upload(vec![FileUpload::from_path("contract.pdf").await?])
//!     .await;
//! ```

pub mod codec;
pub mod controller;
pub mod error;
pub mod model;
pub mod presentation;
pub mod repository;
pub mod save;
pub mod validation;

pub use codec::{CodecError, CodecResult, DecodedBlob};
pub use controller::{FailedUpload, LifecycleController, UploadReport};
pub use error::{AttachmentError, AttachmentResult, DownloadFailure, UploadFailure};
pub use model::{
    file_extension, Attachment, FileContent, FileUpload, ServiceContext, ATTACHMENT_ENTITY,
    ATTACHMENT_FIELDS,
};
pub use presentation::{
    AttachmentView, ContextSource, Notification, NotificationLevel, Phase, Presenter,
    PreviewContent, ViewSettings, PREVIEW_UNAVAILABLE,
};
pub use repository::{AnnotationRepository, AttachmentRepository};
pub use save::{DirectorySink, DownloadBlob, DownloadSink, MemorySink};
pub use validation::{Rejection, RejectionReason, UploadPolicy, ValidationReport};
