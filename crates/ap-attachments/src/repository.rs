//! Attachment Repository
//!
//! Remote-backed CRUD over annotation records. Builds the list query, the
//! create payload bound to the owning record, and maps raw records into
//! [`Attachment`]s. Holds no state of its own.

use async_trait::async_trait;
use ap_queries::{Filter, FilterValue, QueryOptions, SortCriterion};
use ap_webapi::{entity_set_name, Record};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::error::{AttachmentError, AttachmentResult, DownloadFailure, UploadFailure};
use crate::model::{Attachment, FileUpload, ServiceContext, ATTACHMENT_ENTITY, ATTACHMENT_FIELDS};
use crate::save::{DownloadBlob, DownloadSink};

/// Attachment persistence
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// Attachments of the context record, newest first
    async fn list(&self, ctx: &ServiceContext) -> AttachmentResult<Vec<Attachment>>;

    /// Upload one file and return the stored attachment
    async fn upload(
        &self,
        ctx: &ServiceContext,
        file: &FileUpload,
        subject: Option<&str>,
    ) -> AttachmentResult<Attachment>;

    /// Delete one attachment by id
    async fn delete(&self, ctx: &ServiceContext, id: &str) -> AttachmentResult<()>;

    /// Decode the stored body and hand it to the save flow
    async fn download(
        &self,
        attachment: &Attachment,
        sink: &dyn DownloadSink,
    ) -> AttachmentResult<()>;
}

/// Repository over `annotation` records
#[derive(Debug, Clone, Default)]
pub struct AnnotationRepository;

impl AnnotationRepository {
    pub fn new() -> Self {
        Self
    }

    /// Query for the documents attached to a record
    pub fn list_query(record_id: &str) -> QueryOptions {
        QueryOptions::new()
            .select(ATTACHMENT_FIELDS.iter().copied())
            .filter(Filter::equals("_objectid_value", FilterValue::from(record_id)))
            .filter(Filter::equals("isdocument", FilterValue::from(true)))
            .order_by(SortCriterion::desc("createdon"))
    }

    /// Projection used for the lookup after a create
    pub fn lookup_query() -> QueryOptions {
        QueryOptions::new().select(ATTACHMENT_FIELDS.iter().copied())
    }

    /// Create payload for an upload, bound to the context record
    pub fn create_payload(
        ctx: &ServiceContext,
        file: &FileUpload,
        subject: Option<&str>,
        document_body: String,
    ) -> Record {
        let subject = subject
            .or(file.subject.as_deref())
            .unwrap_or(&file.name);

        let mut record = Record::new();
        record.insert("subject".into(), Value::from(subject));
        record.insert(
            "notetext".into(),
            Value::from(format!("Uploaded file: {}", file.name)),
        );
        record.insert("filename".into(), Value::from(file.name.as_str()));
        record.insert("mimetype".into(), Value::from(file.mime_type.as_str()));
        record.insert("documentbody".into(), Value::from(document_body));
        record.insert("isdocument".into(), Value::Bool(true));
        record.insert(
            format!("objectid_{}@odata.bind", ctx.entity_name()),
            Value::from(format!(
                "/{}({})",
                entity_set_name(ctx.entity_name()),
                ctx.record_id()
            )),
        );
        record
    }
}

#[async_trait]
impl AttachmentRepository for AnnotationRepository {
    #[instrument(skip(self, ctx), fields(record = %ctx.record, webapi = ctx.api.name()))]
    async fn list(&self, ctx: &ServiceContext) -> AttachmentResult<Vec<Attachment>> {
        if !ctx.is_complete() {
            return Err(AttachmentError::IncompleteContext);
        }

        let records = ctx
            .api
            .retrieve_multiple(ATTACHMENT_ENTITY, &Self::list_query(ctx.record_id()))
            .await
            .map_err(|e| {
                warn!(error = %e, "Attachment query failed");
                AttachmentError::Retrieval(e)
            })?;

        let attachments: Vec<Attachment> = records.iter().map(Attachment::from_record).collect();
        debug!(count = attachments.len(), "Attachments retrieved");
        Ok(attachments)
    }

    #[instrument(
        skip(self, ctx, file),
        fields(record = %ctx.record, file_name = %file.name, size = file.size)
    )]
    async fn upload(
        &self,
        ctx: &ServiceContext,
        file: &FileUpload,
        subject: Option<&str>,
    ) -> AttachmentResult<Attachment> {
        if !ctx.is_complete() {
            return Err(AttachmentError::IncompleteContext);
        }

        let upload_error = |source: UploadFailure| AttachmentError::Upload {
            file_name: file.name.clone(),
            source,
        };

        let body = codec::encode_upload(file)
            .await
            .map_err(|e| upload_error(UploadFailure::Read(e)))?;

        let payload = Self::create_payload(ctx, file, subject, body);
        let created = ctx
            .api
            .create(ATTACHMENT_ENTITY, payload)
            .await
            .map_err(|e| upload_error(UploadFailure::Create(e)))?;

        let record = match ctx
            .api
            .retrieve(ATTACHMENT_ENTITY, &created.id, &Self::lookup_query())
            .await
        {
            Ok(record) => record,
            Err(source) => {
                // The record was created; nothing removes it here
                warn!(id = %created.id, error = %source, "Created attachment could not be read back");
                return Err(upload_error(UploadFailure::Lookup {
                    id: created.id,
                    source,
                }));
            }
        };

        let attachment = Attachment::from_record(&record);
        info!(id = %attachment.id, "Attachment uploaded");
        Ok(attachment)
    }

    #[instrument(skip(self, ctx), fields(record = %ctx.record))]
    async fn delete(&self, ctx: &ServiceContext, id: &str) -> AttachmentResult<()> {
        ctx.api
            .delete(ATTACHMENT_ENTITY, id)
            .await
            .map_err(|source| AttachmentError::Delete {
                id: id.to_string(),
                source,
            })?;

        info!(id = %id, "Attachment deleted");
        Ok(())
    }

    #[instrument(skip(self, attachment, sink), fields(id = %attachment.id, file_name = %attachment.file_name))]
    async fn download(
        &self,
        attachment: &Attachment,
        sink: &dyn DownloadSink,
    ) -> AttachmentResult<()> {
        let download_error = |source: DownloadFailure| AttachmentError::Download {
            file_name: attachment.file_name.clone(),
            source,
        };

        let blob = codec::decode(&attachment.document_body, &attachment.mime_type)
            .map_err(|e| download_error(DownloadFailure::Decode(e)))?;

        let size = blob.bytes.len();
        sink.save(DownloadBlob {
            file_name: attachment.file_name.clone(),
            mime_type: blob.mime_type,
            bytes: blob.bytes,
        })
        .await
        .map_err(|e| download_error(DownloadFailure::Save(e)))?;

        debug!(size, "Attachment downloaded");
        Ok(())
    }
}
