//! Lifecycle Controller
//!
//! Owns the attachment collection of the current record and drives the
//! repository in response to user actions. Every action ends by publishing
//! a fresh [`AttachmentView`] to the presenter.
//!
//! Actions are serialized: an action waits for the one in progress before
//! it starts. The collection lock is never held across a repository call.

use std::sync::Arc;

use ap_core::ControlConfig;
use ap_webapi::WebApi;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::AttachmentError;
use crate::model::{Attachment, FileUpload, ServiceContext};
use crate::presentation::{
    AttachmentView, ContextSource, Notification, Phase, Presenter, PreviewContent, ViewSettings,
};
use crate::repository::AttachmentRepository;
use crate::save::DownloadSink;
use crate::validation::{Rejection, UploadPolicy};

pub const MSG_LOAD_FAILED: &str = "Failed to load attachments";
pub const MSG_UPLOAD_FAILED: &str = "Upload failed";
pub const MSG_DELETED: &str = "Deleted successfully";
pub const MSG_DELETE_FAILED: &str = "Delete failed";
pub const MSG_DOWNLOAD_FAILED: &str = "Download failed";
pub const MSG_NO_RECORD: &str = "No record is selected";

/// The upload that stopped a batch
#[derive(Debug)]
pub struct FailedUpload {
    pub file: FileUpload,
    pub error: AttachmentError,
}

/// Outcome of an upload batch
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Committed uploads, in upload order
    pub uploaded: Vec<Attachment>,
    /// Files turned away by validation
    pub rejected: Vec<Rejection>,
    /// First failure; it aborted the rest of the batch
    pub failed: Option<FailedUpload>,
    /// Accepted files skipped after the failure
    pub not_attempted: Vec<FileUpload>,
}

impl UploadReport {
    /// True when something was committed and nothing failed
    ///
    /// Rejected files do not count against the batch, the same as for the
    /// success notification.
    pub fn is_success(&self) -> bool {
        self.failed.is_none() && !self.uploaded.is_empty()
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    attachments: Vec<Attachment>,
    phase: Phase,
    notifications: Vec<Notification>,
}

/// Attachment lifecycle for one hosted control
pub struct LifecycleController<R, C, P>
where
    R: AttachmentRepository,
    C: ContextSource,
    P: Presenter,
{
    repository: Arc<R>,
    context: Arc<C>,
    presenter: Arc<P>,
    api: Arc<dyn WebApi>,
    policy: UploadPolicy,
    settings: ViewSettings,
    state: RwLock<ControllerState>,
    operation: Mutex<()>,
}

impl<R, C, P> LifecycleController<R, C, P>
where
    R: AttachmentRepository,
    C: ContextSource,
    P: Presenter,
{
    pub fn new(
        repository: Arc<R>,
        context: Arc<C>,
        presenter: Arc<P>,
        api: Arc<dyn WebApi>,
        config: &ControlConfig,
    ) -> Self {
        let policy = UploadPolicy::from_config(config);
        let settings = ViewSettings::new(&policy, config.show_preview);
        Self {
            repository,
            context,
            presenter,
            api,
            policy,
            settings,
            state: RwLock::new(ControllerState::default()),
            operation: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    /// Context for one operation, rebuilt from the host each time
    fn service_context(&self) -> ServiceContext {
        ServiceContext::new(self.context.record_ref(), self.api.clone())
    }

    /// First load of the collection
    pub async fn init(&self) {
        info!("Initializing attachment controller");
        let _guard = self.operation.lock().await;
        self.load().await;
    }

    /// Reload the collection unconditionally
    pub async fn refresh(&self) {
        let _guard = self.operation.lock().await;
        self.load().await;
    }

    #[instrument(skip(self))]
    async fn load(&self) {
        let ctx = self.service_context();

        if !ctx.is_complete() {
            warn!(record = %ctx.record, "Record context incomplete, skipping attachment fetch");
            {
                let mut state = self.state.write().await;
                state.attachments.clear();
                state.notifications.clear();
                state.phase = Phase::Ready;
            }
            self.publish().await;
            return;
        }

        {
            let mut state = self.state.write().await;
            state.notifications.clear();
            state.phase = Phase::Loading;
        }
        self.publish().await;

        let result = self.repository.list(&ctx).await;
        {
            let mut state = self.state.write().await;
            match result {
                Ok(attachments) => {
                    debug!(count = attachments.len(), "Attachments loaded");
                    state.attachments = attachments;
                    state.phase = Phase::Ready;
                }
                Err(e) => {
                    error!(error = %e, "Failed to load attachments");
                    state.attachments.clear();
                    state.phase = Phase::Error;
                    state.notifications.push(Notification::error(MSG_LOAD_FAILED));
                }
            }
        }
        self.publish().await;
    }

    /// Validate a batch, then upload the accepted files one at a time
    ///
    /// Each committed upload is prepended to the collection. The first
    /// failure stops the batch; uploads before it stay committed.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub async fn upload(&self, files: Vec<FileUpload>) -> UploadReport {
        let _guard = self.operation.lock().await;

        let validation = self.policy.partition(files);
        let mut report = UploadReport {
            rejected: validation.rejected,
            ..Default::default()
        };

        {
            let mut state = self.state.write().await;
            state.notifications.clear();
            for rejection in &report.rejected {
                warn!(file_name = %rejection.file.name, reason = ?rejection.reason, "Upload rejected");
                state.notifications.push(Notification::error(rejection.message()));
            }
        }

        if validation.accepted.is_empty() {
            self.publish().await;
            return report;
        }

        let ctx = self.service_context();
        if !ctx.is_complete() {
            warn!(record = %ctx.record, "Cannot upload without a record");
            self.notify(Notification::warning(MSG_NO_RECORD)).await;
            report.not_attempted = validation.accepted;
            self.publish().await;
            return report;
        }

        let mut pending = validation.accepted.into_iter();
        while let Some(file) = pending.next() {
            match self.repository.upload(&ctx, &file, None).await {
                Ok(attachment) => {
                    self.state
                        .write()
                        .await
                        .attachments
                        .insert(0, attachment.clone());
                    report.uploaded.push(attachment);
                    self.publish().await;
                }
                Err(e) => {
                    error!(file_name = %file.name, error = %e, "Upload failed, aborting batch");
                    report.failed = Some(FailedUpload { file, error: e });
                    report.not_attempted = pending.collect();
                    break;
                }
            }
        }

        let outcome = if report.failed.is_some() {
            Notification::error(MSG_UPLOAD_FAILED)
        } else {
            Notification::success(format!(
                "Uploaded {} file(s) successfully",
                report.uploaded.len()
            ))
        };
        self.notify(outcome).await;
        self.publish().await;

        report
    }

    /// Delete an attachment; the collection only changes on success
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> bool {
        let _guard = self.operation.lock().await;
        self.state.write().await.notifications.clear();

        let ctx = self.service_context();
        if !ctx.is_complete() {
            warn!(record = %ctx.record, "Cannot delete without a record");
            self.notify(Notification::warning(MSG_NO_RECORD)).await;
            self.publish().await;
            return false;
        }

        let deleted = match self.repository.delete(&ctx, id).await {
            Ok(()) => {
                let mut state = self.state.write().await;
                state.attachments.retain(|a| a.id != id);
                state.notifications.push(Notification::success(MSG_DELETED));
                true
            }
            Err(e) => {
                error!(error = %e, "Delete failed");
                self.notify(Notification::error(MSG_DELETE_FAILED)).await;
                false
            }
        };

        self.publish().await;
        deleted
    }

    /// Hand an attachment's content to a save flow
    #[instrument(skip(self, attachment, sink), fields(id = %attachment.id))]
    pub async fn download(&self, attachment: &Attachment, sink: &dyn DownloadSink) -> bool {
        let _guard = self.operation.lock().await;
        self.state.write().await.notifications.clear();

        let saved = match self.repository.download(attachment, sink).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Download failed");
                self.notify(Notification::error(MSG_DOWNLOAD_FAILED)).await;
                false
            }
        };

        self.publish().await;
        saved
    }

    /// Inline preview, or `None` when previews are turned off
    pub fn preview(&self, attachment: &Attachment) -> Option<PreviewContent> {
        if !self.settings.show_preview {
            debug!(id = %attachment.id, "Preview disabled");
            return None;
        }
        Some(PreviewContent::for_attachment(attachment))
    }

    /// Look up an attachment in the current collection
    pub async fn find(&self, id: &str) -> Option<Attachment> {
        self.state
            .read()
            .await
            .attachments
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    /// Current view
    pub async fn view(&self) -> AttachmentView {
        let state = self.state.read().await;
        AttachmentView {
            attachments: state.attachments.clone(),
            is_loading: state.phase == Phase::Loading,
            phase: state.phase,
            notifications: state.notifications.clone(),
            settings: self.settings.clone(),
        }
    }

    /// Clear notifications and republish
    pub async fn dismiss_notifications(&self) {
        self.state.write().await.notifications.clear();
        self.publish().await;
    }

    async fn notify(&self, notification: Notification) {
        self.state.write().await.notifications.push(notification);
    }

    async fn publish(&self) {
        let view = self.view().await;
        self.presenter.render(&view);
    }
}

impl<R, C, P> LifecycleController<R, C, P>
where
    R: AttachmentRepository + 'static,
    C: ContextSource + 'static,
    P: Presenter + 'static,
{
    /// Run [`init`](Self::init) as a background task
    pub fn spawn_init(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.init().await })
    }
}
