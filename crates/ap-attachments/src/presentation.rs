//! Presentation contracts
//!
//! What the controller publishes to a host: the current view, transient
//! notifications, and preview content. Hosts implement [`Presenter`] and
//! [`ContextSource`].

use ap_core::{ControlConfig, RecordRef};
use serde::{Deserialize, Serialize};

use crate::model::Attachment;
use crate::validation::UploadPolicy;

/// Shown when an attachment cannot be previewed
pub const PREVIEW_UNAVAILABLE: &str = "Preview not available. Download to view.";

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Display-only; the next load leaves it
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
    Warning,
}

/// Transient message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }
}

/// Display settings derived from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub max_file_size_mb: u64,
    pub allowed_file_types: Vec<String>,
    pub show_preview: bool,
    /// File picker filter, e.g. `.pdf,.png`
    pub accept: String,
}

impl ViewSettings {
    pub fn new(policy: &UploadPolicy, show_preview: bool) -> Self {
        Self {
            max_file_size_mb: policy.max_file_size_mb(),
            allowed_file_types: policy.allowed_extensions().to_vec(),
            show_preview,
            accept: policy.accept_attribute(),
        }
    }

    pub fn from_config(config: &ControlConfig) -> Self {
        Self::new(&UploadPolicy::from_config(config), config.show_preview)
    }
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self::from_config(&ControlConfig::default())
    }
}

/// Snapshot republished after every transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentView {
    /// Newest first
    pub attachments: Vec<Attachment>,
    pub is_loading: bool,
    pub phase: Phase,
    /// Messages from the latest user action
    pub notifications: Vec<Notification>,
    pub settings: ViewSettings,
}

impl AttachmentView {
    pub fn new(settings: ViewSettings) -> Self {
        Self {
            attachments: Vec::new(),
            is_loading: false,
            phase: Phase::Idle,
            notifications: Vec::new(),
            settings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.notifications
            .iter()
            .any(|n| n.level == NotificationLevel::Error)
    }
}

/// Inline preview of an attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewContent {
    Image { data_uri: String },
    Pdf { data_uri: String },
    Unavailable,
}

impl PreviewContent {
    pub fn for_attachment(attachment: &Attachment) -> Self {
        if attachment.is_image() {
            Self::Image {
                data_uri: attachment.data_uri(),
            }
        } else if attachment.is_pdf() {
            Self::Pdf {
                data_uri: attachment.data_uri(),
            }
        } else {
            Self::Unavailable
        }
    }

    pub fn data_uri(&self) -> Option<&str> {
        match self {
            Self::Image { data_uri } | Self::Pdf { data_uri } => Some(data_uri),
            Self::Unavailable => None,
        }
    }
}

/// Receives every published view
#[cfg_attr(test, mockall::automock)]
pub trait Presenter: Send + Sync {
    fn render(&self, view: &AttachmentView);
}

/// Supplies the active record on every operation
#[cfg_attr(test, mockall::automock)]
pub trait ContextSource: Send + Sync {
    fn record_ref(&self) -> RecordRef;
}

impl ContextSource for RecordRef {
    fn record_ref(&self) -> RecordRef {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_webapi::Record;
    use serde_json::json;

    fn attachment(mime_type: &str) -> Attachment {
        let record: Record = json!({
            "annotationid": "a-1",
            "mimetype": mime_type,
            "documentbody": "AAAA"
        })
        .as_object()
        .cloned()
        .unwrap();
        Attachment::from_record(&record)
    }

    #[test]
    fn test_preview_kinds() {
        assert_eq!(
            PreviewContent::for_attachment(&attachment("image/jpeg")),
            PreviewContent::Image {
                data_uri: "data:image/jpeg;base64,AAAA".to_string()
            }
        );
        assert_eq!(
            PreviewContent::for_attachment(&attachment("application/pdf")),
            PreviewContent::Pdf {
                data_uri: "data:application/pdf;base64,AAAA".to_string()
            }
        );

        let other = PreviewContent::for_attachment(&attachment("text/plain"));
        assert_eq!(other, PreviewContent::Unavailable);
        assert_eq!(other.data_uri(), None);
    }

    #[test]
    fn test_settings_from_config() {
        let config = ControlConfig {
            max_file_size_mb: 5,
            allowed_file_types: "PDF, png".to_string(),
            show_preview: false,
        };
        let settings = ViewSettings::from_config(&config);

        assert_eq!(settings.max_file_size_mb, 5);
        assert_eq!(settings.allowed_file_types, vec!["pdf", "png"]);
        assert_eq!(settings.accept, ".pdf,.png");
        assert!(!settings.show_preview);
    }

    #[test]
    fn test_view_notifications() {
        let mut view = AttachmentView::new(ViewSettings::default());
        assert!(!view.has_error());
        assert_eq!(view.phase, Phase::Idle);

        view.notifications.push(Notification::warning("File type .exe is not allowed"));
        assert!(!view.has_error());

        view.notifications.push(Notification::error("Upload failed"));
        assert!(view.has_error());
    }

    #[test]
    fn test_record_ref_is_a_context_source() {
        let record = RecordRef::new("account", "acc-1");
        assert_eq!(record.record_ref(), record);
    }
}
