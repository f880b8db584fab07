//! Terminal rendering of the attachment view

use std::sync::Mutex;

use ap_attachments::{
    Attachment, AttachmentView, Notification, NotificationLevel, Phase, Presenter,
};
use tracing::debug;

/// Keeps the latest published view for printing once the command is done
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    last: Mutex<Option<AttachmentView>>,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_view(&self) -> Option<AttachmentView> {
        self.last.lock().ok().and_then(|view| view.clone())
    }
}

impl Presenter for TerminalPresenter {
    fn render(&self, view: &AttachmentView) {
        debug!(
            phase = ?view.phase,
            attachments = view.attachments.len(),
            notifications = view.notifications.len(),
            "View published"
        );
        if let Ok(mut last) = self.last.lock() {
            *last = Some(view.clone());
        }
    }
}

pub fn format_notification(notification: &Notification) -> String {
    let tag = match notification.level {
        NotificationLevel::Success => "ok",
        NotificationLevel::Error => "error",
        NotificationLevel::Warning => "warning",
    };
    format!("[{}] {}", tag, notification.message)
}

fn format_created(attachment: &Attachment) -> String {
    attachment
        .created_on
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Attachment table with aligned columns
pub fn format_table(attachments: &[Attachment]) -> String {
    let headers = ["ID", "NAME", "SIZE", "CREATED", "CREATED BY"];
    let rows: Vec<[String; 5]> = attachments
        .iter()
        .map(|a| {
            [
                a.id.clone(),
                a.subject.clone(),
                a.human_filesize(),
                format_created(a),
                a.created_by.clone(),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(&headers.map(String::from)[..])];
    out.extend(rows.iter().map(|row| line(&row[..])));
    out.join("\n")
}

pub fn format_view(view: &AttachmentView) -> String {
    let mut out = Vec::new();

    match view.phase {
        Phase::Error => {}
        _ if view.is_empty() => out.push("No attachments.".to_string()),
        _ => out.push(format_table(&view.attachments)),
    }

    out.extend(view.notifications.iter().map(format_notification));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_attachments::ViewSettings;
    use ap_webapi::Record;
    use serde_json::json;

    fn attachment(value: serde_json::Value) -> Attachment {
        let record: Record = value.as_object().cloned().unwrap();
        Attachment::from_record(&record)
    }

    #[test]
    fn test_table_alignment() {
        let table = format_table(&[
            attachment(json!({
                "annotationid": "a-1",
                "subject": "Contract",
                "filesize": 1536,
                "createdon": "2024-05-01T10:30:00Z",
                "_createdby_value@OData.Community.Display.V1.FormattedValue": "Dana Scully"
            })),
            attachment(json!({ "annotationid": "a-22", "filename": "x.txt" })),
        ]);

        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ID    NAME      SIZE     CREATED           CREATED BY");
        assert_eq!(lines[1], "a-1   Contract  1.5 KB   2024-05-01 10:30  Dana Scully");
        assert_eq!(lines[2], "a-22  x.txt     0 Bytes  -                 Unknown");
    }

    #[test]
    fn test_view_with_notifications() {
        let mut view = AttachmentView::new(ViewSettings::default());
        view.phase = Phase::Ready;
        view.notifications.push(Notification::error("Upload failed"));

        assert_eq!(format_view(&view), "No attachments.\n[error] Upload failed");

        view.phase = Phase::Error;
        view.notifications = vec![Notification::error("Failed to load attachments")];
        assert_eq!(format_view(&view), "[error] Failed to load attachments");
    }

    #[test]
    fn test_presenter_keeps_last_view() {
        let presenter = TerminalPresenter::new();
        assert!(presenter.last_view().is_none());

        let mut view = AttachmentView::new(ViewSettings::default());
        presenter.render(&view);
        view.phase = Phase::Ready;
        presenter.render(&view);

        assert_eq!(presenter.last_view().map(|v| v.phase), Some(Phase::Ready));
    }
}
