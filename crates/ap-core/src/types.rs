//! Common types used throughout Attachment Preview

use serde::{Deserialize, Serialize};

/// Bytes in one megabyte, as used by the upload size limit
pub const BYTES_IN_MB: u64 = 1024 * 1024;

/// Reference to the business record that owns attachments
///
/// Both parts come from the hosting form and may be empty while the form
/// is still resolving its record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    /// Logical name of the owning entity type (e.g. "account")
    pub entity_name: String,
    /// Identifier of the owning record
    pub record_id: String,
}

impl RecordRef {
    pub fn new(entity_name: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            record_id: record_id.into(),
        }
    }

    /// A reference with neither part resolved
    pub fn empty() -> Self {
        Self::default()
    }

    /// Both entity name and record id are present
    pub fn is_complete(&self) -> bool {
        !self.entity_name.trim().is_empty() && !self.record_id.trim().is_empty()
    }
}

impl std::fmt::Display for RecordRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.entity_name, self.record_id)
    }
}

/// Human-readable file size
///
/// Base 1024, at most two decimals with trailing zeros dropped
/// (`1.5 KB`, `1 MB`).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
