//! Validation Gate
//!
//! Splits an upload batch into accepted and rejected files. Every file is
//! judged on its own; a rejection never stops the rest of the batch from
//! being checked.

use ap_core::{ControlConfig, BYTES_IN_MB};

use crate::model::FileUpload;

/// Why a file was turned away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// Extension missing or not on the allow-list
    DisallowedType { extension: Option<String> },
    /// Larger than the configured limit
    SizeExceeded { size: u64, max: u64 },
}

/// A rejected file and the rule it broke
#[derive(Debug, Clone)]
pub struct Rejection {
    pub file: FileUpload,
    pub reason: RejectionReason,
}

impl Rejection {
    /// Human-readable message naming the violated rule
    pub fn message(&self) -> String {
        match &self.reason {
            RejectionReason::DisallowedType {
                extension: Some(ext),
            } => format!("File type .{} is not allowed", ext),
            RejectionReason::DisallowedType { extension: None } => {
                format!("File {} has no file extension", self.file.name)
            }
            RejectionReason::SizeExceeded { .. } => {
                format!("File {} exceeds max size limit", self.file.name)
            }
        }
    }
}

/// Result of checking a batch
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub accepted: Vec<FileUpload>,
    pub rejected: Vec<Rejection>,
}

/// Allow-list and size limit applied to uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    allowed_extensions: Vec<String>,
    max_file_size_mb: u64,
}

impl UploadPolicy {
    /// Extensions are trimmed and lowercased; empty entries are dropped
    pub fn new<I, S>(allowed_extensions: I, max_file_size_mb: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim().to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            max_file_size_mb,
        }
    }

    pub fn from_config(config: &ControlConfig) -> Self {
        Self::new(config.allowed_extensions(), config.max_file_size_mb)
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size_mb
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(BYTES_IN_MB)
    }

    /// File picker filter, e.g. `.pdf,.png`
    pub fn accept_attribute(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Check one file; the type rule is checked before the size rule
    pub fn check(&self, file: &FileUpload) -> Result<(), RejectionReason> {
        let extension = file.extension();
        let allowed = extension
            .as_ref()
            .map(|ext| self.allowed_extensions.iter().any(|a| a == ext))
            .unwrap_or(false);
        if !allowed {
            return Err(RejectionReason::DisallowedType { extension });
        }

        let max = self.max_file_size_bytes();
        if file.size > max {
            return Err(RejectionReason::SizeExceeded {
                size: file.size,
                max,
            });
        }

        Ok(())
    }

    /// Partition a batch, keeping the input order within each side
    pub fn partition(&self, files: Vec<FileUpload>) -> ValidationReport {
        let mut report = ValidationReport::default();
        for file in files {
            match self.check(&file) {
                Ok(()) => report.accepted.push(file),
                Err(reason) => report.rejected.push(Rejection { file, reason }),
            }
        }
        report
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from_config(&ControlConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: usize) -> FileUpload {
        FileUpload::from_bytes(name, vec![0u8; size])
    }

    fn names(files: &[FileUpload]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_policy_normalizes_extensions() {
        let policy = UploadPolicy::new([" PDF", "png ", ""], 1);
        assert_eq!(policy.allowed_extensions(), &["pdf", "png"]);
        assert_eq!(policy.accept_attribute(), ".pdf,.png");
    }

    #[test]
    fn test_default_policy() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.max_file_size_mb(), 10);
        assert_eq!(policy.max_file_size_bytes(), 10 * BYTES_IN_MB);
        assert!(policy.allowed_extensions().contains(&"mp4".to_string()));
    }

    #[test]
    fn test_mixed_batch() {
        let policy = UploadPolicy::new(["pdf", "png"], 1);
        let report = policy.partition(vec![
            file("doc.pdf", 500 * 1024),
            file("image.bmp", 200 * 1024),
            file("big.pdf", 2 * 1024 * 1024),
        ]);

        assert_eq!(names(&report.accepted), vec!["doc.pdf"]);
        assert_eq!(report.rejected.len(), 2);

        assert_eq!(report.rejected[0].file.name, "image.bmp");
        assert_eq!(
            report.rejected[0].reason,
            RejectionReason::DisallowedType {
                extension: Some("bmp".to_string())
            }
        );
        assert_eq!(report.rejected[0].message(), "File type .bmp is not allowed");

        assert_eq!(report.rejected[1].file.name, "big.pdf");
        assert!(matches!(
            report.rejected[1].reason,
            RejectionReason::SizeExceeded { size, max } if size == 2 * BYTES_IN_MB && max == BYTES_IN_MB
        ));
        assert_eq!(report.rejected[1].message(), "File big.pdf exceeds max size limit");
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let policy = UploadPolicy::new(["pdf"], 1);
        assert!(policy.check(&file("A.PDF", 10)).is_ok());
    }

    #[test]
    fn test_size_boundary() {
        let policy = UploadPolicy::new(["txt"], 1);
        assert!(policy.check(&file("exact.txt", BYTES_IN_MB as usize)).is_ok());
        assert!(matches!(
            policy.check(&file("over.txt", BYTES_IN_MB as usize + 1)),
            Err(RejectionReason::SizeExceeded { .. })
        ));
    }

    #[test]
    fn test_missing_extension_is_rejected() {
        let policy = UploadPolicy::new(["txt"], 1);
        let report = policy.partition(vec![file("README", 1), file("notes.", 1)]);

        assert!(report.accepted.is_empty());
        for rejection in &report.rejected {
            assert_eq!(
                rejection.reason,
                RejectionReason::DisallowedType { extension: None }
            );
        }
        assert_eq!(report.rejected[0].message(), "File README has no file extension");
    }

    #[test]
    fn test_type_rule_wins_over_size_rule() {
        let policy = UploadPolicy::new(["pdf"], 1);
        assert!(matches!(
            policy.check(&file("huge.exe", 3 * BYTES_IN_MB as usize)),
            Err(RejectionReason::DisallowedType { .. })
        ));
    }

    #[test]
    fn test_partition_is_exhaustive_and_disjoint() {
        let policy = UploadPolicy::new(["pdf", "png"], 1);
        let input = vec![
            file("a.pdf", 1),
            file("b.exe", 1),
            file("c.png", 2 * BYTES_IN_MB as usize),
            file("d.PNG", 10),
            file("e", 0),
        ];
        let input_names: Vec<String> = input.iter().map(|f| f.name.clone()).collect();

        let report = policy.partition(input);

        let mut seen: Vec<String> = report
            .accepted
            .iter()
            .map(|f| f.name.clone())
            .chain(report.rejected.iter().map(|r| r.file.name.clone()))
            .collect();
        seen.sort();
        assert_eq!(seen, input_names);

        for rejection in &report.rejected {
            assert!(policy.check(&rejection.file).is_err());
        }
        for accepted in &report.accepted {
            assert!(policy.check(accepted).is_ok());
        }
    }
}
