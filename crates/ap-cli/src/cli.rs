//! Command-line arguments

use std::path::PathBuf;

use ap_core::AppConfig;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "attachment-preview",
    version,
    about = "List, upload, preview and delete the attachments of a record"
)]
pub struct Cli {
    /// Web API service root, e.g. https://org.crm.dynamics.com/api/data/v9.2
    #[arg(long, env = "DATAVERSE_URL")]
    pub url: Option<String>,

    /// Bearer token for the Web API
    #[arg(long, env = "DATAVERSE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Logical name of the owning entity, e.g. account
    #[arg(long, env = "ATTACHMENTS_ENTITY")]
    pub entity: Option<String>,

    /// Identifier of the owning record
    #[arg(long, env = "ATTACHMENTS_RECORD_ID")]
    pub record_id: Option<String>,

    /// Maximum upload size in megabytes
    #[arg(long)]
    pub max_file_size_mb: Option<u64>,

    /// Comma-separated list of allowed extensions
    #[arg(long)]
    pub allowed_file_types: Option<String>,

    /// Turn inline previews off
    #[arg(long)]
    pub no_preview: bool,

    /// Print the resulting view as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List attachments, newest first
    List,
    /// Upload one or more files
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Title for the uploaded files
        #[arg(long)]
        subject: Option<String>,
    },
    /// Delete an attachment by id
    Delete { id: String },
    /// Save an attachment into a directory
    Download {
        id: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Show the inline preview of an attachment
    Preview { id: String },
}

impl Cli {
    /// Apply flags on top of the loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.url {
            config.webapi.base_url = url.clone();
        }
        if let Some(token) = &self.token {
            config.webapi.access_token = Some(token.clone());
        }
        if let Some(entity) = &self.entity {
            config.record.entity_name = Some(entity.clone());
        }
        if let Some(record_id) = &self.record_id {
            config.record.record_id = Some(record_id.clone());
        }
        if let Some(size) = self.max_file_size_mb {
            config.control.max_file_size_mb = size;
        }
        if let Some(types) = &self.allowed_file_types {
            config.control.allowed_file_types = types.clone();
        }
        if self.no_preview {
            config.control.show_preview = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "attachment-preview",
            "--url",
            "https://org.example.com/api/data/v9.2",
            "--entity",
            "contact",
            "--record-id",
            "c-1",
            "--max-file-size-mb",
            "2",
            "--no-preview",
            "list",
        ]);

        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.webapi.base_url, "https://org.example.com/api/data/v9.2");
        assert_eq!(config.record.entity_name.as_deref(), Some("contact"));
        assert_eq!(config.record.record_id.as_deref(), Some("c-1"));
        assert_eq!(config.control.max_file_size_mb, 2);
        assert!(!config.control.show_preview);
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn test_upload_arguments() {
        let cli = Cli::parse_from([
            "attachment-preview",
            "upload",
            "a.pdf",
            "b.png",
            "--subject",
            "Scans",
            "--json",
        ]);

        assert!(cli.json);
        match cli.command {
            Command::Upload { files, subject } => {
                assert_eq!(files, vec![PathBuf::from("a.pdf"), PathBuf::from("b.png")]);
                assert_eq!(subject.as_deref(), Some("Scans"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_upload_requires_files() {
        assert!(Cli::try_parse_from(["attachment-preview", "upload"]).is_err());
    }
}
