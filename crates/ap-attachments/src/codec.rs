//! Transfer Codec
//!
//! Base64 encoding of upload content for the wire, and decoding of stored
//! document bodies back into bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::model::{FileContent, FileUpload};

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to read file content: {0}")]
    Read(#[from] std::io::Error),
    #[error("Malformed base64 content: {0}")]
    Decode(#[from] base64::DecodeError),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Decoded content tagged with its MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlob {
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Read the whole input and return its base64 text (no data-URI prefix)
pub async fn encode<R>(reader: &mut R) -> CodecResult<String>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).await?;
    Ok(STANDARD.encode(&buffer))
}

/// Encode the content of an upload, reading it from disk if needed
pub async fn encode_upload(file: &FileUpload) -> CodecResult<String> {
    match &file.content {
        FileContent::Bytes(data) => Ok(STANDARD.encode(data)),
        FileContent::Path(path) => {
            let mut handle = tokio::fs::File::open(path).await?;
            encode(&mut handle).await
        }
    }
}

/// Decode a stored body into bytes tagged with `mime_type`
pub fn decode(body: &str, mime_type: &str) -> CodecResult<DecodedBlob> {
    let bytes = STANDARD.decode(body)?;
    Ok(DecodedBlob {
        mime_type: mime_type.to_string(),
        bytes: Bytes::from(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_encode_reader() {
        let mut input: &[u8] = b"hello";
        assert_eq!(encode(&mut input).await.unwrap(), "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_encode_empty() {
        let mut input: &[u8] = b"";
        assert_eq!(encode(&mut input).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_round_trip_binary() {
        let original: Vec<u8> = (0..=255u8).cycle().take(4099).collect();
        let mut input: &[u8] = &original;

        let encoded = encode(&mut input).await.unwrap();
        let decoded = decode(&encoded, "application/octet-stream").unwrap();

        assert_eq!(decoded.bytes.as_ref(), original.as_slice());
        assert_eq!(decoded.mime_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_encode_upload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        tokio::fs::write(&path, b"disk bytes").await.unwrap();

        let upload = FileUpload::from_path(&path).await.unwrap();
        let encoded = encode_upload(&upload).await.unwrap();

        assert_eq!(decode(&encoded, "text/plain").unwrap().bytes, &b"disk bytes"[..]);
    }

    #[tokio::test]
    async fn test_encode_upload_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        tokio::fs::write(&path, b"x").await.unwrap();
        let upload = FileUpload::from_path(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(matches!(
            encode_upload(&upload).await,
            Err(CodecError::Read(_))
        ));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            decode("not base64!!", "text/plain"),
            Err(CodecError::Decode(_))
        ));
    }
}
