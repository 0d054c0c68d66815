//! Image attachments and their transport encoding.
//!
//! An attachment is encoded the way a browser `FileReader` would: the bytes
//! become a `data:<mime>;base64,<payload>` URL, and only the payload after
//! the comma is sent to the chat endpoint.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Largest image the site accepts for upload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Length of the base64 text for `bytes` bytes of input, padding included.
#[must_use]
pub const fn base64_len(bytes: usize) -> usize {
    bytes.div_ceil(3) * 4
}

/// Failure while turning an attachment into transport text.
#[derive(Error, Debug)]
pub enum AttachmentError {
    /// The backing file could not be read.
    #[error("failed to read image '{path}': {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The image has no bytes.
    #[error("image '{0}' is empty")]
    Empty(String),
}

#[derive(Clone)]
enum ImageSource {
    Bytes(Arc<[u8]>),
    Path(PathBuf),
}

/// An image selected by the user, not yet encoded.
#[derive(Clone)]
pub struct ImageAttachment {
    name: String,
    mime: String,
    source: ImageSource,
}

impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            ImageSource::Bytes(bytes) => format!("{} bytes", bytes.len()),
            ImageSource::Path(path) => path.display().to_string(),
        };
        f.debug_struct("ImageAttachment")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("source", &source)
            .finish()
    }
}

impl ImageAttachment {
    /// Attachment backed by bytes already in memory (e.g. an upload).
    #[must_use]
    pub fn from_bytes(
        name: impl Into<String>,
        mime: Option<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let name = name.into();
        let bytes: Vec<u8> = bytes.into();
        let mime = mime
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| guess_mime(Path::new(&name)));
        Self {
            name,
            mime,
            source: ImageSource::Bytes(Arc::from(bytes)),
        }
    }

    /// Attachment backed by a file that is read when the send is dispatched.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.file_name().map_or_else(
            || path.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        Self {
            name,
            mime: guess_mime(&path),
            source: ImageSource::Path(path),
        }
    }

    /// File name shown next to the picker.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIME type used in the data URL.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Encode the image as a full `data:` URL.
    pub async fn data_url(&self) -> Result<String, AttachmentError> {
        let bytes = match &self.source {
            ImageSource::Bytes(bytes) => Arc::clone(bytes),
            ImageSource::Path(path) => {
                let data = tokio::fs::read(path)
                    .await
                    .map_err(|source| AttachmentError::Io {
                        path: path.clone(),
                        source,
                    })?;
                Arc::from(data)
            }
        };

        if bytes.is_empty() {
            return Err(AttachmentError::Empty(self.name.clone()));
        }

        Ok(format!("data:{};base64,{}", self.mime, STANDARD.encode(&bytes)))
    }

    /// Encode the image as the raw base64 payload sent on the wire.
    pub async fn encode(&self) -> Result<String, AttachmentError> {
        let data_url = self.data_url().await?;
        Ok(strip_data_url_prefix(&data_url).to_string())
    }
}

/// Return the payload after the first comma of a data URL.
///
/// Input without a comma is returned unchanged.
#[must_use]
pub fn strip_data_url_prefix(data_url: &str) -> &str {
    data_url
        .split_once(',')
        .map_or(data_url, |(_, payload)| payload)
}

fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_encode_strips_data_url_prefix() {
        let image = ImageAttachment::from_bytes("roof.png", None, b"abc".to_vec());
        assert_eq!(image.mime(), "image/png");

        let url = image.data_url().await.unwrap();
        assert_eq!(url, "data:image/png;base64,YWJj");
        assert_eq!(image.encode().await.unwrap(), "YWJj");
    }

    #[tokio::test]
    async fn test_empty_image_fails() {
        let image = ImageAttachment::from_bytes("blank.jpg", None, Vec::new());
        let err = image.encode().await.unwrap_err();
        assert!(matches!(err, AttachmentError::Empty(name) if name == "blank.jpg"));
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let image = ImageAttachment::from_path("/definitely/not/here.jpeg");
        assert_eq!(image.name(), "here.jpeg");
        assert_eq!(image.mime(), "image/jpeg");
        assert!(matches!(
            image.encode().await,
            Err(AttachmentError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_path_attachment_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("damp.webp");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let image = ImageAttachment::from_path(&path);
        assert_eq!(image.encode().await.unwrap(), "AQID");
    }

    #[test]
    fn test_explicit_mime_wins() {
        let image = ImageAttachment::from_bytes("upload", Some("image/gif".into()), vec![1]);
        assert_eq!(image.mime(), "image/gif");
    }

    #[tokio::test]
    async fn test_base64_len_matches_encoding() {
        for size in [1, 2, 3, 4, 1000] {
            let image = ImageAttachment::from_bytes("a.png", None, vec![0u8; size]);
            assert_eq!(image.encode().await.unwrap().len(), base64_len(size));
        }
        assert!(base64_len(MAX_IMAGE_BYTES) > MAX_IMAGE_BYTES);
    }

    #[test]
    fn test_strip_prefix_without_comma() {
        assert_eq!(strip_data_url_prefix("QUJD"), "QUJD");
    }
}
