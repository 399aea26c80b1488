use bytes::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::constants::{
    ALLOWED_UPLOAD_MIME_PREFIXES, MAX_UPLOAD_SIZE_BYTES, MAX_UPLOAD_SIZE_MB, MIME_SNIFF_BYTES,
};
use crate::http::GatewayError;
use crate::utils::sniff_mime;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("unsupported file type, only images and videos are allowed")]
    UnsupportedType { mime_type: String },

    #[error("file size cannot exceed {}MB", MAX_UPLOAD_SIZE_MB)]
    TooLarge { size: u64 },

    #[error("upload in progress, please wait")]
    Busy,

    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl UploadError {
    /// Rejections the user can simply retry differently; logged as warnings
    pub fn is_warning(&self) -> bool {
        matches!(self, UploadError::UnsupportedType { .. } | UploadError::Busy)
    }
}

/// A file ready to be sent: name, MIME type and contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk.
    ///
    /// The MIME type comes from the leading bytes, falling back to the
    /// extension. Type and size are checked against the file's metadata and
    /// first few KB, so a rejected file is never read in full.
    pub async fn from_path(path: &Path) -> Result<Self, UploadError> {
        let read_error = |source: std::io::Error| UploadError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::open(path).await.map_err(read_error)?;
        let size = file.metadata().await.map_err(read_error)?.len();

        let mut data = Vec::with_capacity(size.min(MAX_UPLOAD_SIZE_BYTES) as usize);
        (&mut file)
            .take(MIME_SNIFF_BYTES as u64)
            .read_to_end(&mut data)
            .await
            .map_err(read_error)?;

        let mime_type = sniff_mime(path, &data);
        if !is_allowed_mime(mime_type) {
            return Err(UploadError::UnsupportedType {
                mime_type: mime_type.to_string(),
            });
        }
        if size > MAX_UPLOAD_SIZE_BYTES {
            return Err(UploadError::TooLarge { size });
        }

        file.read_to_end(&mut data).await.map_err(read_error)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, mime_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }

    /// Type and size checks run before any network call
    pub fn validate(&self) -> Result<(), UploadError> {
        if !is_allowed_mime(&self.mime_type) {
            return Err(UploadError::UnsupportedType {
                mime_type: self.mime_type.clone(),
            });
        }

        if self.size() > MAX_UPLOAD_SIZE_BYTES {
            return Err(UploadError::TooLarge { size: self.size() });
        }

        Ok(())
    }
}

fn is_allowed_mime(mime_type: &str) -> bool {
    ALLOWED_UPLOAD_MIME_PREFIXES
        .iter()
        .any(|prefix| mime_type.starts_with(prefix))
}
