use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::file::{UploadError, UploadFile};
use crate::constants::{UPLOAD_FIELD_NAME, UPLOAD_PATH};
use crate::http::{Gateway, MultipartFile, ProgressCallback};
use crate::models::UploadResponse;

/// Validate `file` and send it to the upload endpoint.
///
/// Invalid files are rejected before any request is made.
pub async fn upload_file(
    gateway: &Gateway,
    file: UploadFile,
    on_progress: Option<ProgressCallback>,
) -> Result<UploadResponse, UploadError> {
    if let Err(e) = file.validate() {
        if e.is_warning() {
            warn!(file = %file.file_name, mime = %file.mime_type, "{}", e);
        } else {
            error!(file = %file.file_name, size = file.size(), "{}", e);
        }
        return Err(e);
    }

    let part = MultipartFile {
        field: UPLOAD_FIELD_NAME.to_string(),
        file_name: file.file_name,
        mime_type: file.mime_type,
        data: file.data,
    };
    let response: UploadResponse = gateway.upload(UPLOAD_PATH, part, on_progress).await?;
    info!(url = %response.url, size = response.size, "file uploaded");
    Ok(response)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// An uploaded file and the markup that embeds it in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedMedia {
    pub kind: MediaKind,
    pub markup: String,
    pub response: UploadResponse,
}

impl EmbeddedMedia {
    fn new(mime_type: &str, response: UploadResponse) -> Self {
        if mime_type.starts_with("video/") {
            let markup = format!(
                r#"<video controls width="100%"><source src="{}" type="{}"></video>"#,
                escape_attr(&response.url),
                escape_attr(mime_type)
            );
            Self {
                kind: MediaKind::Video,
                markup,
                response,
            }
        } else {
            let markup = format!(
                r#"<img src="{}" alt="{}" />"#,
                escape_attr(&response.url),
                escape_attr(&response.filename)
            );
            Self {
                kind: MediaKind::Image,
                markup,
                response,
            }
        }
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Handles files dropped into a document editor, one upload at a time
#[derive(Debug)]
pub struct MediaUploader {
    gateway: Arc<Gateway>,
    uploading: AtomicBool,
}

/// Clears the busy flag however the upload ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MediaUploader {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            uploading: AtomicBool::new(false),
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::Acquire)
    }

    /// Upload every file of one drop, in order, and return the markup for
    /// each.
    ///
    /// A drop while another is still uploading is rejected as a whole with
    /// [`UploadError::Busy`]. Within a drop, one file failing does not stop
    /// the rest; each file gets its own result.
    pub async fn handle_drop(
        &self,
        files: Vec<UploadFile>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Vec<Result<EmbeddedMedia, UploadError>>, UploadError> {
        let Some(_busy) = self.claim() else {
            warn!(files = files.len(), "{}", UploadError::Busy);
            return Err(UploadError::Busy);
        };

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.embed(file, on_progress.clone()).await);
        }
        Ok(results)
    }

    /// A drop of a single file
    pub async fn handle_file(
        &self,
        file: UploadFile,
        on_progress: Option<ProgressCallback>,
    ) -> Result<EmbeddedMedia, UploadError> {
        let Some(_busy) = self.claim() else {
            warn!(file = %file.file_name, "{}", UploadError::Busy);
            return Err(UploadError::Busy);
        };
        self.embed(file, on_progress).await
    }

    fn claim(&self) -> Option<BusyGuard<'_>> {
        self.uploading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.uploading))
    }

    async fn embed(
        &self,
        file: UploadFile,
        on_progress: Option<ProgressCallback>,
    ) -> Result<EmbeddedMedia, UploadError> {
        let mime_type = file.mime_type.clone();
        let response = upload_file(&self.gateway, file, on_progress).await?;
        Ok(EmbeddedMedia::new(&mime_type, response))
    }
}
