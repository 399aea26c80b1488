use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;

/// Upload progress callback, called with a percentage in 0..=100
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// `round(loaded * 100 / total)`, or `None` when the total is unknown
pub fn progress_percent(loaded: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let loaded = loaded.min(total) as u128;
    let total = total as u128;
    Some(((loaded * 100 + total / 2) / total) as u8)
}

/// Request body that reports progress as the transport pulls chunks
pub(crate) fn progress_body(
    data: Bytes,
    chunk_size: usize,
    on_progress: Option<ProgressCallback>,
) -> reqwest::Body {
    let total = data.len() as u64;
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
        .collect();

    let mut loaded = 0u64;
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        loaded += chunk.len() as u64;
        if let Some(callback) = &on_progress {
            if let Some(percent) = progress_percent(loaded, total) {
                callback(percent);
            }
        }
        Ok::<Bytes, std::io::Error>(chunk)
    });

    reqwest::Body::wrap_stream(stream)
}
