//! Frame upload operations and key derivation.

use tracing::debug;

use crate::client::StorageClient;
use crate::error::StorageResult;

/// Object key for one retained frame: `{video_id}/{segment_stem}/{index}{ext}`.
///
/// Deterministic per (video, segment, index), so reprocessing a redelivered
/// segment overwrites the same objects instead of duplicating them.
pub fn frame_key(video_id: &str, segment_stem: &str, index: u32, ext: &str) -> String {
    format!("{}/{}/{}{}", video_id, segment_stem, index, ext)
}

/// Base name of a segment, taken from the file component of its uri with the
/// extension and any query stripped.
pub fn segment_stem(uri: &str) -> String {
    let path = match url::Url::parse(uri) {
        Ok(parsed) => parsed.path().to_string(),
        // Not an absolute URL; treat the whole thing as a path.
        Err(_) => uri.split('?').next().unwrap_or(uri).to_string(),
    };

    let name = path.rsplit('/').next().unwrap_or(&path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

impl StorageClient {
    /// Upload one frame image and return its public address.
    pub async fn upload_frame(
        &self,
        data: Vec<u8>,
        video_id: &str,
        segment_stem: &str,
        index: u32,
        ext: &str,
    ) -> StorageResult<String> {
        let key = frame_key(video_id, segment_stem, index, ext);
        self.upload_bytes(data, &key, "image/jpeg").await?;

        let url = self.public_url(&key);
        debug!("Uploaded frame {} to {}", index, url);
        Ok(url)
    }
}
