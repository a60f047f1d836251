//! Frame extraction from a downloaded segment.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Image2 sequence pattern the decoder writes into the output directory.
const FRAME_PATTERN: &str = "frame_%06d.jpg";

/// One decoded frame, addressed by its zero-based position in the decoded
/// sequence. The index is assigned here, when the sequence is produced, so
/// nothing downstream ever recovers it from a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub index: u32,
    pub path: PathBuf,
}

/// Decode a video segment into one image file per frame.
///
/// `-vsync 0` keeps the decoder's frame count (no duplication or drop to a
/// nominal rate). A segment that decodes to zero frames yields an empty
/// vector, not an error.
pub async fn extract_frames(
    video: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
) -> MediaResult<Vec<DecodedFrame>> {
    let video = video.as_ref();
    let out_dir = out_dir.as_ref();
    debug!(
        "Extracting frames from {} into {}",
        video.display(),
        out_dir.display()
    );

    let cmd = FfmpegCommand::new(video, out_dir.join(FRAME_PATTERN))
        .output_args(["-vsync", "0"])
        .output_args(["-q:v", "2"])
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await?;

    let frames = collect_decoded(out_dir).await?;
    info!(
        "Decoded {} frames from {}",
        frames.len(),
        video.display()
    );
    Ok(frames)
}

/// Enumerate the decoded image sequence in decode order.
///
/// FFmpeg writes the image2 sequence with zero-padded ascending names, so
/// lexicographic order is decode order; indices are assigned from the
/// enumeration.
async fn collect_decoded(out_dir: &Path) -> MediaResult<Vec<DecodedFrame>> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(out_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "jpg") {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| DecodedFrame {
            index: i as u32,
            path,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_assigns_zero_based_indices_in_sequence_order() {
        let dir = tempfile::TempDir::new().unwrap();
        // Written out of order on purpose.
        for name in ["frame_000003.jpg", "frame_000001.jpg", "frame_000002.jpg"] {
            std::fs::write(dir.path().join(name), b"jpg").unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let frames = collect_decoded(dir.path()).await.unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].index, 0);
        assert_eq!(
            frames[0].path.file_name().unwrap().to_str().unwrap(),
            "frame_000001.jpg"
        );
        assert_eq!(frames[2].index, 2);
        assert_eq!(
            frames[2].path.file_name().unwrap().to_str().unwrap(),
            "frame_000003.jpg"
        );
    }

    #[tokio::test]
    async fn empty_sequence_is_not_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let frames = collect_decoded(dir.path()).await.unwrap();
        assert!(frames.is_empty());
    }
}
