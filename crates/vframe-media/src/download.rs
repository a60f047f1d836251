//! Segment download over HTTP.

use std::path::Path;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Fetch a video segment into a local file.
///
/// The response is validated before the body is treated as video data: a
/// non-200 status or a content type outside `video/*` means the segment
/// itself is unusable and the error is tagged fatal. Transport failures
/// (connection reset, timeout, truncated body) stay retryable.
pub async fn fetch_segment(
    client: &reqwest::Client,
    uri: &str,
    dest: impl AsRef<Path>,
) -> MediaResult<()> {
    let dest = dest.as_ref();
    debug!("Fetching segment {} to {}", uri, dest.display());

    let response = client
        .get(uri)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(e.to_string()))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(MediaError::UnexpectedStatus(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.starts_with("video/") {
        return Err(MediaError::NotAVideo(content_type));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MediaError::download_failed(e.to_string()))?;

    tokio::fs::write(dest, &bytes).await?;

    info!("Fetched segment {} ({} bytes)", uri, bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/segments/seg_0001.mp4"))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn fetch_writes_valid_segment() {
        let body = b"\x00\x00\x00\x18ftypmp42".to_vec();
        let server = serve(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_body_bytes(body.clone()),
        )
        .await;

        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("segment.mp4");
        let client = reqwest::Client::new();

        fetch_segment(&client, &format!("{}/segments/seg_0001.mp4", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    #[tokio::test]
    async fn http_404_is_fatal() {
        let server = serve(ResponseTemplate::new(404)).await;

        let dir = tempfile::TempDir::new().unwrap();
        let client = reqwest::Client::new();
        let err = fetch_segment(
            &client,
            &format!("{}/segments/seg_0001.mp4", server.uri()),
            dir.path().join("segment.mp4"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MediaError::UnexpectedStatus(404)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn non_video_content_type_is_fatal() {
        let server = serve(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>not found</html>"),
        )
        .await;

        let dir = tempfile::TempDir::new().unwrap();
        let client = reqwest::Client::new();
        let err = fetch_segment(
            &client,
            &format!("{}/segments/seg_0001.mp4", server.uri()),
            dir.path().join("segment.mp4"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MediaError::NotAVideo(ref ct) if ct == "text/html"));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn connection_error_is_transient() {
        // Nothing listens on this port.
        let client = reqwest::Client::new();
        let dir = tempfile::TempDir::new().unwrap();
        let err = fetch_segment(
            &client,
            "http://127.0.0.1:1/segments/seg_0001.mp4",
            dir.path().join("segment.mp4"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MediaError::DownloadFailed { .. }));
        assert!(!err.is_fatal());
    }
}
