//! Segment processing pipeline.
//!
//! Download, decode, downsample and upload happen inside one pipeline
//! invocation that exclusively owns its scratch resources. Progress is
//! reported through a typed event channel that yields any number of
//! [`PipelineEvent::Frame`] events followed by exactly one
//! [`PipelineEvent::Done`] or [`PipelineEvent::Failed`], then closes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use vframe_media::{extract_frames, fetch_segment, DecodedFrame, MediaResult};
use vframe_models::{Frame, FrameMap};
use vframe_queue::SegmentJob;
use vframe_storage::{segment_stem, StorageClient, StorageResult};

use crate::batch::run_batched;
use crate::error::{WorkerError, WorkerResult};

/// Progress of one pipeline invocation.
#[derive(Debug)]
pub enum PipelineEvent {
    /// One frame uploaded; events arrive in upload-completion order, not
    /// frame-index order.
    Frame(Frame),
    /// All uploads finished; the map is keyed by retained decoded index.
    Done(FrameMap),
    /// The segment failed; the error carries its retry classification.
    Failed(WorkerError),
}

/// Decodes a downloaded segment into per-frame images.
#[async_trait]
pub trait SegmentDecoder: Send + Sync {
    async fn decode(&self, video: &Path, out_dir: &Path) -> MediaResult<Vec<DecodedFrame>>;
}

/// FFmpeg-backed decoder.
pub struct FfmpegDecoder;

#[async_trait]
impl SegmentDecoder for FfmpegDecoder {
    async fn decode(&self, video: &Path, out_dir: &Path) -> MediaResult<Vec<DecodedFrame>> {
        extract_frames(video, out_dir).await
    }
}

/// Persists one frame image and returns its public address.
#[async_trait]
pub trait FrameStore: Send + Sync {
    async fn store_frame(
        &self,
        data: Vec<u8>,
        video_id: &str,
        segment_stem: &str,
        index: u32,
        ext: &str,
    ) -> StorageResult<String>;
}

#[async_trait]
impl FrameStore for StorageClient {
    async fn store_frame(
        &self,
        data: Vec<u8>,
        video_id: &str,
        segment_stem: &str,
        index: u32,
        ext: &str,
    ) -> StorageResult<String> {
        self.upload_frame(data, video_id, segment_stem, index, ext).await
    }
}

/// Positional decimation stride for approximating `target_fps`.
///
/// Clamped to 1 so a target at or above the native rate keeps every frame;
/// no upsampling is performed.
pub fn downsample_stride(video_fps: f64, target_fps: f64) -> u32 {
    if target_fps <= 0.0 {
        return 1;
    }
    let stride = (video_fps / target_fps).round();
    if stride < 1.0 {
        1
    } else {
        stride as u32
    }
}

/// Orchestrates one segment's download, decode, downsample and upload.
pub struct FramePipeline {
    http: reqwest::Client,
    decoder: Arc<dyn SegmentDecoder>,
    store: Arc<dyn FrameStore>,
    target_fps: f64,
    batch_size: usize,
    work_dir: PathBuf,
}

impl FramePipeline {
    pub fn new(
        http: reqwest::Client,
        decoder: Arc<dyn SegmentDecoder>,
        store: Arc<dyn FrameStore>,
        target_fps: f64,
        batch_size: usize,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http,
            decoder,
            store,
            target_fps,
            batch_size,
            work_dir: work_dir.into(),
        }
    }

    /// Process a segment, reporting progress through the returned channel.
    pub fn process(self: &Arc<Self>, job: SegmentJob) -> mpsc::Receiver<PipelineEvent> {
        let (tx, rx) = mpsc::channel(64);
        let pipeline = Arc::clone(self);

        tokio::spawn(async move {
            let terminal = match pipeline.run(&job, &tx).await {
                Ok(map) => PipelineEvent::Done(map),
                Err(e) => PipelineEvent::Failed(e),
            };
            let _ = tx.send(terminal).await;
        });

        rx
    }

    /// The pipeline body. Scratch resources are scoped here so every exit
    /// path, including early `?` returns, releases them before the error
    /// reaches the caller.
    async fn run(
        &self,
        job: &SegmentJob,
        tx: &mpsc::Sender<PipelineEvent>,
    ) -> WorkerResult<FrameMap> {
        let video_file = tempfile::Builder::new()
            .prefix("segment_")
            .suffix(".mp4")
            .tempfile_in(&self.work_dir)?;

        fetch_segment(&self.http, &job.uri, video_file.path()).await?;

        let frame_dir = tempfile::Builder::new()
            .prefix("frames_")
            .tempdir_in(&self.work_dir)?;

        let decoded = self.decoder.decode(video_file.path(), frame_dir.path()).await;
        // The segment bytes are dead weight once decode returns, either way.
        drop(video_file);
        let decoded = decoded?;

        let stride = downsample_stride(job.fps, self.target_fps);
        let retained: Vec<&DecodedFrame> =
            decoded.iter().filter(|f| f.index % stride == 0).collect();
        debug!(
            "Segment {} decoded {} frames, retaining {} at stride {}",
            job.segment_idx,
            decoded.len(),
            retained.len(),
            stride
        );

        let stem = segment_stem(&job.uri);
        let tasks: Vec<_> = retained
            .into_iter()
            .map(|frame| {
                let store = Arc::clone(&self.store);
                let tx = tx.clone();
                let video_id = job.video_id.clone();
                let stem = stem.clone();
                let index = frame.index;
                let path = frame.path.clone();

                move || async move {
                    let data = tokio::fs::read(&path).await.map_err(WorkerError::from)?;
                    let ext = path
                        .extension()
                        .map(|e| format!(".{}", e.to_string_lossy()))
                        .unwrap_or_else(|| ".jpg".to_string());

                    let uri = store
                        .store_frame(data, video_id.as_str(), &stem, index, &ext)
                        .await?;

                    let frame = Frame::new(index, uri);
                    let _ = tx.send(PipelineEvent::Frame(frame.clone())).await;
                    Ok::<Frame, WorkerError>(frame)
                }
            })
            .collect();

        let uploaded = run_batched(tasks, self.batch_size).await;
        // Frames are uploaded or the segment failed; either way the scratch
        // directory goes before the result is surfaced.
        drop(frame_dir);
        let uploaded = uploaded?;

        Ok(uploaded.into_iter().map(|f| (f.idx, f.uri)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vframe_media::MediaError;
    use vframe_models::VideoId;
    use vframe_storage::StorageError;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FakeDecoder {
        count: u32,
    }

    #[async_trait]
    impl SegmentDecoder for FakeDecoder {
        async fn decode(&self, video: &Path, out_dir: &Path) -> MediaResult<Vec<DecodedFrame>> {
            assert!(video.exists(), "segment file must exist during decode");
            let mut frames = Vec::new();
            for i in 0..self.count {
                let path = out_dir.join(format!("frame_{:06}.jpg", i + 1));
                tokio::fs::write(&path, b"jpg").await?;
                frames.push(DecodedFrame { index: i, path });
            }
            Ok(frames)
        }
    }

    struct FailingDecoder;

    #[async_trait]
    impl SegmentDecoder for FailingDecoder {
        async fn decode(&self, _video: &Path, _out_dir: &Path) -> MediaResult<Vec<DecodedFrame>> {
            Err(MediaError::ffmpeg_failed("corrupt stream", None, Some(1)))
        }
    }

    struct FakeStore {
        fail_at: Option<u32>,
        uploaded: Mutex<Vec<u32>>,
    }

    impl FakeStore {
        fn new(fail_at: Option<u32>) -> Self {
            Self {
                fail_at,
                uploaded: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FrameStore for FakeStore {
        async fn store_frame(
            &self,
            _data: Vec<u8>,
            video_id: &str,
            segment_stem: &str,
            index: u32,
            ext: &str,
        ) -> StorageResult<String> {
            if self.fail_at == Some(index) {
                return Err(StorageError::upload_failed("simulated storage outage"));
            }
            self.uploaded.lock().unwrap().push(index);
            Ok(format!(
                "https://frames.example.com/{}/{}/{}{}",
                video_id, segment_stem, index, ext
            ))
        }
    }

    async fn serve_segment(response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/videos/vid_1/seg_0002.mp4"))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    }

    fn video_response() -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "video/mp4")
            .set_body_bytes(b"\x00\x00\x00\x18ftypmp42".to_vec())
    }

    fn job_for(server: &MockServer) -> SegmentJob {
        SegmentJob::new(
            VideoId::from_string("vid_1"),
            2,
            format!("{}/videos/vid_1/seg_0002.mp4", server.uri()),
            30.0,
            300,
        )
    }

    fn pipeline(
        decoder: Arc<dyn SegmentDecoder>,
        store: Arc<dyn FrameStore>,
        work_dir: &Path,
    ) -> Arc<FramePipeline> {
        Arc::new(FramePipeline::new(
            reqwest::Client::new(),
            decoder,
            store,
            2.0,
            5,
            work_dir,
        ))
    }

    async fn drain(mut rx: mpsc::Receiver<PipelineEvent>) -> (Vec<Frame>, Option<PipelineEvent>) {
        let mut frames = Vec::new();
        let mut terminal = None;
        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::Frame(f) => frames.push(f),
                other => terminal = Some(other),
            }
        }
        (frames, terminal)
    }

    #[test]
    fn test_downsample_stride() {
        assert_eq!(downsample_stride(30.0, 2.0), 15);
        assert_eq!(downsample_stride(30.0, 30.0), 1);
        // Target above native rate: no upsampling, keep every frame.
        assert_eq!(downsample_stride(30.0, 60.0), 1);
        assert_eq!(downsample_stride(30.0, 1000.0), 1);
        assert_eq!(downsample_stride(24.0, 10.0), 2);
    }

    #[tokio::test]
    async fn processes_segment_and_reconstructs_ordered_map() {
        let server = serve_segment(video_response()).await;
        let work_dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(FakeStore::new(None));

        // 300 decoded frames at 30fps, target 2fps: stride 15, 20 retained.
        let pipeline = pipeline(
            Arc::new(FakeDecoder { count: 300 }),
            Arc::clone(&store) as Arc<dyn FrameStore>,
            work_dir.path(),
        );

        let rx = pipeline.process(job_for(&server));
        let (frames, terminal) = drain(rx).await;

        assert_eq!(frames.len(), 20);
        let map = match terminal {
            Some(PipelineEvent::Done(map)) => map,
            other => panic!("expected Done, got {:?}", other),
        };
        let keys: Vec<u32> = map.keys().copied().collect();
        assert_eq!(keys, (0..20).map(|i| i * 15).collect::<Vec<_>>());
        assert_eq!(
            map.get(&15).unwrap(),
            "https://frames.example.com/vid_1/seg_0002/15.jpg"
        );

        // Scratch file and directory are both gone once the channel closes.
        assert_eq!(
            std::fs::read_dir(work_dir.path()).unwrap().count(),
            0,
            "scratch resources leaked"
        );
    }

    #[tokio::test]
    async fn mid_batch_upload_failure_fails_segment_as_transient() {
        let server = serve_segment(video_response()).await;
        let work_dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(FakeStore::new(Some(45)));

        let pipeline = pipeline(
            Arc::new(FakeDecoder { count: 300 }),
            Arc::clone(&store) as Arc<dyn FrameStore>,
            work_dir.path(),
        );

        let rx = pipeline.process(job_for(&server));
        let (frames, terminal) = drain(rx).await;

        let err = match terminal {
            Some(PipelineEvent::Failed(e)) => e,
            other => panic!("expected Failed, got {:?}", other),
        };
        assert!(!err.is_fatal());
        assert!(frames.iter().all(|f| f.idx != 45));
        assert_eq!(std::fs::read_dir(work_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn http_404_fails_fatal_and_releases_scratch() {
        let server = serve_segment(ResponseTemplate::new(404)).await;
        let work_dir = tempfile::TempDir::new().unwrap();

        let pipeline = pipeline(
            Arc::new(FakeDecoder { count: 10 }),
            Arc::new(FakeStore::new(None)) as Arc<dyn FrameStore>,
            work_dir.path(),
        );

        let rx = pipeline.process(job_for(&server));
        let (frames, terminal) = drain(rx).await;

        assert!(frames.is_empty());
        match terminal {
            Some(PipelineEvent::Failed(e)) => assert!(e.is_fatal()),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(std::fs::read_dir(work_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn decode_failure_is_fatal() {
        let server = serve_segment(video_response()).await;
        let work_dir = tempfile::TempDir::new().unwrap();

        let pipeline = pipeline(
            Arc::new(FailingDecoder),
            Arc::new(FakeStore::new(None)) as Arc<dyn FrameStore>,
            work_dir.path(),
        );

        let rx = pipeline.process(job_for(&server));
        let (_, terminal) = drain(rx).await;

        match terminal {
            Some(PipelineEvent::Failed(e)) => assert!(e.is_fatal()),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(std::fs::read_dir(work_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn zero_decoded_frames_succeed_with_empty_map() {
        let server = serve_segment(video_response()).await;
        let work_dir = tempfile::TempDir::new().unwrap();

        let pipeline = pipeline(
            Arc::new(FakeDecoder { count: 0 }),
            Arc::new(FakeStore::new(None)) as Arc<dyn FrameStore>,
            work_dir.path(),
        );

        let rx = pipeline.process(job_for(&server));
        let (frames, terminal) = drain(rx).await;

        assert!(frames.is_empty());
        match terminal {
            Some(PipelineEvent::Done(map)) => assert!(map.is_empty()),
            other => panic!("expected Done, got {:?}", other),
        }
    }
}
