//! Frames in, summary out.
//!
//! The pipeline pulls frames from a [`FrameSource`] one at a time, runs the
//! shared detector on each in a blocking task, and accumulates
//! [`DetectionRecord`]s for the whole video before summarizing. Frames are
//! dropped as soon as they have been detected; only the records are kept.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use armorsight_core::detection::DetectionRecord;
use armorsight_core::detector::Detector;
use armorsight_core::summary::{summarize, Summary};

use crate::annotate::Annotator;
use crate::error::VisionError;
use crate::ffmpeg::FfmpegOpener;
use crate::source::{FrameSource, SourceOpener};

/// Limits applied to every run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Stop after this many frames. `None` processes the whole video.
    pub max_frames: Option<u64>,
    /// Wall-clock budget for one video, decode included.
    pub timeout: Duration,
    /// Root directory for annotated frame dumps. `None` disables them.
    pub annotate_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_frames: None,
            timeout: Duration::from_secs(240),
            annotate_dir: None,
        }
    }
}

/// Result of one run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub summary: Summary,
    pub frames_processed: u64,
    pub records: Vec<DetectionRecord>,
}

/// Shared, stateless detection pipeline. One instance serves all requests.
pub struct DetectionPipeline {
    detector: Arc<dyn Detector>,
    opener: Arc<dyn SourceOpener>,
    options: PipelineOptions,
}

impl DetectionPipeline {
    /// Pipeline that decodes uploads with ffmpeg.
    pub fn new(detector: Arc<dyn Detector>, options: PipelineOptions) -> Self {
        Self {
            detector,
            opener: Arc::new(FfmpegOpener),
            options,
        }
    }

    /// Replace how video files are turned into frames.
    pub fn with_opener(mut self, opener: Arc<dyn SourceOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn detector(&self) -> &Arc<dyn Detector> {
        &self.detector
    }

    /// Decode the video at `path` and summarize it.
    ///
    /// `run_id` names the annotation directory for this run.
    pub async fn run_file(&self, path: &Path, run_id: &str) -> Result<PipelineOutcome, VisionError> {
        self.bounded(async {
            let source = self.opener.open(path, self.options.max_frames).await?;
            let annotator = self.annotator_for(run_id);
            self.run_source(source, annotator).await
        })
        .await
    }

    /// Run detection over every frame `source` yields.
    ///
    /// A source error before the first frame fails the run. A source error
    /// after at least one frame ends the video early and the frames already
    /// processed are summarized.
    pub async fn run_source<S: FrameSource>(
        &self,
        mut source: S,
        annotator: Option<Annotator>,
    ) -> Result<PipelineOutcome, VisionError> {
        let mut records = Vec::new();
        let mut frames_processed = 0u64;

        loop {
            if self
                .options
                .max_frames
                .is_some_and(|max| frames_processed >= max)
            {
                break;
            }

            let frame = match source.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) if frames_processed == 0 => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        frames_processed,
                        "Frame source failed mid-video, summarizing frames read so far"
                    );
                    break;
                }
            };

            let frame_index = frame.index;
            let detector = Arc::clone(&self.detector);
            let annotator = annotator.clone();
            let detections = tokio::task::spawn_blocking(move || {
                let result = detector.detect(&frame);
                if let (Ok(found), Some(annotator)) = (&result, &annotator) {
                    annotator.write(&frame, found);
                }
                result
            })
            .await?
            .map_err(|source| VisionError::Detect {
                frame_index,
                source,
            })?;

            records.extend(
                detections
                    .into_iter()
                    .map(|d| DetectionRecord::from_detection(frame_index, d)),
            );
            frames_processed += 1;
        }

        let summary = summarize(&records);
        tracing::debug!(
            detector = self.detector.name(),
            frames_processed,
            records = records.len(),
            status = summary.status(),
            "Video summarized"
        );

        Ok(PipelineOutcome {
            summary,
            frames_processed,
            records,
        })
    }

    /// Apply the configured timeout to a run.
    async fn bounded<F>(&self, run: F) -> Result<PipelineOutcome, VisionError>
    where
        F: Future<Output = Result<PipelineOutcome, VisionError>>,
    {
        tokio::time::timeout(self.options.timeout, run)
            .await
            .map_err(|_| VisionError::Timeout(self.options.timeout.as_secs()))?
    }

    fn annotator_for(&self, run_id: &str) -> Option<Annotator> {
        let root = self.options.annotate_dir.as_deref()?;
        match Annotator::create(root, run_id) {
            Ok(annotator) => Some(annotator),
            Err(e) => {
                tracing::warn!(
                    dir = %root.display(),
                    error = %e,
                    "Cannot create annotation directory, continuing without it"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use armorsight_core::detection::{BoundingBox, Detection};
    use armorsight_core::detector::DetectError;
    use armorsight_core::frame::RgbFrame;
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use crate::ffmpeg::FfmpegError;

    /// Yields scripted results, then end-of-stream.
    struct ScriptedSource {
        items: VecDeque<Result<RgbFrame, FfmpegError>>,
        delay: Option<Duration>,
    }

    impl ScriptedSource {
        fn frames(n: u64) -> Self {
            Self {
                items: (0..n).map(|i| Ok(frame(i))).collect(),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl FrameSource for ScriptedSource {
        async fn next_frame(&mut self) -> Result<Option<RgbFrame>, FfmpegError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.items.pop_front().transpose()
        }
    }

    fn frame(index: u64) -> RgbFrame {
        RgbFrame::new(index, 8, 8, vec![0; 8 * 8 * 3]).unwrap()
    }

    /// Labels frames by index: even frames hold one "T-90", every third
    /// frame also holds a "K2", frame 13 fails.
    struct IndexDetector;

    impl Detector for IndexDetector {
        fn detect(&self, frame: &RgbFrame) -> Result<Vec<Detection>, DetectError> {
            if frame.index == 13 {
                return Err(DetectError::Inference("boom".into()));
            }
            let bbox = BoundingBox::new(1, 1, 6, 6).unwrap();
            let mut out = Vec::new();
            if frame.index % 2 == 0 {
                out.push(Detection::new("T-90", 0.8, bbox).unwrap());
            }
            if frame.index % 3 == 0 {
                out.push(Detection::new("K2", 0.6, bbox).unwrap());
            }
            Ok(out)
        }

        fn name(&self) -> &str {
            "index"
        }
    }

    fn pipeline(options: PipelineOptions) -> DetectionPipeline {
        DetectionPipeline::new(Arc::new(IndexDetector), options)
    }

    #[tokio::test]
    async fn empty_source_is_no_detection() {
        let out = pipeline(PipelineOptions::default())
            .run_source(ScriptedSource::frames(0), None)
            .await
            .unwrap();
        assert_eq!(out.summary, Summary::NoDetection);
        assert_eq!(out.frames_processed, 0);
    }

    #[tokio::test]
    async fn records_are_accumulated_across_frames() {
        // Frames 0..6: T-90 on 0,2,4; K2 on 0,3.
        let out = pipeline(PipelineOptions::default())
            .run_source(ScriptedSource::frames(6), None)
            .await
            .unwrap();
        assert_eq!(out.frames_processed, 6);
        let seen: Vec<(u64, &str)> = out
            .records
            .iter()
            .map(|r| (r.frame_index, r.label.as_str()))
            .collect();
        assert_eq!(
            seen,
            vec![(0, "T-90"), (0, "K2"), (2, "T-90"), (3, "K2"), (4, "T-90")]
        );
        assert_matches!(
            out.summary,
            Summary::Detected { top_label, mean_conf, frames_detected } => {
                assert_eq!(top_label, "T-90");
                assert!((mean_conf - 0.8).abs() < 1e-9);
                assert_eq!(frames_detected, 4);
            }
        );
    }

    #[tokio::test]
    async fn frames_without_detections_only_count_as_processed() {
        let source = ScriptedSource {
            items: vec![Ok(frame(1)), Ok(frame(5))].into(),
            delay: None,
        };
        let out = pipeline(PipelineOptions::default())
            .run_source(source, None)
            .await
            .unwrap();
        assert_eq!(out.frames_processed, 2);
        assert_eq!(out.summary, Summary::NoDetection);
    }

    #[tokio::test]
    async fn max_frames_caps_processing() {
        let options = PipelineOptions {
            max_frames: Some(3),
            ..Default::default()
        };
        let out = pipeline(options)
            .run_source(ScriptedSource::frames(10), None)
            .await
            .unwrap();
        assert_eq!(out.frames_processed, 3);
    }

    #[tokio::test]
    async fn unreadable_first_frame_fails_the_run() {
        let source = ScriptedSource {
            items: vec![Err(FfmpegError::InvalidVideo("garbage".into()))].into(),
            delay: None,
        };
        let err = pipeline(PipelineOptions::default())
            .run_source(source, None)
            .await
            .unwrap_err();
        assert!(err.is_input_error());
    }

    #[tokio::test]
    async fn late_source_error_keeps_partial_results() {
        let source = ScriptedSource {
            items: vec![
                Ok(frame(0)),
                Ok(frame(2)),
                Err(FfmpegError::ExecutionFailed {
                    exit_code: Some(1),
                    stderr: "corrupt packet".into(),
                }),
                Ok(frame(4)),
            ]
            .into(),
            delay: None,
        };
        let out = pipeline(PipelineOptions::default())
            .run_source(source, None)
            .await
            .unwrap();
        assert_eq!(out.frames_processed, 2);
        assert_eq!(out.summary.top_label(), Some("T-90"));
    }

    #[tokio::test]
    async fn detector_failure_names_the_frame() {
        let source = ScriptedSource {
            items: vec![Ok(frame(12)), Ok(frame(13))].into(),
            delay: None,
        };
        let err = pipeline(PipelineOptions::default())
            .run_source(source, None)
            .await
            .unwrap_err();
        assert_matches!(err, VisionError::Detect { frame_index: 13, .. });
        assert!(!err.is_input_error());
    }

    #[tokio::test]
    async fn slow_runs_time_out() {
        let options = PipelineOptions {
            timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let p = pipeline(options);
        let mut source = ScriptedSource::frames(100);
        source.delay = Some(Duration::from_millis(20));
        let err = p.bounded(p.run_source(source, None)).await.unwrap_err();
        assert_matches!(err, VisionError::Timeout(_));
    }

    #[tokio::test]
    async fn annotations_are_written_per_frame() {
        let root = tempfile::tempdir().unwrap();
        let options = PipelineOptions {
            annotate_dir: Some(root.path().to_path_buf()),
            ..Default::default()
        };
        let p = pipeline(options);
        let annotator = p.annotator_for("run-7");
        assert!(annotator.is_some());
        p.run_source(ScriptedSource::frames(2), annotator)
            .await
            .unwrap();
        assert!(root.path().join("run-7/frame_0.jpg").exists());
        assert!(root.path().join("run-7/frame_1.jpg").exists());
    }

    /// Hands out a fresh scripted source for any path.
    struct ScriptedOpener(u64);

    #[async_trait]
    impl SourceOpener for ScriptedOpener {
        async fn open(
            &self,
            _path: &Path,
            _max_frames: Option<u64>,
        ) -> Result<Box<dyn FrameSource>, FfmpegError> {
            Ok(Box::new(ScriptedSource::frames(self.0)))
        }
    }

    #[tokio::test]
    async fn run_file_reads_frames_through_the_opener() {
        let p = pipeline(PipelineOptions::default()).with_opener(Arc::new(ScriptedOpener(3)));
        let out = p.run_file(Path::new("clip.mp4"), "run").await.unwrap();
        assert_eq!(out.frames_processed, 3);
        assert_eq!(out.summary.top_label(), Some("T-90"));
    }

    #[tokio::test]
    async fn missing_video_is_an_input_error() {
        let err = pipeline(PipelineOptions::default())
            .run_file(Path::new("/no/such/upload.mp4"), "run")
            .await
            .unwrap_err();
        assert!(err.is_input_error());
    }
}
