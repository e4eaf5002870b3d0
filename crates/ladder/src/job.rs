use std::path::PathBuf;
use std::time::Duration;
use humansize::{format_size, DECIMAL};
use log::{error, info};
use thiserror::Error;
use crate::config::LadderConfig;
use crate::ffmpeg::{CommandBuilder, TranscodeError, TranscodeRequest, Transcoder};
use crate::quality::QualityTier;

/// One invocation of the transcoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeJob {
    /// File name of the input, relative to the batch root for origin jobs and
    /// to the output directory otherwise
    pub source: String,
    /// File name of the output, always relative to the output directory
    pub dest: String,
    pub tier: QualityTier,
    pub is_origin_source: bool,
    pub apply_watermark: bool,
}

impl EncodeJob {
    /// First encode of a source file: read from the batch root, watermarked
    pub fn origin(source: impl Into<String>, dest: impl Into<String>, tier: QualityTier) -> Self {
        EncodeJob {
            source: source.into(),
            dest: dest.into(),
            tier,
            is_origin_source: true,
            apply_watermark: true,
        }
    }

    /// Lower-tier encode of a file already in the output directory
    pub fn derivative(source: impl Into<String>, dest: impl Into<String>, tier: QualityTier) -> Self {
        EncodeJob {
            source: source.into(),
            dest: dest.into(),
            tier,
            is_origin_source: false,
            apply_watermark: false,
        }
    }

    pub fn source_path(&self, cfg: &LadderConfig) -> PathBuf {
        if self.is_origin_source {
            cfg.batch_root.join(&self.source)
        } else {
            cfg.output_dir().join(&self.source)
        }
    }

    pub fn dest_path(&self, cfg: &LadderConfig) -> PathBuf {
        cfg.output_dir().join(&self.dest)
    }

    /// Build the transcoder request for this job
    pub fn request(&self, cfg: &LadderConfig) -> TranscodeRequest {
        let params = self.tier.params();
        let watermark = self.apply_watermark.then_some(&cfg.watermark);

        TranscodeRequest {
            input: self.source_path(cfg),
            output: self.dest_path(cfg),
            video_filter: CommandBuilder::new().build_filter_chain(&params, watermark),
            max_bitrate: params.max_bitrate.to_string(),
            audio: cfg.audio.clone(),
        }
    }
}

/// A job that did not complete
#[derive(Debug, Error)]
#[error("encoding {} -> {} failed: {}", .source_path.display(), .dest_path.display(), .cause)]
pub struct JobError {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    #[source]
    pub cause: TranscodeError,
}

/// Run a single job to completion.
///
/// Errors are logged with full context here and returned to the caller, which
/// decides whether to carry on. Nothing a job does can abort the caller's loop.
pub async fn run_job<T>(cfg: &LadderConfig, transcoder: &T, job: &EncodeJob) -> Result<Duration, JobError>
where
    T: Transcoder + ?Sized,
{
    let request = job.request(cfg);

    info!("=============== Now encoding... ===============");
    info!("encoding [{}]: {} -> {}", job.tier, request.input.display(), request.output.display());

    match transcoder.execute(&request).await {
        Ok(elapsed) => {
            let size = std::fs::metadata(&request.output)
                .map(|m| format_size(m.len(), DECIMAL))
                .unwrap_or_else(|_| "unknown size".to_string());
            info!("complete: {} ({}) in {:.2?}", request.output.display(), size, elapsed);
            Ok(elapsed)
        }
        Err(cause) => {
            error!("error in encoding");
            error!("{} encoding to {}", request.input.display(), request.output.display());
            error!("{}", cause);
            Err(JobError {
                source_path: request.input,
                dest_path: request.output,
                cause,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffmpeg::MockTranscoder;
    use mockall::predicate::always;

    fn cfg() -> LadderConfig {
        LadderConfig::for_root("/videos")
    }

    #[test]
    fn test_origin_job_reads_from_root() {
        let job = EncodeJob::origin("clip_1080p.mkv", "clip_1080p.mp4", QualityTier::P1080);
        let req = job.request(&cfg());
        assert_eq!(req.input, PathBuf::from("/videos/clip_1080p.mkv"));
        assert_eq!(req.output, PathBuf::from("/videos/encoding/clip_1080p.mp4"));
        assert_eq!(req.max_bitrate, "4000k");
        assert!(req.video_filter.starts_with("scale=1920:-2, drawtext="));
    }

    #[test]
    fn test_derivative_job_reads_from_output_dir() {
        let job = EncodeJob::derivative("clip_1080p.mp4", "clip_360p.mp4", QualityTier::P360);
        let req = job.request(&cfg());
        assert_eq!(req.input, PathBuf::from("/videos/encoding/clip_1080p.mp4"));
        assert_eq!(req.output, PathBuf::from("/videos/encoding/clip_360p.mp4"));
        assert_eq!(req.video_filter, "scale=640:-2");
        assert_eq!(req.max_bitrate, "700k");
        assert_eq!(req.audio.bitrate, "128k");
        assert_eq!(req.audio.channels, 2);
    }

    #[tokio::test]
    async fn test_success_returns_elapsed() {
        let mut mock = MockTranscoder::new();
        mock.expect_execute()
            .with(always())
            .times(1)
            .returning(|_| Ok(Duration::from_millis(1500)));

        let job = EncodeJob::derivative("clip_720p.mp4", "clip_180p.mp4", QualityTier::P180);
        let elapsed = run_job(&cfg(), &mock, &job).await.unwrap();
        assert_eq!(elapsed, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_failure_carries_paths() {
        let mut mock = MockTranscoder::new();
        mock.expect_execute().times(1).returning(|_| {
            Err(TranscodeError::Launch {
                program: "ffmpeg".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })
        });

        let job = EncodeJob::origin("clip_720p.avi", "clip_720p.mp4", QualityTier::P720);
        let err = run_job(&cfg(), &mock, &job).await.unwrap_err();
        assert_eq!(err.source_path, PathBuf::from("/videos/clip_720p.avi"));
        assert_eq!(err.dest_path, PathBuf::from("/videos/encoding/clip_720p.mp4"));
        assert!(matches!(err.cause, TranscodeError::Launch { .. }));
        assert!(err.to_string().contains("clip_720p.avi"));
    }

    /// No timeout is applied: the runner returns only once the transcoder does,
    /// however long that takes.
    #[tokio::test]
    async fn test_waits_without_timeout() {
        struct SlowTranscoder;

        #[async_trait::async_trait]
        impl Transcoder for SlowTranscoder {
            async fn execute(&self, _request: &TranscodeRequest) -> Result<Duration, TranscodeError> {
                let start = std::time::Instant::now();
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(start.elapsed())
            }
        }

        let job = EncodeJob::derivative("a_1080p.mp4", "a_720p.mp4", QualityTier::P720);
        let elapsed = run_job(&cfg(), &SlowTranscoder, &job).await.unwrap();
        assert!(elapsed >= Duration::from_millis(50));
    }
}
