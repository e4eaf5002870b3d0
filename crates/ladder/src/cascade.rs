//! Lower-tier encodes triggered by a finished encode.
//!
//! Every derivative is re-scaled from the file that triggered the cascade, never
//! from the previous derivative.

use std::time::Duration;
use log::{info, warn};
use crate::config::LadderConfig;
use crate::ffmpeg::Transcoder;
use crate::job::{run_job, EncodeJob, JobError};
use crate::naming::parse_file_name;
use crate::quality::QualityTier;

/// Tiers produced after an encode at the key tier, in production order
const CASCADE: &[(QualityTier, &[QualityTier])] = &[
    (QualityTier::P1080, &[QualityTier::P720, QualityTier::P360, QualityTier::P180]),
    (QualityTier::P720, &[QualityTier::P360, QualityTier::P180]),
    (QualityTier::P360, &[QualityTier::P180]),
    (QualityTier::P180, &[]),
];

/// Tiers to derive from an encode at `tier`
pub fn lower_tiers(tier: QualityTier) -> &'static [QualityTier] {
    CASCADE
        .iter()
        .find(|(from, _)| *from == tier)
        .map(|(_, to)| *to)
        .unwrap_or(&[])
}

/// Plan the derivative jobs for a file that was just written to the output directory.
///
/// Names that do not parse or carry an unknown quality label end the cascade
/// without error.
pub fn plan_cascade(produced: &str) -> Vec<EncodeJob> {
    let identity = match parse_file_name(produced) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("{}", e);
            info!("no further encoding: {}", produced);
            return Vec::new();
        }
    };

    let tiers = identity.tier().map(lower_tiers).unwrap_or(&[]);
    if tiers.is_empty() {
        info!("no further encoding: {}", produced);
        return Vec::new();
    }

    tiers
        .iter()
        .map(|&tier| EncodeJob::derivative(produced, identity.file_name_for(tier), tier))
        .collect()
}

/// Run every planned derivative in order.
///
/// A failed derivative is reported and the next one still runs, since each only
/// depends on `produced`.
pub async fn run_cascade<T>(
    cfg: &LadderConfig,
    transcoder: &T,
    produced: &str,
) -> Vec<(EncodeJob, Result<Duration, JobError>)>
where
    T: Transcoder + ?Sized,
{
    let mut results = Vec::new();
    for job in plan_cascade(produced) {
        let result = run_job(cfg, transcoder, &job).await;
        results.push((job, result));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffmpeg::{MockTranscoder, TranscodeError, TranscodeRequest};
    use mockall::Sequence;
    use proptest::prelude::*;
    use std::path::PathBuf;
    use std::sync::{Mutex, Once};

    /// Records every log message emitted by this test binary
    struct CaptureLogger(Mutex<Vec<String>>);

    impl log::Log for CaptureLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            self.0.lock().unwrap().push(record.args().to_string());
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger(Mutex::new(Vec::new()));

    fn captured_logs() -> Vec<String> {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(log::LevelFilter::Info);
        });
        LOGGER.0.lock().unwrap().clone()
    }

    #[test]
    fn test_cascade_from_1080p() {
        let jobs = plan_cascade("clip_1080p.mp4");
        let tiers: Vec<_> = jobs.iter().map(|j| j.tier).collect();
        assert_eq!(tiers, vec![QualityTier::P720, QualityTier::P360, QualityTier::P180]);

        let dests: Vec<_> = jobs.iter().map(|j| j.dest.as_str()).collect();
        assert_eq!(dests, vec!["clip_720p.mp4", "clip_360p.mp4", "clip_180p.mp4"]);

        for job in &jobs {
            assert!(!job.is_origin_source);
            assert!(!job.apply_watermark);
        }
    }

    #[test]
    fn test_cascade_from_720p_and_360p() {
        let tiers: Vec<_> = plan_cascade("clip_720p.mp4").iter().map(|j| j.tier).collect();
        assert_eq!(tiers, vec![QualityTier::P360, QualityTier::P180]);

        let tiers: Vec<_> = plan_cascade("clip_360p.mp4").iter().map(|j| j.tier).collect();
        assert_eq!(tiers, vec![QualityTier::P180]);
    }

    #[test]
    fn test_terminal_cases() {
        assert!(plan_cascade("clip_180p.mp4").is_empty());
        assert!(plan_cascade("clip_4k.mp4").is_empty());
        assert!(plan_cascade("clip_1080P.mp4").is_empty());
        assert!(plan_cascade("movie.mp4").is_empty());
        assert!(plan_cascade("clip_1080p").is_empty());
    }

    #[test]
    fn test_terminal_cases_log_notice() {
        captured_logs();
        assert!(plan_cascade("clip_180p.mp4").is_empty());
        assert!(plan_cascade("clip_4k.mp4").is_empty());
        assert!(!plan_cascade("clip_720p.mp4").is_empty());

        let logs = captured_logs();
        assert!(logs.iter().any(|m| m == "no further encoding: clip_180p.mp4"), "{:?}", logs);
        assert!(logs.iter().any(|m| m == "no further encoding: clip_4k.mp4"), "{:?}", logs);
        assert!(!logs.iter().any(|m| m == "no further encoding: clip_720p.mp4"));
    }

    /// Derivatives are all sourced from the origin output. A serial chain
    /// (720p from 1080p, 360p from 720p, ...) would fail here.
    #[test]
    fn test_derivatives_source_from_origin_output() {
        let jobs = plan_cascade("clip_1080p.mp4");
        for job in &jobs {
            assert_eq!(job.source, "clip_1080p.mp4");
        }
        assert_ne!(jobs[1].source, jobs[0].dest);
        assert_ne!(jobs[2].source, jobs[1].dest);
    }

    #[tokio::test]
    async fn test_run_cascade_in_order() {
        let cfg = LadderConfig::for_root("/videos");
        let mut mock = MockTranscoder::new();
        let mut seq = Sequence::new();

        for (scale, dest) in [
            ("scale=1280:-2", "clip_720p.mp4"),
            ("scale=640:-2", "clip_360p.mp4"),
            ("scale=320:-2", "clip_180p.mp4"),
        ] {
            let dest = PathBuf::from("/videos/encoding").join(dest);
            mock.expect_execute()
                .withf(move |req: &TranscodeRequest| {
                    req.input == PathBuf::from("/videos/encoding/clip_1080p.mp4")
                        && req.output == dest
                        && req.video_filter == scale
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(Duration::from_secs(1)));
        }

        let results = run_cascade(&cfg, &mock, "clip_1080p.mp4").await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
    }

    #[tokio::test]
    async fn test_failed_derivative_does_not_stop_cascade() {
        let cfg = LadderConfig::for_root("/videos");
        let mut mock = MockTranscoder::new();
        mock.expect_execute()
            .withf(|req: &TranscodeRequest| req.output.ends_with("clip_360p.mp4"))
            .times(1)
            .returning(|_| {
                Err(TranscodeError::Launch {
                    program: "ffmpeg".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
                })
            });
        mock.expect_execute()
            .withf(|req: &TranscodeRequest| req.output.ends_with("clip_180p.mp4"))
            .times(1)
            .returning(|_| Ok(Duration::from_secs(1)));

        let results = run_cascade(&cfg, &mock, "clip_720p.mp4").await;
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_err());
        assert_eq!(results[1].0.tier, QualityTier::P180);
        assert!(results[1].1.is_ok());
    }

    #[tokio::test]
    async fn test_terminal_cascade_runs_nothing() {
        let cfg = LadderConfig::for_root("/videos");
        let mut mock = MockTranscoder::new();
        mock.expect_execute().times(0);

        assert!(run_cascade(&cfg, &mock, "clip_180p.mp4").await.is_empty());
        assert!(run_cascade(&cfg, &mock, "clip_8k.mp4").await.is_empty());
    }

    proptest! {
        /// Cascades are strictly descending and cover every lower tier
        #[test]
        fn test_cascade_covers_all_lower_tiers(idx in 0usize..4, title in "[a-z0-9_]{1,16}") {
            let tier = QualityTier::ALL[idx];
            let produced = format!("{}_{}.mp4", title, tier.label());
            let jobs = plan_cascade(&produced);

            let tiers: Vec<_> = jobs.iter().map(|j| j.tier).collect();
            prop_assert_eq!(&tiers[..], &QualityTier::ALL[idx + 1..]);
            for job in &jobs {
                prop_assert_eq!(&job.source, &produced);
                prop_assert_eq!(&job.dest, &format!("{}_{}.mp4", title, job.tier.label()));
                prop_assert!(!job.is_origin_source && !job.apply_watermark);
            }
        }
    }
}
