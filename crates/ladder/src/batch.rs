use std::path::PathBuf;
use std::time::Duration;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use thiserror::Error;
use crate::cascade::run_cascade;
use crate::config::LadderConfig;
use crate::ffmpeg::Transcoder;
use crate::job::{run_job, EncodeJob, JobError};
use crate::naming::parse_file_name;
use crate::quality::QualityTier;
use crate::scan::{scan_batch_root, ScanError, ScanResult};

/// Errors that end a batch run
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Outcome of one encode job
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub tier: QualityTier,
    pub is_origin: bool,
    pub elapsed_ms: Option<u64>,
    pub error: Option<String>,
}

impl JobOutcome {
    fn new(cfg: &LadderConfig, job: &EncodeJob, result: &Result<Duration, JobError>) -> Self {
        let (elapsed_ms, error) = match result {
            Ok(elapsed) => (Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)), None),
            Err(e) => (None, Some(e.to_string())),
        };
        JobOutcome {
            source: job.source_path(cfg),
            dest: job.dest_path(cfg),
            tier: job.tier,
            is_origin: job.is_origin_source,
            elapsed_ms,
            error,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Eligible source files found in the batch root
    pub files_seen: usize,
    /// Eligible files whose name did not yield a known tier
    pub files_skipped: usize,
    pub jobs: Vec<JobOutcome>,
}

impl BatchReport {
    fn new() -> Self {
        BatchReport {
            started_at: Utc::now(),
            finished_at: None,
            files_seen: 0,
            files_skipped: 0,
            jobs: Vec::new(),
        }
    }

    pub fn completed(&self) -> usize {
        self.jobs.iter().filter(|j| j.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.jobs.len() - self.completed()
    }
}

/// Encode every eligible file in the batch root, one file at a time.
///
/// Each file gets an origin encode followed by its full cascade before the next
/// file starts. Job failures are recorded and the run continues; only an
/// unreadable batch root aborts.
pub async fn run_batch<T>(cfg: &LadderConfig, transcoder: &T) -> Result<BatchReport, BatchError>
where
    T: Transcoder + ?Sized,
{
    let mut report = BatchReport::new();

    for entry in scan_batch_root(cfg)? {
        let name = match entry {
            ScanResult::Candidate(name) => name,
            ScanResult::Skipped(..) => continue,
        };
        report.files_seen += 1;
        encode_file(cfg, transcoder, &name, &mut report).await;
    }

    report.finished_at = Some(Utc::now());
    info!(
        "Batch complete: {} file(s), {} skipped, {} job(s) succeeded, {} failed",
        report.files_seen,
        report.files_skipped,
        report.completed(),
        report.failed()
    );
    Ok(report)
}

/// Origin encode of one source file, then its cascade.
///
/// The cascade runs even when the origin encode fails: an output left by an
/// earlier run still feeds the lower tiers, and a missing one fails each
/// derivative job on its own.
async fn encode_file<T>(cfg: &LadderConfig, transcoder: &T, name: &str, report: &mut BatchReport)
where
    T: Transcoder + ?Sized,
{
    let identity = match parse_file_name(name) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Skipping {}: {}", name, e);
            report.files_skipped += 1;
            return;
        }
    };
    let Some(tier) = identity.tier() else {
        warn!("Skipping {}: unknown quality label {:?}", name, identity.quality);
        report.files_skipped += 1;
        return;
    };

    let origin = EncodeJob::origin(name, identity.file_name_for(tier), tier);
    let result = run_job(cfg, transcoder, &origin).await;
    report.jobs.push(JobOutcome::new(cfg, &origin, &result));

    if result.is_err() {
        error!("Origin encode of {} failed, cascading from {} anyway", name, origin.dest);
    }

    for (job, result) in run_cascade(cfg, transcoder, &origin.dest).await {
        report.jobs.push(JobOutcome::new(cfg, &job, &result));
    }
}
