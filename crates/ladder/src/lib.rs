pub mod config;
pub mod quality;
pub mod naming;
pub mod ffmpeg;
pub mod job;
pub mod cascade;
pub mod scan;
pub mod batch;

pub use config::LadderConfig;
pub use quality::{EncodingParams, QualityTier};
pub use naming::{parse_file_name, render_file_name, NamingError, VideoIdentity};
pub use ffmpeg::{FfmpegTranscoder, TranscodeError, TranscodeRequest, Transcoder};
pub use job::{run_job, EncodeJob, JobError};
pub use cascade::{plan_cascade, run_cascade};
pub use batch::{run_batch, BatchError, BatchReport, JobOutcome};
