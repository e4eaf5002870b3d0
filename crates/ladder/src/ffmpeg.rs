use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use async_trait::async_trait;
use log::debug;
use thiserror::Error;
use tokio::process::Command;
use crate::config::{AudioParams, WatermarkConfig};
use crate::quality::EncodingParams;

/// Everything the external tool needs for one encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Complete `-vf` argument
    pub video_filter: String,
    /// Value passed to `-maxrate`
    pub max_bitrate: String,
    pub audio: AudioParams,
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited unsuccessfully ({status})")]
    Exit {
        program: String,
        status: ExitStatus,
    },
}

/// Capability to run one encode to completion.
///
/// Implementations return the wall-clock time between process start and exit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder {
    async fn execute(&self, request: &TranscodeRequest) -> Result<Duration, TranscodeError>;
}

/// Runs a local ffmpeg binary attached to our stdin, stdout and stderr.
///
/// No `-y`/`-n` is passed, so an existing output makes ffmpeg ask on the
/// terminal whether to overwrite it.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    pub ffmpeg_bin: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_bin: impl Into<PathBuf>) -> Self {
        FfmpegTranscoder { ffmpeg_bin: ffmpeg_bin.into() }
    }

    fn command(&self, request: &TranscodeRequest) -> Command {
        let mut command = Command::new(&self.ffmpeg_bin);
        command
            .args(CommandBuilder::new().build_encode_command(request))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    /// There is no timeout: a process that never exits blocks the caller forever.
    async fn execute(&self, request: &TranscodeRequest) -> Result<Duration, TranscodeError> {
        let program = self.ffmpeg_bin.display().to_string();
        let mut command = self.command(request);
        debug!("Executing: {} {:?}", program, command.as_std().get_args().collect::<Vec<_>>());

        let mut child = command
            .spawn()
            .map_err(|source| TranscodeError::Launch { program: program.clone(), source })?;

        let start = Instant::now();
        let status = child
            .wait()
            .await
            .map_err(|source| TranscodeError::Wait { program: program.clone(), source })?;

        if !status.success() {
            return Err(TranscodeError::Exit { program, status });
        }

        Ok(start.elapsed())
    }
}

/// Command builder for generating ffmpeg command lines
pub struct CommandBuilder;

impl CommandBuilder {
    pub fn new() -> Self {
        CommandBuilder
    }

    /// Build the scale filter, optionally followed by the watermark overlay.
    ///
    /// The layout (`, ` separator, escaped commas inside `enable`, trailing `:`)
    /// must stay byte-for-byte stable. Font path and text are escaped with
    /// [`escape_filter_value`].
    pub fn build_filter_chain(&self, params: &EncodingParams, watermark: Option<&WatermarkConfig>) -> String {
        let scale = format!("scale={}", params.scale);
        match watermark {
            None => scale,
            Some(wm) => format!(
                "{}, drawtext=fontsize={}:fontfile={}:text={}:x=(w-text_w)/2:y=20:fontcolor=white:enable=lt(mod(t\\,{})\\,{}):",
                scale,
                wm.font_size,
                escape_filter_value(&wm.font_file),
                escape_filter_value(&wm.text),
                wm.period_secs,
                wm.visible_secs
            ),
        }
    }

    /// Arguments for one encode, program name excluded
    pub fn build_encode_command(&self, request: &TranscodeRequest) -> Vec<String> {
        vec![
            "-i".to_string(),
            path_arg(&request.input),
            "-vf".to_string(),
            request.video_filter.clone(),
            "-maxrate".to_string(),
            request.max_bitrate.clone(),
            "-b:a".to_string(),
            request.audio.bitrate.clone(),
            "-ac".to_string(),
            request.audio.channels.to_string(),
            path_arg(&request.output),
        ]
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Escape a filter option value for use inside a `-vf` filtergraph.
///
/// ffmpeg unescapes twice: once when splitting the graph into filters and once
/// when splitting a filter's `key=value` options. The option level covers
/// `\`, `'` and `:`; the graph level then covers `\`, `'`, `,`, `;`, `[` and `]`.
pub fn escape_filter_value(value: &str) -> String {
    let option_level = escape_chars(value, &['\\', '\'', ':']);
    escape_chars(&option_level, &['\\', '\'', ',', ';', '[', ']'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
