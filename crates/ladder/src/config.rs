use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Audio settings applied to every job regardless of tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioParams {
    /// Value passed to `-b:a`
    pub bitrate: String,
    /// Value passed to `-ac`
    pub channels: u32,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            bitrate: "128k".to_string(),
            channels: 2,
        }
    }
}

/// Burned-in text overlay applied to origin encodes.
///
/// The text is visible for the first `visible_secs` of every `period_secs` window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub text: String,
    pub font_file: String,
    pub font_size: u32,
    pub visible_secs: u32,
    pub period_secs: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "Video ini hanya digunakan untuk tes.".to_string(),
            font_file: "C:/Temp/FFmpeg/impact.ttf".to_string(),
            font_size: 30,
            visible_secs: 10,
            period_secs: 60,
        }
    }
}

/// Configuration for one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderConfig {
    /// Directory scanned (non-recursively) for source videos
    pub batch_root: PathBuf,
    /// Name of the output directory created under `batch_root`
    pub output_subdir: String,
    /// Name of the append-only log file inside the output directory
    pub log_file_name: String,
    /// Recognized source extensions, leading dot included, matched case-sensitively
    pub input_extensions: Vec<String>,
    /// Path to the ffmpeg binary
    pub ffmpeg_bin: PathBuf,
    pub audio: AudioParams,
    pub watermark: WatermarkConfig,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl LadderConfig {
    /// Create a default configuration rooted next to the running executable
    pub fn default_config() -> Self {
        Self {
            batch_root: default_batch_root(),
            output_subdir: "encoding".to_string(),
            log_file_name: "log.txt".to_string(),
            input_extensions: vec![".mp4".to_string(), ".mkv".to_string(), ".avi".to_string()],
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            audio: AudioParams::default(),
            watermark: WatermarkConfig::default(),
        }
    }

    /// Default configuration with a specific batch root
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            batch_root: root.into(),
            ..Self::default_config()
        }
    }

    /// Load configuration from a file, or return defaults if path is None or file doesn't exist
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();

        if let Some(config_path) = path {
            if config_path.exists() {
                let content = std::fs::read_to_string(config_path)
                    .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

                // TOML by extension, JSON otherwise
                if config_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                    config = toml::from_str(&content)
                        .with_context(|| format!("Failed to parse TOML config: {}", config_path.display()))?;
                } else {
                    config = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse JSON config: {}", config_path.display()))?;
                }
            }
        }

        Ok(config)
    }

    /// Directory every encode is written to
    pub fn output_dir(&self) -> PathBuf {
        self.batch_root.join(&self.output_subdir)
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir().join(&self.log_file_name)
    }

    /// Whether `ext` (with its leading dot) is a recognized source extension
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.input_extensions.iter().any(|e| e == ext)
    }

    /// Create the output directory if it is missing.
    ///
    /// Returns `true` when the directory was created by this call. An existing
    /// directory and its contents are left alone.
    pub fn ensure_output_dir(&self) -> Result<bool> {
        let dir = self.output_dir();
        if dir.is_dir() {
            return Ok(false);
        }

        let mut builder = std::fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o754);
        }

        match builder.create(&dir) {
            Ok(()) => Ok(true),
            // Lost a race with another creator; still fine.
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to create output directory: {}", dir.display())),
        }
    }
}

fn default_batch_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
