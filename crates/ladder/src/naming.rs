use thiserror::Error;
use crate::quality::QualityTier;

/// Container every output is written as
pub const OUTPUT_EXTENSION: &str = ".mp4";

/// A file name that does not follow the `<title>_<quality>.<ext>` convention
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("malformed file name {0:?}: no extension")]
    MissingExtension(String),
    #[error("malformed file name {0:?}: no '_' between title and quality")]
    MissingSeparator(String),
}

/// Title and quality label recovered from a file name.
///
/// The quality is kept as the raw label. Labels outside the catalog are
/// accepted here and only resolve to `None` through [`VideoIdentity::tier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoIdentity {
    pub title: String,
    pub quality: String,
}

impl VideoIdentity {
    /// Resolve the quality label against the catalog
    pub fn tier(&self) -> Option<QualityTier> {
        QualityTier::from_label(&self.quality)
    }

    /// Output file name for this title at another tier
    pub fn file_name_for(&self, tier: QualityTier) -> String {
        render_file_name(&self.title, tier.label())
    }
}

/// Extension of `file_name` including the leading dot, if any.
///
/// Only the final path component is considered, so `dir.v2/clip` has no extension.
pub fn extension(file_name: &str) -> Option<&str> {
    let base_start = file_name.rfind(|c: char| c == '/' || c == '\\').map(|i| i + 1).unwrap_or(0);
    file_name[base_start..]
        .rfind('.')
        .map(|dot| &file_name[base_start + dot..])
}

/// Split `<title>_<quality>.<ext>` into its title and quality label.
///
/// The title is everything before the last underscore of the name without its
/// extension, so `my_holiday_720p.mkv` yields title `my_holiday`.
pub fn parse_file_name(file_name: &str) -> Result<VideoIdentity, NamingError> {
    let ext = extension(file_name)
        .ok_or_else(|| NamingError::MissingExtension(file_name.to_string()))?;
    let stem = &file_name[..file_name.len() - ext.len()];

    let sep = stem
        .rfind('_')
        .ok_or_else(|| NamingError::MissingSeparator(file_name.to_string()))?;

    Ok(VideoIdentity {
        title: stem[..sep].to_string(),
        quality: stem[sep + 1..].to_string(),
    })
}

/// Render the output file name. Always `.mp4`, whatever the source container was.
pub fn render_file_name(title: &str, quality: &str) -> String {
    format!("{}_{}{}", title, quality, OUTPUT_EXTENSION)
}
