use std::path::PathBuf;
use log::{debug, info, warn};
use thiserror::Error;
use walkdir::WalkDir;
use crate::config::LadderConfig;
use crate::naming::extension;

/// The batch root could not be listed
#[derive(Debug, Error)]
#[error("failed to read batch root {}: {source}", .root.display())]
pub struct ScanError {
    pub root: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Result of scanning one entry of the batch root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// Eligible source file (file name relative to the batch root)
    Candidate(String),
    /// Entry that will not be encoded (path, reason)
    Skipped(PathBuf, String),
}

/// List the immediate entries of the batch root, in file-name order.
///
/// Subdirectories are never descended into. Entries that cannot be read are
/// skipped with a warning; only a failure to read the root itself is an error.
pub fn scan_batch_root(cfg: &LadderConfig) -> Result<Vec<ScanResult>, ScanError> {
    let root = &cfg.batch_root;
    info!("Scanning directory: {}", root.display());

    // walkdir would report an unreadable root as just another bad entry
    std::fs::read_dir(root).map_err(|source| ScanError {
        root: root.clone(),
        source,
    })?;

    let mut results = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Error reading directory entry: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_dir() {
            debug!("Skipping directory: {}", path.display());
            results.push(ScanResult::Skipped(path.to_path_buf(), "directory".to_string()));
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            warn!("Skipping non UTF-8 file name: {}", path.display());
            results.push(ScanResult::Skipped(path.to_path_buf(), "non UTF-8 name".to_string()));
            continue;
        };

        match extension(name) {
            Some(ext) if cfg.accepts_extension(ext) => {
                debug!("Found candidate: {}", name);
                results.push(ScanResult::Candidate(name.to_string()));
            }
            _ => {
                results.push(ScanResult::Skipped(path.to_path_buf(), "unrecognized extension".to_string()));
            }
        }
    }

    let candidates = results.iter().filter(|r| matches!(r, ScanResult::Candidate(_))).count();
    info!("Scan complete: {} entries, {} candidates", results.len(), candidates);
    Ok(results)
}
