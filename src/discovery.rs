use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use walkdir::WalkDir;

use crate::config::ConfigError;

/// Pick the most recently modified `*.*` file directly inside `log_dir`.
///
/// Hidden files and subdirectories are ignored.
pub fn newest_log(log_dir: &Path) -> Result<PathBuf, ConfigError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(log_dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(ConfigError::LogDirUnreadable(log_dir.to_path_buf(), e))
            }
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let is_candidate = entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|s| !s.starts_with('.') && s.contains('.'));
        if is_candidate {
            entries.push(entry);
        }
    }
    tracing::debug!("Entries: {:?}", entries);

    entries
        .into_iter()
        .map(|entry| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|metadata| metadata.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.into_path())
        })
        .max()
        .map(|(_, path)| path)
        .ok_or_else(|| ConfigError::NoLogFile(log_dir.to_path_buf()))
}
