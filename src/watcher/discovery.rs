//! Game log discovery.
//!
//! Locates the game's `Game.log` when no path is given.

use std::path::{Path, PathBuf};

/// File name the game writes its log to.
pub const LOG_FILE_NAME: &str = "Game.log";

const INSTALL_DIR: &str = "Program Files/Roberts Space Industries/StarCitizen";
const CHANNELS: [&str; 2] = ["LIVE", "PTU"];
const DRIVES: [char; 5] = ['C', 'D', 'E', 'F', 'G'];

/// Candidate log locations in search order.
///
/// The working directory and its parent come first, then the default
/// install directory of each release channel on common drive letters.
#[must_use]
pub fn default_log_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![
        PathBuf::from(LOG_FILE_NAME),
        Path::new("..").join(LOG_FILE_NAME),
    ];
    for channel in CHANNELS {
        for drive in DRIVES {
            candidates.push(
                PathBuf::from(format!("{drive}:/"))
                    .join(INSTALL_DIR)
                    .join(channel)
                    .join(LOG_FILE_NAME),
            );
        }
    }
    candidates
}

/// First candidate that is an existing regular file.
#[must_use]
pub fn find_log_file<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|path| path.is_file())
        .map(Path::to_path_buf)
}

/// Locate the game log in the default locations.
///
/// Returns `None` if no candidate exists.
#[must_use]
pub fn discover_log() -> Option<PathBuf> {
    let found = find_log_file(&default_log_candidates());
    match &found {
        Some(path) => tracing::debug!(path = %path.display(), "Discovered game log"),
        None => tracing::debug!("No game log found in default locations"),
    }
    found
}
