use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use log::{debug, info};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MarkerState {
    /// The marker did not exist and has just been created.
    FirstRun,
    /// The marker was already present; it is left untouched.
    SecondRun,
}

/// Detect a repeated run through the presence of `path`, creating it on the
/// first run. The marker is never removed.
pub fn check_and_touch(path: &Path) -> io::Result<MarkerState> {
    if path.try_exists()? {
        debug!("marker {} already present", path.display());
        return Ok(MarkerState::SecondRun);
    }

    OpenOptions::new().create(true).append(true).open(path)?;
    info!("created marker {}", path.display());
    Ok(MarkerState::FirstRun)
}
