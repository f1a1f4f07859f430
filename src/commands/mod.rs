pub mod annotate;
pub mod blame;
pub mod events;
pub mod show;
pub mod stats;

use std::path::Path;

use crate::error::AttributionError;

/// Resolve a file argument against the current directory so that paths given
/// from a subdirectory of the worktree still point at the right file.
pub(crate) fn absolute_file_arg(file: &str) -> Result<String, AttributionError> {
    let path = Path::new(file);
    if path.is_absolute() {
        return Ok(file.to_string());
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path).to_string_lossy().to_string())
}
