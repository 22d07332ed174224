pub mod inspect;
pub mod replay;

pub use inspect::{inspect, InspectArgs};
pub use replay::{replay, ReplayArgs};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Read a log file given relative to `cwd` or as an absolute path
pub(crate) fn read_log(cwd: &str, path: &Path) -> Result<String> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        PathBuf::from(cwd).join(path)
    };
    std::fs::read_to_string(&path).with_context(|| format!("Cannot read operation log {}", path.display()))
}
