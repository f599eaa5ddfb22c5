//! Path resolution for the probe's fixture data and the Chrome debug log
//!
//! The tab-switching fixtures live in a fixed tree relative to the probe
//! executable: `<exe_dir>/../../data/tab_switching/<site>/index.html`.
//! The debug log is written by Chrome into the profile directory when
//! logging is enabled at launch.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// File name Chrome writes its debug log to when --enable-logging is set
pub const CHROME_DEBUG_LOG: &str = "chrome_debug.log";

/// Number of directory levels between the executable and the data tree root
const EXE_ASCENT_LEVELS: usize = 2;

/// Path resolution errors
///
/// All of these are fatal: the probe cannot run without its fixture tree.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Failed to resolve executable path: {0}")]
    ExeResolution(#[from] std::io::Error),

    #[error("Executable path {0} has no parent directory")]
    NoParent(PathBuf),
}

/// Resolve the fixture data prefix.
///
/// With an override (from config) the override is used as-is. Otherwise the
/// prefix is derived from the running executable's directory, ascending two
/// levels and appending the fixed `data/tab_switching` segments.
pub fn data_prefix(override_dir: Option<&Path>) -> Result<PathBuf, PathError> {
    if let Some(dir) = override_dir {
        return Ok(dir.to_path_buf());
    }

    let exe = std::env::current_exe()?;
    let mut dir = exe
        .parent()
        .ok_or_else(|| PathError::NoParent(exe.clone()))?
        .to_path_buf();

    for _ in 0..EXE_ASCENT_LEVELS {
        dir = dir
            .parent()
            .ok_or_else(|| PathError::NoParent(dir.clone()))?
            .to_path_buf();
    }

    Ok(dir.join("data").join("tab_switching"))
}

/// Full path of the Chrome debug log inside the given log directory
pub fn chrome_log_file(log_dir: &Path) -> PathBuf {
    log_dir.join(CHROME_DEBUG_LOG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_prefix_uses_override() {
        let prefix = data_prefix(Some(Path::new("/fixtures/tab_switching"))).unwrap();
        assert_eq!(prefix, PathBuf::from("/fixtures/tab_switching"));
    }

    #[test]
    fn test_data_prefix_from_exe_ends_with_fixed_segments() {
        let prefix = data_prefix(None).unwrap();
        assert!(prefix.ends_with(Path::new("data/tab_switching")));
    }

    #[test]
    fn test_chrome_log_file_appends_fixed_name() {
        let log = chrome_log_file(Path::new("/tmp/profile"));
        assert_eq!(log, PathBuf::from("/tmp/profile/chrome_debug.log"));
    }
}
