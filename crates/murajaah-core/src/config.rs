//! Engine configuration
//!
//! Values are passed into [`crate::storage::Storage`] explicitly; nothing in
//! the engine reads ambient globals after construction.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::storage::{Result, StorageError};

/// Unresolved failures after which an anchor is suspended
pub const DEFAULT_SUSPENSION_THRESHOLD: usize = 3;

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "murajaah.db";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "MURAJAAH_DATA_DIR";

/// Environment variable overriding the suspension threshold
pub const SUSPENSION_THRESHOLD_ENV: &str = "MURAJAAH_SUSPENSION_THRESHOLD";

/// Tunables for the review engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Unresolved failures after which an anchor is suspended
    pub suspension_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suspension_threshold: DEFAULT_SUSPENSION_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by environment variables that parse.
    ///
    /// A threshold of zero would suspend every anchor, so it is ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(threshold) = std::env::var(SUSPENSION_THRESHOLD_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|t| *t > 0)
        {
            config.suspension_threshold = threshold;
        }
        config
    }
}

/// Resolve the data directory: explicit path, then `MURAJAAH_DATA_DIR`,
/// then the platform data directory. The directory is created if missing.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match explicit.or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from)) {
        Some(dir) => dir,
        None => {
            let proj_dirs = ProjectDirs::from("com", "murajaah", "core").ok_or_else(|| {
                StorageError::Init("Could not determine project directories".to_string())
            })?;
            proj_dirs.data_dir().to_path_buf()
        }
    };
    ensure_private_dir(&dir)?;
    Ok(dir)
}

fn ensure_private_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    // Restrict directory permissions to owner-only on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        let _ = std::fs::set_permissions(dir, perms);
    }
    Ok(())
}
