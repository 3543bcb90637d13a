//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root under which per-render workspaces are created
    pub work_dir: PathBuf,
    /// Root of the JSON pipeline store
    pub data_dir: PathBuf,
    /// Largest plan accepted for asset generation
    pub max_scenes: usize,
    /// Lifetime of download URLs handed out for finished videos
    pub download_url_ttl: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/reel"),
            data_dir: PathBuf::from("./data"),
            max_scenes: 50,
            download_url_ttl: Duration::from_secs(3600),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/reel")),
            data_dir: std::env::var("WORKER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            max_scenes: std::env::var("WORKER_MAX_SCENES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(50),
            download_url_ttl: Duration::from_secs(
                std::env::var("WORKER_DOWNLOAD_URL_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_max_scenes(mut self, max_scenes: usize) -> Self {
        self.max_scenes = max_scenes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_scenes, 50);
        assert_eq!(config.work_dir, PathBuf::from("/tmp/reel"));
        assert_eq!(config.download_url_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_builders() {
        let config = WorkerConfig::default()
            .with_work_dir("/scratch")
            .with_max_scenes(3);
        assert_eq!(config.work_dir, PathBuf::from("/scratch"));
        assert_eq!(config.max_scenes, 3);
    }
}
