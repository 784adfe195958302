//! Runtime parameter reload.
//!
//! The detector reads its parameters through a [`ConfigHandle`] and takes one
//! snapshot per frame, so a reload never changes parameters mid-frame.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tracing::info;

use super::DetectorConfig;

/// Shared, swappable detector configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<DetectorConfig>>,
}

impl ConfigHandle {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Copy of the current parameters.
    pub fn snapshot(&self) -> DetectorConfig {
        self.inner.read().clone()
    }

    /// Replace the parameters if `config` is valid; otherwise keep the old ones.
    pub fn update(&self, config: DetectorConfig) -> Result<()> {
        config.validate()?;
        *self.inner.write() = config;
        Ok(())
    }

    /// Load, validate and install a config file.
    pub fn reload_from<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config = DetectorConfig::load(path)?;
        self.update(config)?;
        info!("Reloaded detector config from {}", path.display());
        Ok(())
    }
}

/// Polls a config file and reloads it into a [`ConfigHandle`] when it changes.
pub struct ConfigWatcher {
    path: PathBuf,
    handle: ConfigHandle,
    last_modified: Option<SystemTime>,
    missing: bool,
}

impl ConfigWatcher {
    /// Start watching `path`. The current file state counts as already loaded.
    pub fn new<P: Into<PathBuf>>(path: P, handle: ConfigHandle) -> Self {
        let path = path.into();
        let last_modified = modified_time(&path).ok();
        Self {
            path,
            handle,
            last_modified,
            missing: false,
        }
    }

    /// Reload if the file's modification time moved.
    ///
    /// Returns `Ok(true)` when new parameters were installed. A broken file is
    /// reported once per modification and a missing file once until it
    /// reappears; the previous parameters stay active.
    pub fn poll(&mut self) -> Result<bool> {
        let modified = match modified_time(&self.path) {
            Ok(modified) => modified,
            Err(_) if self.missing => return Ok(false),
            Err(e) => {
                self.missing = true;
                self.last_modified = None;
                return Err(e);
            }
        };
        self.missing = false;
        if self.last_modified == Some(modified) {
            return Ok(false);
        }
        self.last_modified = Some(modified);
        self.handle.reload_from(&self.path)?;
        Ok(true)
    }
}

fn modified_time(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to stat {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_update_rejects_invalid() {
        let handle = ConfigHandle::default();
        let bad = DetectorConfig {
            downsample_scale: 0,
            ..Default::default()
        };
        assert!(handle.update(bad).is_err());
        assert_eq!(handle.snapshot(), DetectorConfig::default());
    }

    #[test]
    fn test_clones_share_state() {
        let handle = ConfigHandle::default();
        let other = handle.clone();
        other
            .update(DetectorConfig {
                cluster_element_num: 3,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(handle.snapshot().cluster_element_num, 3);
    }

    #[test]
    fn test_reload_keeps_old_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "downsample_scale: 5").unwrap();

        let handle = ConfigHandle::default();
        handle.reload_from(file.path()).unwrap();
        assert_eq!(handle.snapshot().downsample_scale, 5);

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        writeln!(broken, "downsample_scale: [not, a, number]").unwrap();
        assert!(handle.reload_from(broken.path()).is_err());
        assert_eq!(handle.snapshot().downsample_scale, 5);
    }

    #[test]
    fn test_watcher_skips_unchanged_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cluster_element_num: 2").unwrap();

        let handle = ConfigHandle::default();
        let mut watcher = ConfigWatcher::new(file.path(), handle.clone());
        assert!(!watcher.poll().unwrap());
        assert_eq!(handle.snapshot().cluster_element_num, 10);
    }

    #[test]
    fn test_watcher_reloads_modified_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detector.yaml");
        fs::write(&path, "cluster_element_num: 2\n").unwrap();

        let handle = ConfigHandle::default();
        let mut watcher = ConfigWatcher::new(&path, handle.clone());

        fs::write(&path, "cluster_element_num: 4\n").unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        assert!(watcher.poll().unwrap());
        assert_eq!(handle.snapshot().cluster_element_num, 4);
        assert!(!watcher.poll().unwrap());
    }

    #[test]
    fn test_watcher_reports_missing_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detector.yaml");
        fs::write(&path, "cluster_element_num: 2\n").unwrap();

        let handle = ConfigHandle::default();
        let mut watcher = ConfigWatcher::new(&path, handle.clone());
        fs::remove_file(&path).unwrap();

        assert!(watcher.poll().is_err());
        assert!(!watcher.poll().unwrap());
        assert!(!watcher.poll().unwrap());

        fs::write(&path, "cluster_element_num: 6\n").unwrap();
        assert!(watcher.poll().unwrap());
        assert_eq!(handle.snapshot().cluster_element_num, 6);
    }
}
