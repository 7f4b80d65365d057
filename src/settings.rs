//! Configuration and persisted enablement
//!
//! Tunables live in plain structs with sensible defaults. The on/off state
//! of the feature is persisted through an [`EnablementStore`], so it
//! survives across sessions the way a client-local preference would.

use crate::draw::Color;
use crate::LocatorError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Matching tunables
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Page width assumed when splitting the page into column thirds
    pub nominal_page_width: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            // US Letter, points
            nominal_page_width: 612.0,
        }
    }
}

/// Look of the highlight overlay
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub fill: Color,
    pub border: Color,
    pub border_width: f32,
    /// Fade duration for opacity changes
    pub transition_ms: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            fill: Color::rgba(1.0, 0.76, 0.03, 0.35),
            border: Color::rgb(1.0, 0.6, 0.0),
            border_width: 2.0,
            transition_ms: 200,
        }
    }
}

/// Magnifying lens tunables
#[derive(Debug, Clone)]
pub struct LensConfig {
    /// Lens diameter in viewport pixels
    pub diameter: f32,
    /// Zoom factor applied to the raster crop
    pub magnification: f32,
    /// Space between the lens and the top of the page
    pub gap: f32,
    pub ring_width: f32,
    pub ring_color: Color,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            diameter: 200.0,
            magnification: 2.5,
            gap: 12.0,
            ring_width: 3.0,
            ring_color: Color::rgb(0.2, 0.2, 0.2),
        }
    }
}

/// All tunables of the locator
#[derive(Debug, Clone, Default)]
pub struct LocatorConfig {
    pub matching: MatchConfig,
    pub overlay: OverlayStyle,
    pub lens: LensConfig,
}

/// Persistent storage for the feature's on/off switch
pub trait EnablementStore {
    /// Stored value; `false` when nothing was stored yet
    fn load(&self) -> bool;

    fn save(&self, enabled: bool) -> Result<(), LocatorError>;
}

/// Process-local store, for tests and embedders without persistence
#[derive(Debug, Default)]
pub struct MemoryEnablementStore {
    enabled: AtomicBool,
}

impl MemoryEnablementStore {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }
}

impl EnablementStore for MemoryEnablementStore {
    fn load(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn save(&self, enabled: bool) -> Result<(), LocatorError> {
        self.enabled.store(enabled, Ordering::Relaxed);
        Ok(())
    }
}

/// Store backed by a one-line file containing `true` or `false`
#[derive(Debug, Clone)]
pub struct FileEnablementStore {
    path: PathBuf,
}

impl FileEnablementStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EnablementStore for FileEnablementStore {
    fn load(&self) -> bool {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => content.trim() == "true",
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("could not read {}: {}", self.path.display(), e);
                }
                false
            }
        }
    }

    fn save(&self, enabled: bool) -> Result<(), LocatorError> {
        let storage_err =
            |e: std::io::Error| LocatorError::Storage(format!("{}: {}", self.path.display(), e));
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(storage_err)?;
            }
        }
        std::fs::write(&self.path, if enabled { "true\n" } else { "false\n" })
            .map_err(storage_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LocatorConfig::default();
        assert_eq!(config.matching.nominal_page_width, 612.0);
        assert_eq!(config.lens.diameter, 200.0);
        assert_eq!(config.overlay.transition_ms, 200);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryEnablementStore::default();
        assert!(!store.load());
        store.save(true).unwrap();
        assert!(store.load());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEnablementStore::new(dir.path().join("prefs").join("highlight"));
        assert!(!store.load());

        store.save(true).unwrap();
        assert!(store.load());
        assert!(FileEnablementStore::new(store.path()).load());

        store.save(false).unwrap();
        assert!(!store.load());
    }

    #[test]
    fn test_file_store_garbage_means_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("highlight");
        std::fs::write(&path, "yes please").unwrap();
        assert!(!FileEnablementStore::new(&path).load());
    }
}
