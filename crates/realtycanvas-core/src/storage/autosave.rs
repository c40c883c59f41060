//! Periodic project persistence.

use super::{ProjectState, Storage, StorageResult, save_project};
use crate::settings::Settings;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Interval used when settings do not provide one (5 minutes).
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Saves the project when it is dirty and the interval has elapsed.
pub struct AutoSaveManager<S: Storage> {
    storage: Arc<S>,
    interval: Duration,
    enabled: bool,
    last_save: Option<Instant>,
    dirty: bool,
}

impl<S: Storage> AutoSaveManager<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            interval: DEFAULT_AUTOSAVE_INTERVAL,
            enabled: true,
            last_save: None,
            dirty: false,
        }
    }

    /// Manager configured from the `autoSave` / `autoSaveInterval` settings.
    pub fn from_settings(storage: Arc<S>, settings: &Settings) -> Self {
        let mut manager = Self::new(storage);
        manager.enabled = settings.auto_save;
        manager.interval = settings.autosave_interval();
        manager
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Dirty, enabled, and the interval has passed since the last save.
    pub fn should_save(&self) -> bool {
        if !self.enabled || !self.dirty {
            return false;
        }
        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save if [`should_save`](Self::should_save). Returns whether a save happened.
    pub async fn maybe_save(&mut self, state: &ProjectState) -> StorageResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }
        self.save(state).await?;
        Ok(true)
    }

    /// Save immediately.
    pub async fn save(&mut self, state: &ProjectState) -> StorageResult<()> {
        save_project(self.storage.as_ref(), state).await?;
        self.last_save = Some(Instant::now());
        self.dirty = false;
        Ok(())
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::storage::{MemoryStorage, load_project};
    use pollster::block_on;

    #[test]
    fn test_dirty_flag_drives_saving() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage);
        assert!(!manager.should_save());
        manager.mark_dirty();
        assert!(manager.should_save());
    }

    #[test]
    fn test_save_clears_dirty_and_respects_interval() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        let canvas = Canvas::new(Settings::default());

        manager.mark_dirty();
        assert!(block_on(manager.maybe_save(&canvas.project_state())).unwrap());
        assert!(!manager.is_dirty());

        manager.mark_dirty();
        // Interval (5 minutes) has not elapsed yet.
        assert!(!block_on(manager.maybe_save(&canvas.project_state())).unwrap());

        let loaded = block_on(load_project(storage.as_ref())).unwrap();
        assert_eq!(loaded.canvas_state, canvas.project_state());
    }

    #[test]
    fn test_disabled_by_settings() {
        let settings = Settings {
            auto_save: false,
            ..Default::default()
        };
        let mut manager = AutoSaveManager::from_settings(Arc::new(MemoryStorage::new()), &settings);
        manager.mark_dirty();
        assert!(!manager.should_save());
        assert_eq!(manager.interval(), Duration::from_secs(300));
    }
}
