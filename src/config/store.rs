// Settings store - the settings collaborator seen by the controller
//
// The controller only needs the token, two flags and `save(force)`. Keeping
// that surface in a trait lets the UI layer stay ignorant of the YAML model.

use super::ConfigManager;
use crate::models::UserSettings;
use anyhow::Result;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Settings collaborator used by [`AppController`](crate::ui::AppController).
///
/// Implementations are shared between the UI thread and the background
/// thread and must be internally synchronized.
///
/// `save(false)` may skip the write when nothing changed. `save(true)` must
/// write and must have finished when it returns; it is used on shutdown.
pub trait SettingsStore: Send + Sync {
    fn oauth_token(&self) -> String;
    fn set_oauth_token(&self, token: &str);
    fn notifications_enabled(&self) -> bool;
    fn auto_start(&self) -> bool;
    fn save(&self, force: bool) -> Result<()>;
}

struct SettingsState {
    settings: UserSettings,
    dirty: bool,
}

/// [`SettingsStore`] backed by `settings.yaml`
pub struct FileSettings {
    manager: ConfigManager,
    state: Mutex<SettingsState>,
    loaded_from_disk: bool,
}

impl FileSettings {
    /// Load settings through `manager` (defaults when the file is missing)
    pub fn load(manager: ConfigManager) -> Result<Self> {
        let loaded_from_disk = manager.settings_path().exists();
        let settings = manager.load_settings()?;
        Ok(Self {
            manager,
            state: Mutex::new(SettingsState {
                settings,
                dirty: false,
            }),
            loaded_from_disk,
        })
    }

    /// Whether `load` read an existing file rather than falling back to
    /// defaults. Settings load before the subscriber exists, so startup
    /// reports this once logging is up.
    pub fn loaded_from_disk(&self) -> bool {
        self.loaded_from_disk
    }

    fn state(&self) -> MutexGuard<'_, SettingsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone of the current settings
    pub fn snapshot(&self) -> UserSettings {
        self.state().settings.clone()
    }

    /// Mutate the settings; marks them dirty when anything changed
    pub fn update<F>(&self, update_fn: F)
    where
        F: FnOnce(&mut UserSettings),
    {
        let mut state = self.state();
        let before = state.settings.clone();
        update_fn(&mut state.settings);
        if state.settings != before {
            state.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.manager
    }
}

impl SettingsStore for FileSettings {
    fn oauth_token(&self) -> String {
        self.state().settings.oauth_token.clone()
    }

    fn set_oauth_token(&self, token: &str) {
        self.update(|settings| settings.oauth_token = token.to_string());
    }

    fn notifications_enabled(&self) -> bool {
        self.state().settings.notifications
    }

    fn auto_start(&self) -> bool {
        self.state().settings.auto_start
    }

    fn save(&self, force: bool) -> Result<()> {
        let mut state = self.state();
        if !force && !state.dirty {
            tracing::debug!("Settings unchanged, skipping save");
            return Ok(());
        }

        // Lock is held across the write so concurrent saves never interleave
        self.manager.save_settings(&state.settings)?;
        state.dirty = false;
        Ok(())
    }
}
