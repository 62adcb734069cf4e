use crate::models::UserSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

pub mod store;

pub use store::{FileSettings, SettingsStore};

/// Environment variable that overrides the configuration directory
pub const CONFIG_DIR_ENV_VAR: &str = "DROPMINER_CONFIG_DIR";

/// File name of the user settings inside the configuration directory
pub const SETTINGS_FILE_NAME: &str = "settings.yaml";

/// Configuration manager for loading and saving the YAML settings file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing `settings.yaml`; created if missing
    ///
    /// # Returns
    /// A new ConfigManager instance
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE_NAME),
            config_dir,
        })
    }

    /// Default configuration directory.
    ///
    /// [`CONFIG_DIR_ENV_VAR`] when set, otherwise the platform config
    /// directory joined with the application name.
    pub fn default_dir(app_name: &str) -> Result<Utf8PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV_VAR) {
            if !dir.is_empty() {
                return Ok(Utf8PathBuf::from(dir));
            }
        }

        let base = dirs::config_dir().context("Could not determine config directory")?;
        let base = Utf8PathBuf::from_path_buf(base).map_err(|path| {
            anyhow::anyhow!("Config directory is not valid UTF-8: {}", path.display())
        })?;
        Ok(base.join(app_name))
    }

    /// Load the user settings file.
    ///
    /// # Returns
    /// The loaded UserSettings, or defaults if the file doesn't exist
    pub fn load_settings(&self) -> Result<UserSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            return Ok(UserSettings::default());
        }

        let file_contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let settings: UserSettings = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Save the user settings file.
    ///
    /// The file is written to a temporary sibling first and then renamed, so a
    /// crash mid-write never leaves a truncated settings file behind.
    ///
    /// # Arguments
    /// * `settings` - The UserSettings to save
    pub fn save_settings(&self, settings: &UserSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        let temp_path = self.settings_path.with_extension("yaml.tmp");
        fs::write(&temp_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", temp_path))?;
        fs::rename(&temp_path, &self.settings_path)
            .with_context(|| format!("Failed to replace settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the settings file path.
    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}
