use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::TradingSettings;
use crate::ports::{SettingsError, SettingsProvider};

/// Settings document stored as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, settings: &TradingSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(settings)?;

        // Readers never observe a half-written document
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SettingsProvider for JsonSettingsStore {
    /// A missing file is created with every field unset
    fn load(&self) -> Result<TradingSettings, SettingsError> {
        if !self.path.exists() {
            tracing::info!(
                "No settings at {}, writing an empty document",
                self.path.display()
            );
            let settings = TradingSettings::default();
            self.write(&settings)?;
            return Ok(settings);
        }

        let content = fs::read_to_string(&self.path)?;
        let settings = serde_json::from_str(&content)?;
        tracing::debug!("Settings loaded from {}", self.path.display());
        Ok(settings)
    }

    fn save(&self, settings: &TradingSettings) -> Result<(), SettingsError> {
        self.write(settings)?;
        tracing::info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}
