use thiserror::Error;

use crate::domain::TradingSettings;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Atomic get/set of the settings document
#[cfg_attr(test, mockall::automock)]
pub trait SettingsProvider: Send + Sync {
    fn load(&self) -> Result<TradingSettings, SettingsError>;

    fn save(&self, settings: &TradingSettings) -> Result<(), SettingsError>;
}
