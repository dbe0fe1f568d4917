// Sheet settings
// Loaded from ~/.config/forecast-sheet/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Value display
    /// Decimals a Real value is rounded to before comparing an edit with
    /// the original.
    #[serde(rename = "sheet.variableDecimals")]
    pub variable_decimals: u32,

    /// Decimals of the percentage shown when editing a sub-category.
    #[serde(rename = "sheet.breakdownDecimals")]
    pub breakdown_decimals: u32,

    // History
    #[serde(rename = "history.maxEntries")]
    pub history_max_entries: usize,

    // Grid geometry
    #[serde(rename = "grid.rowHeight")]
    pub row_height: f32,

    #[serde(rename = "grid.columnWidth")]
    pub column_width: f32,

    #[serde(rename = "grid.headerHeight")]
    pub header_height: f32,

    #[serde(rename = "grid.leftColumnWidth")]
    pub left_column_width: f32,

    // Date range used when none is given
    #[serde(rename = "sheet.defaultMonthsBack")]
    pub default_months_back: u32,

    #[serde(rename = "sheet.defaultMonthsAhead")]
    pub default_months_ahead: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            variable_decimals: 2,
            breakdown_decimals: 1,
            history_max_entries: 100,
            row_height: 24.0,
            column_width: 90.0,
            header_height: 32.0,
            left_column_width: 175.0,
            default_months_back: 2,
            default_months_ahead: 10,
        }
    }
}

const DEFAULT_CONFIG: &str = r#"{
    // Value display
    "sheet.variableDecimals": 2,
    "sheet.breakdownDecimals": 1,

    // Undo/redo steps kept per editing session
    "history.maxEntries": 100,

    // Grid geometry (pixels)
    "grid.rowHeight": 24,
    "grid.columnWidth": 90,
    "grid.headerHeight": 32,
    "grid.leftColumnWidth": 175,

    // Date range shown when a sheet has none
    "sheet.defaultMonthsBack": 2,
    "sheet.defaultMonthsAhead": 10
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("forecast-sheet");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, writing a commented
    /// default file on first use.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            Self::create_default_file(&path);
            return Self::default();
        }

        Self::load_from(&path)
    }

    /// Load settings from `path`, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments; missing
    /// keys take their defaults.
    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to the default location
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_matches_defaults() {
        let parsed = Settings::from_json_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, Settings::default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let parsed = Settings::from_json_str(
            r#"{
    // smaller history
    "history.maxEntries": 5,
    "grid.rowHeight": 30
}"#,
        )
        .unwrap();
        assert_eq!(parsed.history_max_entries, 5);
        assert_eq!(parsed.row_height, 30.0);
        assert_eq!(parsed.variable_decimals, 2);
    }

    #[test]
    fn test_invalid_json_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());

        let missing = dir.path().join("missing.json");
        assert_eq!(Settings::load_from(&missing), Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings { breakdown_decimals: 3, ..Settings::default() };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }
}
