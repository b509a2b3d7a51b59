//! Bootstrap configuration.
//!
//! The bootstrap file seeds the widget before the host sends anything: the
//! layer id, the fitting strategy and initial settings. Host updates later
//! merge over these settings at runtime and are never validated strictly;
//! only this file is.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use toml::Table;

use crate::error::{Error, Result};
use crate::fit::FitStrategy;
use crate::font::DEFAULT_FONT_TIMEOUT_MS;
use crate::settings::{
    DateFormat, SettingsMap, TextAlign, TimeFormat, keys, parse_font_size,
};
use crate::style::parse_hex_color;
use crate::widget::WidgetOptions;

/// Embedded default configuration TOML, compiled into the binary.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../../config.toml");

/// Keys holding hex colours.
const COLOR_KEYS: &[&str] = &[keys::TEXT_COLOR, keys::BACKGROUND_COLOR];

/// Keys holding percentages.
const PERCENT_KEYS: &[&str] = &[keys::BACKGROUND_OPACITY, keys::LETTER_SPACING_PERCENT];

/// Keys holding booleans.
const BOOL_KEYS: &[&str] = &[
    keys::SHOW_DAY_OF_WEEK,
    keys::SHOW_DATE,
    keys::SHOW_TIME,
    keys::TEXT_SHADOW,
    keys::ANIMATE_SECONDS,
    keys::SHOW_FULL_NAME,
];

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Path where config was found, if any.
    pub source: Option<PathBuf>,
    /// Whether defaults were used (no config file found).
    pub used_defaults: bool,
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Host integration.
    pub addon: AddonConfig,

    /// Text fitting.
    pub fit: FitConfig,

    /// Initial settings, same keys as a `SETTINGS_UPDATE` payload.
    pub settings: Table,
}

/// Host integration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AddonConfig {
    /// Correlation token for the ready message. No ready message without it.
    pub layer_id: Option<String>,

    /// How long a font stylesheet may take before falling back (ms).
    pub font_timeout_ms: u64,
}

impl Default for AddonConfig {
    fn default() -> Self {
        Self {
            layer_id: None,
            font_timeout_ms: DEFAULT_FONT_TIMEOUT_MS,
        }
    }
}

/// Text fitting options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitConfig {
    /// "binary_search", "linear_shrink" or "proportional".
    pub strategy: String,

    /// Lower bound of the binary search (px).
    pub min_font_size: f64,

    /// Upper bound of the binary search (px).
    pub max_font_size: f64,

    /// Decrement per linear shrink pass (px).
    pub step: f64,

    /// Smallest size linear shrink goes down to (px).
    pub floor: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            strategy: "binary_search".to_string(),
            min_font_size: 0.1,
            max_font_size: 1000.0,
            step: 2.0,
            floor: 10.0,
        }
    }
}

impl FitConfig {
    /// The configured strategy, or `None` for an unknown name.
    pub fn to_strategy(&self) -> Option<FitStrategy> {
        match self.strategy.as_str() {
            "binary_search" => Some(FitStrategy::BinarySearch {
                min_font_size: self.min_font_size,
                max_font_size: self.max_font_size,
            }),
            "linear_shrink" => Some(FitStrategy::LinearShrink {
                step: self.step,
                floor: self.floor,
            }),
            "proportional" => Some(FitStrategy::Proportional),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from the embedded default TOML string.
    pub fn from_default_toml() -> Result<Self> {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TOML)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, merging with embedded defaults.
    ///
    /// Returns an error if the file doesn't exist or can't be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::load_with_defaults(&content)
    }

    /// Parse `user_toml` and deep-merge it over the embedded defaults
    /// (user values win).
    pub fn load_with_defaults(user_toml: &str) -> Result<Self> {
        let mut base: Table = toml::from_str(DEFAULT_CONFIG_TOML)?;
        let user: Table = toml::from_str(user_toml)?;

        deep_merge_toml(&mut base, user);

        let config: Config = base.try_into()?;
        Ok(config)
    }

    /// Find and load configuration using the XDG lookup chain.
    ///
    /// If `explicit_path` is `Some`, that path is used directly and an error
    /// is returned if it doesn't exist or can't be parsed (no fallback).
    ///
    /// Otherwise searches, in order:
    /// 1. `$XDG_CONFIG_HOME/dateaddon/config.toml`
    /// 2. `~/.config/dateaddon/config.toml`
    /// 3. `./config.toml`
    ///
    /// A file that exists but fails to load is an error. With no file at all
    /// the embedded defaults are used.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<ConfigLoadResult> {
        if let Some(path) = explicit_path {
            let config = Self::load(path)?;
            return Ok(ConfigLoadResult {
                config,
                source: Some(path.to_path_buf()),
                used_defaults: false,
            });
        }

        let search_paths = Self::config_search_paths();
        let mut first_error: Option<(PathBuf, Error)> = None;

        for path in &search_paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        return Ok(ConfigLoadResult {
                            config,
                            source: Some(path.clone()),
                            used_defaults: false,
                        });
                    }
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some((path.clone(), e));
                        }
                    }
                }
            }
        }

        if let Some((path, error)) = first_error {
            tracing::error!(
                "Config file {:?} exists but failed to load: {}",
                path,
                error
            );
            return Err(error);
        }

        tracing::info!("No config file found, using built-in default config");
        tracing::debug!(
            "Searched: {}",
            search_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(ConfigLoadResult {
            config: Self::from_default_toml()?,
            source: None,
            used_defaults: true,
        })
    }

    /// Get the list of paths to search for config files.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_config).join("dateaddon/config.toml"));
        }

        if let Ok(home) = env::var("HOME") {
            paths.push(PathBuf::from(home).join(".config/dateaddon/config.toml"));
        }

        paths.push(PathBuf::from("config.toml"));

        paths
    }

    /// The `[settings]` table as a host-shaped settings map.
    pub fn settings_map(&self) -> Result<SettingsMap> {
        match serde_json::to_value(&self.settings)? {
            Value::Object(map) => Ok(map),
            _ => Ok(SettingsMap::new()),
        }
    }

    /// Widget construction options derived from this config.
    ///
    /// An unknown strategy falls back to the default; `validate()` reports it.
    pub fn widget_options(&self) -> Result<WidgetOptions> {
        let bootstrap = self.settings_map()?;
        Ok(WidgetOptions {
            layer_id: self.addon.layer_id.clone().filter(|id| !id.is_empty()),
            bootstrap: (!bootstrap.is_empty()).then_some(bootstrap),
            fit_strategy: self.fit.to_strategy().unwrap_or_default(),
            font_timeout_ms: self.addon.font_timeout_ms,
        })
    }

    /// Validate the configuration, collecting every invalid value.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.fit.to_strategy().is_none() {
            errors.push(format!(
                "fit.strategy: invalid value '{}', expected one of: {}",
                self.fit.strategy,
                FitStrategy::VALID.join(", ")
            ));
        }

        if !(self.fit.min_font_size > 0.0) {
            errors.push("fit.min_font_size: must be greater than 0".to_string());
        }
        if !(self.fit.max_font_size > self.fit.min_font_size) {
            errors.push(format!(
                "fit.max_font_size: {} must be greater than fit.min_font_size {}",
                self.fit.max_font_size, self.fit.min_font_size
            ));
        }
        if !(self.fit.step > 0.0) {
            errors.push("fit.step: must be greater than 0".to_string());
        }
        if !(self.fit.floor > 0.0) {
            errors.push("fit.floor: must be greater than 0".to_string());
        }

        if self.addon.font_timeout_ms == 0 {
            errors.push("addon.font_timeout_ms: must be greater than 0".to_string());
        }

        match self.settings_map() {
            Ok(settings) => validate_settings(&settings, &mut errors),
            Err(e) => errors.push(format!("settings: {}", e)),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigValidation(errors))
        }
    }

    /// Non-fatal issues, such as settings keys that nothing reads.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for key in self.settings.keys() {
            if !keys::ALL.contains(&key.as_str()) {
                warnings.push(format!(
                    "settings.{}: unknown setting, kept for the host but unused (possible typo?)",
                    key
                ));
            }
        }

        let strategy = self.fit.strategy.as_str();
        if strategy != "linear_shrink" && self.fit.step != FitConfig::default().step {
            warnings.push("fit.step: only used by the linear_shrink strategy".to_string());
        }

        warnings
    }

    /// Human-readable summary of the configuration.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push("Addon:".to_string());
        lines.push(format!(
            "  layer_id: {}",
            self.addon.layer_id.as_deref().unwrap_or("(none, ready signal disabled)")
        ));
        lines.push(format!("  font_timeout_ms: {}", self.addon.font_timeout_ms));

        lines.push("\nFit:".to_string());
        lines.push(format!("  strategy: {}", self.fit.strategy));
        match self.fit.strategy.as_str() {
            "binary_search" => lines.push(format!(
                "  bounds: {}px - {}px",
                self.fit.min_font_size, self.fit.max_font_size
            )),
            "linear_shrink" => lines.push(format!(
                "  step: {}px, floor: {}px",
                self.fit.step, self.fit.floor
            )),
            _ => {}
        }

        lines.push("\nSettings:".to_string());
        if self.settings.is_empty() {
            lines.push("  (defaults)".to_string());
        }
        for (key, value) in &self.settings {
            lines.push(format!("  {}: {}", key, value));
        }

        lines.join("\n")
    }
}

fn validate_settings(settings: &SettingsMap, errors: &mut Vec<String>) {
    let check_enum = |key: &str, valid: &[&str], is_valid: bool, errors: &mut Vec<String>| {
        if !is_valid {
            errors.push(format!(
                "settings.{}: invalid value {}, expected one of: {}",
                key,
                settings.get(key).map(|v| v.to_string()).unwrap_or_default(),
                valid.join(", ")
            ));
        }
    };

    let as_text = |key: &str| -> Option<String> {
        settings.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };

    if let Some(v) = as_text(keys::TEXT_ALIGN) {
        check_enum(keys::TEXT_ALIGN, TextAlign::VALID, TextAlign::parse(&v).is_some(), errors);
    }
    if let Some(v) = as_text(keys::TIME_FORMAT) {
        check_enum(keys::TIME_FORMAT, TimeFormat::VALID, TimeFormat::parse(&v).is_some(), errors);
    }
    if let Some(v) = as_text(keys::DATE_FORMAT) {
        check_enum(keys::DATE_FORMAT, DateFormat::VALID, DateFormat::parse(&v).is_some(), errors);
    }

    if let Some(v) = settings.get(keys::FONT_SIZE) {
        if parse_font_size(v).is_none() {
            errors.push(format!(
                "settings.fontSize: invalid value {}, expected a positive pixel size or \"auto\"",
                v
            ));
        }
    }

    for key in COLOR_KEYS {
        if let Some(v) = settings.get(*key) {
            let valid = v.as_str().is_some_and(|s| parse_hex_color(s).is_some());
            if !valid {
                errors.push(format!(
                    "settings.{}: invalid value {}, expected a hex color like '#ffffff'",
                    key, v
                ));
            }
        }
    }

    for key in PERCENT_KEYS {
        if let Some(v) = settings.get(*key) {
            let valid = v.as_f64().is_some_and(|p| (0.0..=100.0).contains(&p));
            if !valid {
                errors.push(format!(
                    "settings.{}: invalid value {}, must be between 0 and 100",
                    key, v
                ));
            }
        }
    }

    for key in BOOL_KEYS {
        if let Some(v) = settings.get(*key) {
            if !v.is_boolean() {
                errors.push(format!("settings.{}: expected true or false, got {}", key, v));
            }
        }
    }
}

/// Deep-merge `overlay` into `base`; overlay values win, tables merge.
fn deep_merge_toml(base: &mut Table, overlay: Table) {
    for (key, overlay_value) in overlay {
        match (base.get_mut(&key), overlay_value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge_toml(base_table, overlay_table);
            }
            (_, overlay_value) => {
                base.insert(key, overlay_value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fit.strategy, "binary_search");
        assert_eq!(config.fit.min_font_size, 0.1);
        assert_eq!(config.fit.max_font_size, 1000.0);
        assert_eq!(config.addon.font_timeout_ms, 5000);
        assert!(config.addon.layer_id.is_none());
        assert!(config.settings.is_empty());
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_embedded_default_config_parses_and_validates() {
        let config = Config::from_default_toml().expect("embedded default config should parse");
        assert!(config.validate().is_ok());
        assert!(config.warnings().is_empty());
    }

    #[test]
    fn test_load_with_defaults_merges_settings() {
        let user = r#"
            [addon]
            layer_id = "layer-7"

            [settings]
            showTime = true
            language = "de-DE"
        "#;
        let config = Config::load_with_defaults(user).unwrap();
        assert_eq!(config.addon.layer_id.as_deref(), Some("layer-7"));

        let settings = config.settings_map().unwrap();
        assert_eq!(settings.get("showTime"), Some(&json!(true)));
        assert_eq!(settings.get("language"), Some(&json!("de-DE")));
        // Untouched defaults from the embedded file survive the merge
        assert_eq!(config.fit.strategy, "binary_search");
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result = Config::load_with_defaults("[bar]\nsize = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_fit_strategy_mapping() {
        let mut fit = FitConfig::default();
        assert!(matches!(
            fit.to_strategy(),
            Some(FitStrategy::BinarySearch { .. })
        ));
        fit.strategy = "linear_shrink".to_string();
        assert_eq!(
            fit.to_strategy(),
            Some(FitStrategy::LinearShrink {
                step: 2.0,
                floor: 10.0
            })
        );
        fit.strategy = "proportional".to_string();
        assert_eq!(fit.to_strategy(), Some(FitStrategy::Proportional));
        fit.strategy = "magic".to_string();
        assert_eq!(fit.to_strategy(), None);
    }

    #[test]
    fn test_validate_invalid_strategy() {
        let mut config = Config::default();
        config.fit.strategy = "magic".to_string();
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("fit.strategy"));
        assert!(msg.contains("magic"));
    }

    #[test]
    fn test_validate_bounds() {
        let mut config = Config::default();
        config.fit.min_font_size = 50.0;
        config.fit.max_font_size = 10.0;
        config.addon.font_timeout_ms = 0;
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("fit.max_font_size"));
        assert!(msg.contains("addon.font_timeout_ms"));
    }

    #[test]
    fn test_validate_settings_values() {
        let config = Config::load_with_defaults(
            r##"
            [settings]
            textAlign = "justify"
            timeFormat = "13"
            textColor = "white"
            backgroundOpacity = 140
            showTime = "yes"
            fontSize = "huge"
        "##,
        )
        .unwrap();

        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("settings.textAlign"));
        assert!(msg.contains("settings.timeFormat"));
        assert!(msg.contains("settings.textColor"));
        assert!(msg.contains("settings.backgroundOpacity"));
        assert!(msg.contains("settings.showTime"));
        assert!(msg.contains("settings.fontSize"));
    }

    #[test]
    fn test_validate_accepts_numeric_time_format() {
        let config = Config::load_with_defaults("[settings]\ntimeFormat = 24\nfontSize = 48\n")
            .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_setting_is_a_warning() {
        let config = Config::load_with_defaults("[settings]\nshowSeconds = true\n").unwrap();
        assert!(config.validate().is_ok());
        let warnings = config.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("showSeconds"));
    }

    #[test]
    fn test_widget_options() {
        let config = Config::load_with_defaults(
            r#"
            [addon]
            layer_id = "L1"
            font_timeout_ms = 2500

            [fit]
            strategy = "proportional"

            [settings]
            showDate = false
        "#,
        )
        .unwrap();

        let options = config.widget_options().unwrap();
        assert_eq!(options.layer_id.as_deref(), Some("L1"));
        assert_eq!(options.font_timeout_ms, 2500);
        assert_eq!(options.fit_strategy, FitStrategy::Proportional);
        let bootstrap = options.bootstrap.unwrap();
        assert_eq!(bootstrap.get("showDate"), Some(&json!(false)));
    }

    #[test]
    fn test_empty_layer_id_is_none() {
        let config = Config::load_with_defaults("[addon]\nlayer_id = \"\"\n").unwrap();
        assert!(config.widget_options().unwrap().layer_id.is_none());
    }

    #[test]
    fn test_config_search_paths() {
        let paths = Config::config_search_paths();
        assert!(!paths.is_empty());
        assert!(paths.iter().any(|p| p.ends_with("config.toml")));
    }

    #[test]
    fn test_summary_sections() {
        let summary = Config::default().summary();
        assert!(summary.contains("Addon:"));
        assert!(summary.contains("Fit:"));
        assert!(summary.contains("Settings:"));
        assert!(summary.contains("ready signal disabled"));
    }
}
