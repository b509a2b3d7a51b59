//! Live settings store.
//!
//! Settings arrive from the host as sparse JSON objects. The raw values are
//! kept in a [`SettingsMap`] so unknown keys survive round trips; a typed
//! [`Settings`] view is rebuilt from that map after every merge.

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

/// Raw key/value settings as pushed by the host.
pub type SettingsMap = Map<String, Value>;

/// Setting keys understood by the addon.
pub mod keys {
    pub const FONT_URL: &str = "fontUrl";
    pub const FONT_FAMILY: &str = "fontFamily";
    pub const FONT_SIZE: &str = "fontSize";
    pub const FONT_WEIGHT: &str = "fontWeight";
    pub const TEXT_COLOR: &str = "textColor";
    pub const BACKGROUND_COLOR: &str = "backgroundColor";
    pub const BACKGROUND_OPACITY: &str = "backgroundOpacity";
    pub const TEXT_ALIGN: &str = "textAlign";
    pub const LANGUAGE: &str = "language";
    pub const SHOW_DAY_OF_WEEK: &str = "showDayOfWeek";
    pub const SHOW_DATE: &str = "showDate";
    pub const SHOW_TIME: &str = "showTime";
    pub const TIME_FORMAT: &str = "timeFormat";
    pub const DATE_FORMAT: &str = "dateFormat";
    pub const TEXT_SHADOW: &str = "textShadow";
    pub const ANIMATE_SECONDS: &str = "animateSeconds";
    pub const SHOW_FULL_NAME: &str = "showFullName";
    pub const LETTER_SPACING_PERCENT: &str = "letterSpacingPercent";

    /// Every key with a typed meaning.
    pub const ALL: &[&str] = &[
        FONT_URL,
        FONT_FAMILY,
        FONT_SIZE,
        FONT_WEIGHT,
        TEXT_COLOR,
        BACKGROUND_COLOR,
        BACKGROUND_OPACITY,
        TEXT_ALIGN,
        LANGUAGE,
        SHOW_DAY_OF_WEEK,
        SHOW_DATE,
        SHOW_TIME,
        TIME_FORMAT,
        DATE_FORMAT,
        TEXT_SHADOW,
        ANIMATE_SECONDS,
        SHOW_FULL_NAME,
        LETTER_SPACING_PERCENT,
    ];
}

/// Keys whose change alters the displayed string.
const CONTENT_KEYS: &[&str] = &[
    keys::SHOW_DAY_OF_WEEK,
    keys::SHOW_DATE,
    keys::SHOW_TIME,
    keys::TIME_FORMAT,
    keys::DATE_FORMAT,
    keys::LANGUAGE,
    keys::SHOW_FULL_NAME,
];

/// Keys whose change alters text metrics and therefore the fit.
const METRIC_KEYS: &[&str] = &[
    keys::FONT_FAMILY,
    keys::FONT_SIZE,
    keys::FONT_WEIGHT,
    keys::LETTER_SPACING_PERCENT,
];

/// Default font stack used until (and whenever) a custom font is unavailable.
pub const DEFAULT_FONT_FAMILY: &str =
    "-apple-system, BlinkMacSystemFont, \"Segoe UI\", Roboto, sans-serif";

/// Locale used when the configured one is rejected by the formatter.
pub const FALLBACK_LANGUAGE: &str = "en-US";

/// Raw default values, in the same shape the host sends.
pub fn default_settings_map() -> SettingsMap {
    let defaults = json!({
        "fontUrl": "",
        "fontFamily": DEFAULT_FONT_FAMILY,
        "fontSize": "auto",
        "fontWeight": "600",
        "textColor": "#FFFFFF",
        "backgroundColor": "#000000",
        "backgroundOpacity": 0,
        "textAlign": "center",
        "language": FALLBACK_LANGUAGE,
        "showDayOfWeek": true,
        "showDate": true,
        "showTime": false,
        "timeFormat": "12",
        "dateFormat": "full",
        "textShadow": true,
        "animateSeconds": true,
        "showFullName": true,
        "letterSpacingPercent": 0,
    });

    match defaults {
        Value::Object(map) => map,
        _ => SettingsMap::new(),
    }
}

/// Requested font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FontSize {
    /// Fit the text to the container.
    Auto,
    /// Fixed size in pixels; fitting is disabled.
    Px(f64),
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    pub const VALID: &'static [&'static str] = &["left", "center", "right"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Clock convention for the time part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    #[default]
    H12,
    H24,
}

impl TimeFormat {
    pub const VALID: &'static [&'static str] = &["12", "24"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "12" => Some(Self::H12),
            "24" => Some(Self::H24),
            _ => None,
        }
    }
}

/// Presentation of the date part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    /// Long month name, e.g. "October 19, 2026".
    #[default]
    Full,
    /// Abbreviated month name, e.g. "Oct 19, 2026".
    Short,
    /// Locale numeric date, e.g. "10/19/2026".
    Numeric,
    /// `YYYY-MM-DD`, independent of locale.
    Iso,
}

impl DateFormat {
    pub const VALID: &'static [&'static str] = &["full", "short", "numeric", "iso"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(Self::Full),
            "short" => Some(Self::Short),
            "numeric" => Some(Self::Numeric),
            "iso" => Some(Self::Iso),
            _ => None,
        }
    }
}

/// Typed view over the raw settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Stylesheet URL of a web font. Empty means none.
    pub font_url: String,
    /// CSS font stack.
    pub font_family: String,
    pub font_size: FontSize,
    pub font_weight: String,
    /// Hex text colour.
    pub text_color: String,
    /// Hex background colour.
    pub background_color: String,
    /// Background opacity in percent (0-100).
    pub background_opacity: f64,
    pub text_align: TextAlign,
    /// Locale tag such as "en-US".
    pub language: String,
    pub show_day_of_week: bool,
    pub show_date: bool,
    pub show_time: bool,
    pub time_format: TimeFormat,
    pub date_format: DateFormat,
    pub text_shadow: bool,
    pub animate_seconds: bool,
    /// Long weekday name ("Monday") instead of abbreviated ("Mon").
    pub show_full_name: bool,
    /// Letter spacing as a percentage of the font size (0-100).
    pub letter_spacing_percent: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_url: String::new(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: FontSize::Auto,
            font_weight: "600".to_string(),
            text_color: "#FFFFFF".to_string(),
            background_color: "#000000".to_string(),
            background_opacity: 0.0,
            text_align: TextAlign::Center,
            language: FALLBACK_LANGUAGE.to_string(),
            show_day_of_week: true,
            show_date: true,
            show_time: false,
            time_format: TimeFormat::H12,
            date_format: DateFormat::Full,
            text_shadow: true,
            animate_seconds: true,
            show_full_name: true,
            letter_spacing_percent: 0.0,
        }
    }
}

impl Settings {
    /// Build the typed view from raw values.
    ///
    /// Missing keys keep their defaults. Values of the wrong type or out of
    /// range are logged and replaced by the default; this never fails.
    pub fn from_map(map: &SettingsMap) -> Self {
        let d = Self::default();

        let font_size = match map.get(keys::FONT_SIZE) {
            None => d.font_size,
            Some(v) => parse_font_size(v).unwrap_or_else(|| {
                warn!("Ignoring invalid fontSize {}", v);
                d.font_size
            }),
        };

        let text_align = enum_value(map, keys::TEXT_ALIGN, TextAlign::parse, d.text_align);
        let time_format = enum_value(map, keys::TIME_FORMAT, TimeFormat::parse, d.time_format);
        let date_format = enum_value(map, keys::DATE_FORMAT, DateFormat::parse, d.date_format);

        Self {
            font_url: string_value(map, keys::FONT_URL, &d.font_url),
            font_family: string_value(map, keys::FONT_FAMILY, &d.font_family),
            font_size,
            font_weight: string_value(map, keys::FONT_WEIGHT, &d.font_weight),
            text_color: string_value(map, keys::TEXT_COLOR, &d.text_color),
            background_color: string_value(map, keys::BACKGROUND_COLOR, &d.background_color),
            background_opacity: percent_value(map, keys::BACKGROUND_OPACITY, d.background_opacity),
            text_align,
            language: string_value(map, keys::LANGUAGE, &d.language),
            show_day_of_week: bool_value(map, keys::SHOW_DAY_OF_WEEK, d.show_day_of_week),
            show_date: bool_value(map, keys::SHOW_DATE, d.show_date),
            show_time: bool_value(map, keys::SHOW_TIME, d.show_time),
            time_format,
            date_format,
            text_shadow: bool_value(map, keys::TEXT_SHADOW, d.text_shadow),
            animate_seconds: bool_value(map, keys::ANIMATE_SECONDS, d.animate_seconds),
            show_full_name: bool_value(map, keys::SHOW_FULL_NAME, d.show_full_name),
            letter_spacing_percent: percent_value(
                map,
                keys::LETTER_SPACING_PERCENT,
                d.letter_spacing_percent,
            ),
        }
    }

    /// Whether the displayed string changes every second.
    pub fn shows_seconds(&self) -> bool {
        self.show_time
    }

    /// Whether any display part is enabled.
    pub fn shows_anything(&self) -> bool {
        self.show_day_of_week || self.show_date || self.show_time
    }
}

/// Interpret a fontSize value: a pixel number, a numeric string (optionally
/// suffixed with "px"), or "auto".
pub fn parse_font_size(value: &Value) -> Option<FontSize> {
    match value {
        Value::Number(n) => n.as_f64().filter(|px| *px > 0.0).map(FontSize::Px),
        Value::String(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("auto") {
                return Some(FontSize::Auto);
            }
            s.trim_end_matches("px")
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|px| *px > 0.0)
                .map(FontSize::Px)
        }
        _ => None,
    }
}

/// Render a value as a plain string for enum matching ("24" and 24 both
/// become "24").
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_value(map: &SettingsMap, key: &str, default: &str) -> String {
    match map.get(key) {
        None => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            warn!("Setting '{}' expected a string, got {}", key, other);
            default.to_string()
        }
    }
}

fn bool_value(map: &SettingsMap, key: &str, default: bool) -> bool {
    match map.get(key) {
        None => default,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            warn!("Setting '{}' expected a boolean, got {}", key, other);
            default
        }
    }
}

fn percent_value(map: &SettingsMap, key: &str, default: f64) -> f64 {
    let Some(value) = map.get(key) else {
        return default;
    };

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(p) if (0.0..=100.0).contains(&p) => p,
        Some(p) => {
            warn!("Setting '{}' = {} out of range 0-100, clamping", key, p);
            if p.is_nan() { default } else { p.clamp(0.0, 100.0) }
        }
        None => {
            warn!("Setting '{}' expected a number, got {}", key, value);
            default
        }
    }
}

fn enum_value<T: Copy>(
    map: &SettingsMap,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
    default: T,
) -> T {
    let Some(value) = map.get(key) else {
        return default;
    };
    match scalar_string(value).as_deref().and_then(parse) {
        Some(v) => v,
        None => {
            warn!("Ignoring invalid value {} for setting '{}'", value, key);
            default
        }
    }
}

/// Names of the fields changed by one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changed: BTreeSet<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changed.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.changed.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }

    /// The font stylesheet must be (re)loaded.
    pub fn font_url_changed(&self) -> bool {
        self.contains(keys::FONT_URL)
    }

    /// The refresh cadence may have to change.
    pub fn affects_granularity(&self) -> bool {
        self.contains(keys::SHOW_TIME)
    }

    /// The displayed string must be recomputed.
    pub fn affects_content(&self) -> bool {
        CONTENT_KEYS.iter().any(|k| self.contains(k))
    }

    /// Text metrics changed, so the fit must be recomputed.
    pub fn affects_metrics(&self) -> bool {
        self.affects_content() || METRIC_KEYS.iter().any(|k| self.contains(k))
    }

    fn insert(&mut self, key: &str) {
        self.changed.insert(key.to_string());
    }
}

/// Current settings plus the merge operation.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    values: SettingsMap,
    settings: Settings,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SettingsStore {
    /// Create a store from the built-in defaults, seeded with optional
    /// bootstrap values.
    pub fn new(bootstrap: Option<&SettingsMap>) -> Self {
        let mut values = default_settings_map();
        if let Some(seed) = bootstrap {
            for (key, value) in seed {
                values.insert(key.clone(), value.clone());
            }
        }
        let settings = Settings::from_map(&values);
        Self { values, settings }
    }

    /// Sparse merge of `partial` into the current values.
    ///
    /// Keys present in `partial` overwrite; everything else is untouched and
    /// nothing is ever removed. Returns the keys whose value actually changed.
    pub fn apply(&mut self, partial: &SettingsMap) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (key, value) in partial {
            if self.values.get(key) != Some(value) {
                self.values.insert(key.clone(), value.clone());
                changes.insert(key);
            }
        }

        if !changes.is_empty() {
            self.settings = Settings::from_map(&self.values);
            debug!(
                "Settings changed: {}",
                changes.iter().collect::<Vec<_>>().join(", ")
            );
        }

        changes
    }

    /// Typed view of the current values.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Raw current values, including keys without a typed meaning.
    pub fn values(&self) -> &SettingsMap {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(value: Value) -> SettingsMap {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_defaults_match_typed_defaults() {
        let store = SettingsStore::new(None);
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn test_bootstrap_seeds_values() {
        let seed = map(json!({ "showTime": true, "language": "de-DE" }));
        let store = SettingsStore::new(Some(&seed));
        assert!(store.settings().show_time);
        assert_eq!(store.settings().language, "de-DE");
        assert!(store.settings().show_date);
    }

    #[test]
    fn test_apply_reports_only_changed_keys() {
        let mut store = SettingsStore::default();
        let changes = store.apply(&map(json!({
            "showTime": true,
            "showDate": true,
            "textColor": "#ff0000",
        })));

        assert!(changes.contains("showTime"));
        assert!(changes.contains("textColor"));
        // Same value as the default
        assert!(!changes.contains("showDate"));
        assert_eq!(changes.len(), 2);
        assert!(changes.affects_granularity());
        assert!(!changes.font_url_changed());
    }

    #[test]
    fn test_apply_is_sparse() {
        let mut store = SettingsStore::default();
        store.apply(&map(json!({ "language": "fr-FR", "textAlign": "left" })));
        let before = store.values().clone();

        store.apply(&map(json!({ "textAlign": "right" })));

        for (key, value) in &before {
            if key != "textAlign" {
                assert_eq!(store.values().get(key), Some(value), "key {key} changed");
            }
        }
        assert_eq!(store.settings().text_align, TextAlign::Right);
        assert_eq!(store.settings().language, "fr-FR");
    }

    #[test]
    fn test_unknown_keys_are_retained() {
        let mut store = SettingsStore::default();
        let changes = store.apply(&map(json!({ "futureOption": { "a": 1 } })));
        assert!(changes.contains("futureOption"));

        store.apply(&map(json!({ "showTime": true })));
        assert_eq!(store.values().get("futureOption"), Some(&json!({ "a": 1 })));

        store.apply(&map(json!({ "futureOption": 2 })));
        assert_eq!(store.values().get("futureOption"), Some(&json!(2)));
    }

    #[test]
    fn test_empty_update_changes_nothing() {
        let mut store = SettingsStore::default();
        let changes = store.apply(&SettingsMap::new());
        assert!(changes.is_empty());
    }

    #[test]
    fn test_font_url_change_detected() {
        let mut store = SettingsStore::default();
        let changes = store.apply(&map(json!({ "fontUrl": "https://fonts.example/a.css" })));
        assert!(changes.font_url_changed());

        let again = store.apply(&map(json!({ "fontUrl": "https://fonts.example/a.css" })));
        assert!(!again.font_url_changed());
    }

    #[test]
    fn test_font_size_parsing() {
        assert_eq!(parse_font_size(&json!(48)), Some(FontSize::Px(48.0)));
        assert_eq!(parse_font_size(&json!("auto")), Some(FontSize::Auto));
        assert_eq!(parse_font_size(&json!("AUTO")), Some(FontSize::Auto));
        assert_eq!(parse_font_size(&json!("32px")), Some(FontSize::Px(32.0)));
        assert_eq!(parse_font_size(&json!(0)), None);
        assert_eq!(parse_font_size(&json!("big")), None);
        assert_eq!(parse_font_size(&json!(true)), None);
    }

    #[test]
    fn test_time_format_accepts_number_or_string() {
        let s = Settings::from_map(&map(json!({ "timeFormat": 24 })));
        assert_eq!(s.time_format, TimeFormat::H24);
        let s = Settings::from_map(&map(json!({ "timeFormat": "24" })));
        assert_eq!(s.time_format, TimeFormat::H24);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let s = Settings::from_map(&map(json!({
            "textAlign": "justify",
            "dateFormat": "roman",
            "showTime": "yes",
            "fontFamily": 12,
        })));
        assert_eq!(s.text_align, TextAlign::Center);
        assert_eq!(s.date_format, DateFormat::Full);
        assert!(!s.show_time);
        assert_eq!(s.font_family, DEFAULT_FONT_FAMILY);
    }

    #[test]
    fn test_percentages_are_clamped() {
        let s = Settings::from_map(&map(json!({
            "backgroundOpacity": 150,
            "letterSpacingPercent": -5,
        })));
        assert_eq!(s.background_opacity, 100.0);
        assert_eq!(s.letter_spacing_percent, 0.0);

        let s = Settings::from_map(&map(json!({ "backgroundOpacity": "40" })));
        assert_eq!(s.background_opacity, 40.0);
    }

    #[test]
    fn test_change_set_classification() {
        let mut store = SettingsStore::default();
        let changes = store.apply(&map(json!({ "fontWeight": "300" })));
        assert!(changes.affects_metrics());
        assert!(!changes.affects_content());

        let changes = store.apply(&map(json!({ "language": "de-DE" })));
        assert!(changes.affects_content());
        assert!(changes.affects_metrics());

        let changes = store.apply(&map(json!({ "textShadow": false })));
        assert!(!changes.affects_metrics());
    }
}
