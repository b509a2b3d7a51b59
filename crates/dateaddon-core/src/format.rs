//! Locale-aware composition of the displayed text.
//!
//! The formatter itself is a port ([`DateTimeFormatter`]); [`ChronoFormatter`]
//! backs it with chrono's localized strftime. Composition falls back to
//! [`FALLBACK_LANGUAGE`] when the configured locale is rejected.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, Locale, Utc};
use tracing::{error, warn};

use crate::error::FormatError;
use crate::settings::{DateFormat, FALLBACK_LANGUAGE, Settings, TimeFormat};

/// One displayable component of the date/time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Day of week, long ("Monday") or abbreviated ("Mon").
    Weekday { long: bool },
    Date(DateFormat),
    Time(TimeFormat),
}

/// Pure `format(datetime, locale, options) -> string` service.
pub trait DateTimeFormatter {
    fn format(
        &self,
        at: &DateTime<FixedOffset>,
        locale: &str,
        field: Field,
    ) -> Result<String, FormatError>;
}

/// Formatter backed by chrono's built-in locale tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoFormatter;

/// Order of day, month and year in a written-out date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateOrder {
    /// "October 19, 2026"
    MonthFirst,
    /// "19 octobre 2026"
    DayFirst,
    /// "19. Oktober 2026"
    DayDotFirst,
    /// "2026. október 19."
    YearDotFirst,
    /// "2026年10月19日", month as a number
    Cjk(&'static str),
}

impl DateOrder {
    fn for_locale(language: &str, region: Option<&str>) -> Self {
        match language {
            "en" if matches!(region, None | Some("US" | "CA" | "PH")) => Self::MonthFirst,
            "de" | "da" | "nb" | "nn" | "fi" | "cs" | "sk" | "sl" | "hr" | "et" => {
                Self::DayDotFirst
            }
            "hu" => Self::YearDotFirst,
            "ja" | "zh" => Self::Cjk("%Y年%-m月%-d日"),
            "ko" => Self::Cjk("%Y년 %-m월 %-d일"),
            _ => Self::DayFirst,
        }
    }

    fn pattern(self, long_month: bool) -> &'static str {
        match (self, long_month) {
            (Self::MonthFirst, true) => "%B %-d, %Y",
            (Self::MonthFirst, false) => "%b %-d, %Y",
            (Self::DayFirst, true) => "%-d %B %Y",
            (Self::DayFirst, false) => "%-d %b %Y",
            (Self::DayDotFirst, true) => "%-d. %B %Y",
            (Self::DayDotFirst, false) => "%-d. %b %Y",
            (Self::YearDotFirst, true) => "%Y. %B %-d.",
            (Self::YearDotFirst, false) => "%Y. %b %-d.",
            (Self::Cjk(pattern), _) => pattern,
        }
    }
}

impl ChronoFormatter {
    fn pattern(field: Field, order: DateOrder) -> &'static str {
        match field {
            Field::Weekday { long: true } => "%A",
            Field::Weekday { long: false } => "%a",
            Field::Date(DateFormat::Full) => order.pattern(true),
            Field::Date(DateFormat::Short) => order.pattern(false),
            Field::Date(DateFormat::Numeric) => "%x",
            Field::Date(DateFormat::Iso) => "%Y-%m-%d",
            Field::Time(TimeFormat::H24) => "%H:%M:%S",
            // The marker is appended separately, see `format`
            Field::Time(TimeFormat::H12) => "%I:%M:%S",
        }
    }
}

impl DateTimeFormatter for ChronoFormatter {
    fn format(
        &self,
        at: &DateTime<FixedOffset>,
        locale: &str,
        field: Field,
    ) -> Result<String, FormatError> {
        let unknown = || FormatError::UnknownLocale(locale.to_string());
        let (language, region) = split_tag(locale).ok_or_else(unknown)?;
        let resolved = resolve_locale(locale).ok_or_else(unknown)?;
        let pattern = Self::pattern(field, DateOrder::for_locale(&language, region.as_deref()));
        let failed = |_| FormatError::Pattern(pattern.to_string());

        let mut out = String::new();
        match field {
            // ISO dates are the UTC calendar date
            Field::Date(DateFormat::Iso) => {
                write!(out, "{}", at.with_timezone(&Utc).format(pattern)).map_err(failed)?;
            }
            Field::Time(TimeFormat::H12) => {
                write!(out, "{}", at.format_localized(pattern, resolved)).map_err(failed)?;
                let mut marker = String::new();
                write!(marker, "{}", at.format_localized("%p", resolved)).map_err(failed)?;
                // Several locale tables carry no AM/PM strings
                if marker.trim().is_empty() {
                    marker.clear();
                    write!(marker, "{}", at.format("%p")).map_err(failed)?;
                }
                out.push(' ');
                out.push_str(marker.trim());
            }
            _ => {
                write!(out, "{}", at.format_localized(pattern, resolved)).map_err(failed)?;
            }
        }

        Ok(out.trim().to_string())
    }
}

/// Split "en-US" / "pt_br" into a lowercase language and uppercase region.
fn split_tag(tag: &str) -> Option<(String, Option<String>)> {
    let mut parts = tag.trim().split(['-', '_']).filter(|p| !p.is_empty());
    let language = parts.next()?.to_ascii_lowercase();
    let region = parts.next().map(str::to_ascii_uppercase);
    Some((language, region))
}

/// Map a locale tag like "en-US", "de" or "pt_br" onto a chrono locale.
pub fn resolve_locale(tag: &str) -> Option<Locale> {
    let (language, region) = split_tag(tag)?;

    let candidate = match region {
        Some(region) => format!("{language}_{region}"),
        None if language == "en" => "en_US".to_string(),
        None => format!("{language}_{}", language.to_ascii_uppercase()),
    };

    Locale::try_from(candidate.as_str()).ok()
}

/// The text currently shown, one entry per visible part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayText {
    pub day: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl DisplayText {
    /// Visible parts, top to bottom.
    pub fn lines(&self) -> Vec<&str> {
        [&self.day, &self.date, &self.time]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lines().is_empty()
    }
}

/// Format every enabled part with one locale.
pub fn compose(
    formatter: &dyn DateTimeFormatter,
    at: &DateTime<FixedOffset>,
    locale: &str,
    settings: &Settings,
) -> Result<DisplayText, FormatError> {
    let part = |enabled: bool, field: Field| -> Result<Option<String>, FormatError> {
        if enabled {
            formatter.format(at, locale, field).map(Some)
        } else {
            Ok(None)
        }
    };

    Ok(DisplayText {
        day: part(
            settings.show_day_of_week,
            Field::Weekday {
                long: settings.show_full_name,
            },
        )?,
        date: part(settings.show_date, Field::Date(settings.date_format))?,
        time: part(settings.show_time, Field::Time(settings.time_format))?,
    })
}

/// Format with the configured locale, retrying once with the fallback locale.
///
/// Returns `None` when both attempts fail; the caller keeps its previous text.
pub fn compose_with_fallback(
    formatter: &dyn DateTimeFormatter,
    at: &DateTime<FixedOffset>,
    settings: &Settings,
) -> Option<DisplayText> {
    match compose(formatter, at, &settings.language, settings) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(
                "Formatting with '{}' failed ({}), retrying with {}",
                settings.language, e, FALLBACK_LANGUAGE
            );
            match compose(formatter, at, FALLBACK_LANGUAGE, settings) {
                Ok(text) => Some(text),
                Err(e) => {
                    error!("Fallback formatting failed, keeping previous text: {}", e);
                    None
                }
            }
        }
    }
}
