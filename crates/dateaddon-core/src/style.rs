//! Container styling derived from settings.

use tracing::warn;

use crate::settings::{Settings, TextAlign};

/// Custom-font phase, mirrored onto the container as a state flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontPhase {
    /// No custom font configured.
    #[default]
    None,
    /// Stylesheet requested, text still in fallback fonts.
    Loading,
    /// Load settled (loaded, failed or timed out); fonts are final.
    Settled,
}

/// Everything the surface needs to style the container, except the fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerStyle {
    pub font_family: String,
    pub font_weight: String,
    pub text_color: String,
    /// CSS `rgba(...)` background.
    pub background: String,
    pub with_background: bool,
    pub text_align: TextAlign,
    pub text_shadow: bool,
    /// Language attribute for the container.
    pub lang: String,
    /// Seconds animation; only set while the time is visible.
    pub animate_seconds: bool,
    pub font_phase: FontPhase,
}

impl ContainerStyle {
    pub fn from_settings(settings: &Settings, font_phase: FontPhase) -> Self {
        let alpha = settings.background_opacity / 100.0;
        let background = hex_to_rgba(&settings.background_color, alpha).unwrap_or_else(|| {
            warn!(
                "Invalid backgroundColor '{}', expected hex like '#000000' or '#000'",
                settings.background_color
            );
            format!("rgba(0, 0, 0, {alpha})")
        });

        Self {
            font_family: settings.font_family.clone(),
            font_weight: settings.font_weight.clone(),
            text_color: settings.text_color.clone(),
            background,
            with_background: settings.background_opacity > 0.0,
            text_align: settings.text_align,
            text_shadow: settings.text_shadow,
            lang: settings.language.clone(),
            animate_seconds: settings.show_time && settings.animate_seconds,
            font_phase,
        }
    }
}

/// Parse a hex colour string into RGB components.
///
/// Accepts "#rrggbb", "rrggbb", "#rgb" and "rgb".
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let color = color.trim().trim_start_matches('#');

    // Expand shorthand (e.g., "fff" -> "ffffff")
    let color = if color.len() == 3 {
        color.chars().flat_map(|c| [c, c]).collect::<String>()
    } else {
        color.to_string()
    };

    if color.len() != 6 || !color.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&color[0..2], 16).ok()?;
    let g = u8::from_str_radix(&color[2..4], 16).ok()?;
    let b = u8::from_str_radix(&color[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Hex colour plus alpha (0.0-1.0) as a CSS `rgba()` value.
pub fn hex_to_rgba(hex: &str, alpha: f64) -> Option<String> {
    let (r, g, b) = parse_hex_color(hex)?;
    Some(format!("rgba({r}, {g}, {b}, {alpha})"))
}
