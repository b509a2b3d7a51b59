//! Text preview of the widget on stderr.

use std::io::{self, Write};

use dateaddon_core::settings::TextAlign;
use dateaddon_core::style::FontPhase;
use dateaddon_core::{
    ApproximateMetrics, ContainerSize, ContainerStyle, DisplayText, FitResult, Measure,
    RenderSurface, TextBox, TextStyle,
};
use tracing::warn;

/// Columns available for text inside the frame border.
const FRAME_COLUMNS: usize = 40;

/// Fixed-size surface that redraws a bordered frame whenever the visible
/// text, fit or alignment changes.
pub struct TerminalSurface {
    size: ContainerSize,
    metrics: ApproximateMetrics,
    text: DisplayText,
    style: Option<ContainerStyle>,
    fit: Option<FitResult>,
}

impl TerminalSurface {
    pub fn new(size: ContainerSize) -> Self {
        Self {
            size,
            metrics: ApproximateMetrics::default(),
            text: DisplayText::default(),
            style: None,
            fit: None,
        }
    }

    fn redraw(&self) {
        let frame = render_frame(self.size, &self.text, self.style.as_ref(), self.fit.as_ref());
        let mut stderr = io::stderr().lock();
        if let Err(e) = stderr.write_all(frame.as_bytes()) {
            warn!("Failed to draw frame: {}", e);
        }
    }
}

impl RenderSurface for TerminalSurface {
    fn container_size(&self) -> ContainerSize {
        self.size
    }

    fn set_text(&mut self, text: &DisplayText) {
        self.text = text.clone();
        self.redraw();
    }

    fn apply_style(&mut self, style: &ContainerStyle) {
        let relayout = self
            .style
            .as_ref()
            .is_none_or(|old| old.text_align != style.text_align);
        self.style = Some(style.clone());
        if relayout && !self.text.is_empty() {
            self.redraw();
        }
    }

    fn apply_fit(&mut self, fit: &FitResult) {
        self.fit = Some(*fit);
        self.redraw();
    }

    fn measure(&self, lines: &[&str], style: &TextStyle) -> TextBox {
        self.metrics.measure(lines, style)
    }
}

/// Render one frame: a header with size and font info, then the visible
/// lines aligned inside a border.
pub fn render_frame(
    size: ContainerSize,
    text: &DisplayText,
    style: Option<&ContainerStyle>,
    fit: Option<&FitResult>,
) -> String {
    let align = style.map(|s| s.text_align).unwrap_or_default();

    let mut header = format!("{}x{}", size.width, size.height);
    if let Some(fit) = fit {
        header.push_str(&format!(" {:.1}px", fit.effective_font_size()));
        if fit.scale_factor != 1.0 {
            header.push_str(&format!(" (scale {:.3})", fit.scale_factor));
        }
    }
    if let Some(style) = style {
        match style.font_phase {
            FontPhase::Loading => header.push_str(" font-loading"),
            FontPhase::Settled => header.push_str(" font-loaded"),
            FontPhase::None => {}
        }
    }

    let border = "-".repeat(FRAME_COLUMNS + 2);
    let mut out = format!("+{}+ {}\n", border, header);
    for line in text.lines() {
        out.push_str(&format!("| {} |\n", align_line(line, align, FRAME_COLUMNS)));
    }
    out.push_str(&format!("+{}+\n", border));
    out
}

/// Pad (or truncate) `line` to exactly `width` columns.
fn align_line(line: &str, align: TextAlign, width: usize) -> String {
    let line: String = line.chars().take(width).collect();
    let free = width - line.chars().count();
    let (left, right) = match align {
        TextAlign::Left => (0, free),
        TextAlign::Center => (free / 2, free - free / 2),
        TextAlign::Right => (free, 0),
    };
    format!("{}{}{}", " ".repeat(left), line, " ".repeat(right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dateaddon_core::Settings;

    #[test]
    fn test_align_line() {
        assert_eq!(align_line("ab", TextAlign::Left, 6), "ab    ");
        assert_eq!(align_line("ab", TextAlign::Center, 6), "  ab  ");
        assert_eq!(align_line("ab", TextAlign::Center, 5), " ab  ");
        assert_eq!(align_line("ab", TextAlign::Right, 6), "    ab");
        assert_eq!(align_line("abcdefgh", TextAlign::Left, 4), "abcd");
    }

    #[test]
    fn test_render_frame() {
        let text = DisplayText {
            day: Some("Monday".to_string()),
            date: None,
            time: Some("14:05:09".to_string()),
        };
        let style = ContainerStyle::from_settings(&Settings::default(), FontPhase::Settled);
        let fit = FitResult::fixed(48.0, 0.0);

        let frame = render_frame(ContainerSize::new(360.0, 100.0), &text, Some(&style), Some(&fit));
        let lines: Vec<&str> = frame.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("360x100 48.0px font-loaded"));
        assert!(lines[1].contains("Monday"));
        assert!(lines[2].contains("14:05:09"));
        assert_eq!(lines[1].chars().count(), FRAME_COLUMNS + 4);
    }

    #[test]
    fn test_render_frame_shows_scale() {
        let fit = FitResult {
            font_size_px: 12.0,
            letter_spacing_px: 0.0,
            scale_factor: 0.5,
        };
        let frame = render_frame(
            ContainerSize::new(6.0, 6.0),
            &DisplayText::default(),
            None,
            Some(&fit),
        );
        assert!(frame.starts_with('+'));
        assert!(frame.lines().next().unwrap().ends_with("6.0px (scale 0.500)"));
    }
}
