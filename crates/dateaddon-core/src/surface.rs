//! Rendering surface port.
//!
//! The surface owns the container and text nodes. The widget writes text,
//! styles and fit results to it and reads back sizes and text metrics.

use crate::fit::{ContainerSize, FitResult, TextBox, TextStyle};
use crate::format::DisplayText;
use crate::style::ContainerStyle;

pub trait RenderSurface {
    /// Current content box of the container.
    fn container_size(&self) -> ContainerSize;

    /// Replace the displayed text. Parts that are `None` are hidden.
    fn set_text(&mut self, text: &DisplayText);

    fn apply_style(&mut self, style: &ContainerStyle);

    /// Apply font size, letter spacing and the centre-anchored scale.
    fn apply_fit(&mut self, fit: &FitResult);

    /// Measure `lines` rendered unwrapped with `style`.
    fn measure(&self, lines: &[&str], style: &TextStyle) -> TextBox;
}
