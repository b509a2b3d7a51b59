//! Headless host bridge.
//!
//! Background threads (stdin reader, font fetches) never touch the widget;
//! they post [`HostEvent`]s to the main loop, which owns it.

mod fonts;
mod stdio;
mod terminal;

pub use fonts::HttpFontHost;
pub use stdio::{StdoutNotifier, spawn_stdin_reader};
pub use terminal::TerminalSurface;

use dateaddon_core::{SettingsMap, WidgetEvent};

/// Message posted to the main loop.
#[derive(Debug)]
pub enum HostEvent {
    /// Sparse settings update from the host.
    Settings(SettingsMap),
    /// Event produced on behalf of the widget (font settlement).
    Widget(WidgetEvent),
    /// stdin reached end of file.
    InputClosed,
}
