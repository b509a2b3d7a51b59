//! Core of the date display addon.
//!
//! Everything here is platform-free: rendering, font loading, time and host
//! messaging are reached through ports so the widget can be driven by a real
//! host bridge or by tests with a manual clock.

pub mod clock;
pub mod config;
pub mod error;
pub mod fit;
pub mod font;
pub mod format;
pub mod logging;
pub mod protocol;
pub mod ready;
pub mod scheduler;
pub mod settings;
pub mod source;
pub mod style;
pub mod surface;
pub mod timer;
pub mod widget;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigLoadResult, DEFAULT_CONFIG_TOML};
pub use error::{Error, FontLoadError, FormatError, Result};
pub use fit::{ApproximateMetrics, ContainerSize, FitResult, FitStrategy, Measure, TextBox, TextStyle};
pub use font::{FontHost, FontLoadState};
pub use format::{ChronoFormatter, DateTimeFormatter, DisplayText};
pub use protocol::{AddonMessage, HostMessage};
pub use ready::ReadyNotifier;
pub use settings::{Settings, SettingsMap};
pub use source::{ConfigSource, JsonLinesSource, ScriptedSource};
pub use style::ContainerStyle;
pub use surface::RenderSurface;
pub use widget::{DateWidget, WidgetEvent, WidgetOptions, WidgetPorts};
