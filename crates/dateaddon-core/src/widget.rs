//! The date display widget.
//!
//! Wires the settings store, font loader, text fitter, refresh scheduler and
//! ready signal to the injected ports. All handlers run to completion on one
//! thread; the host delivers events and calls [`DateWidget::advance`] when
//! [`DateWidget::next_deadline`] is reached.

use std::rc::Rc;

use tracing::{debug, info, trace};

use crate::clock::Clock;
use crate::fit::{ContainerSize, FitResult, FitStrategy, TextFitter, TextStyle};
use crate::font::{DEFAULT_FONT_TIMEOUT_MS, FontHost, FontLoadState, FontLoader, LoadStart};
use crate::format::{DateTimeFormatter, DisplayText, compose_with_fallback};
use crate::protocol::HostMessage;
use crate::ready::{ReadyNotifier, ReadySignal};
use crate::scheduler::RefreshScheduler;
use crate::settings::{ChangeSet, FontSize, Settings, SettingsMap, SettingsStore};
use crate::source::ConfigSource;
use crate::style::{ContainerStyle, FontPhase};
use crate::surface::RenderSurface;
use crate::timer::{TimerId, TimerQueue};

/// Construction-time options.
#[derive(Debug, Clone)]
pub struct WidgetOptions {
    /// Correlation token echoed in the ready message.
    pub layer_id: Option<String>,
    /// Pre-injected settings, applied before the first render.
    pub bootstrap: Option<SettingsMap>,
    pub fit_strategy: FitStrategy,
    pub font_timeout_ms: u64,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            layer_id: None,
            bootstrap: None,
            fit_strategy: FitStrategy::default(),
            font_timeout_ms: DEFAULT_FONT_TIMEOUT_MS,
        }
    }
}

/// Injected collaborators.
pub struct WidgetPorts {
    pub surface: Box<dyn RenderSurface>,
    pub fonts: Box<dyn FontHost>,
    pub notifier: Box<dyn ReadyNotifier>,
    pub formatter: Box<dyn DateTimeFormatter>,
    pub clock: Rc<dyn Clock>,
}

/// Events delivered by the host loop.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    Host(HostMessage),
    FontSettled {
        generation: u64,
        result: Result<(), String>,
    },
    Resized(ContainerSize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Refresh,
    FontTimeout { generation: u64 },
}

pub struct DateWidget {
    ports: WidgetPorts,
    store: SettingsStore,
    fonts: FontLoader,
    fitter: TextFitter,
    scheduler: RefreshScheduler,
    ready: ReadySignal,
    timers: TimerQueue<TimerKind>,
    font_timeout: Option<TimerId>,
    container: ContainerSize,
    text: DisplayText,
    fit: Option<FitResult>,
    torn_down: bool,
}

impl DateWidget {
    /// Create the widget, render once and start the refresh timer.
    pub fn new(options: WidgetOptions, ports: WidgetPorts) -> Self {
        let container = ports.surface.container_size();
        let mut widget = Self {
            ports,
            store: SettingsStore::new(options.bootstrap.as_ref()),
            fonts: FontLoader::new(options.font_timeout_ms),
            fitter: TextFitter::new(options.fit_strategy),
            scheduler: RefreshScheduler::new(),
            ready: ReadySignal::new(options.layer_id),
            timers: TimerQueue::new(),
            font_timeout: None,
            container,
            text: DisplayText::default(),
            fit: None,
            torn_down: false,
        };

        let font_url = widget.store.settings().font_url.clone();
        widget.start_font_load(&font_url);
        widget.apply_style();
        widget.refresh();
        widget.reschedule();
        widget.check_ready();

        info!(
            "Date display addon initialized ({} fit, {}x{})",
            widget.fitter.strategy().name(),
            container.width,
            container.height
        );
        widget
    }

    pub fn handle_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::Host(message) => self.handle_message(message),
            WidgetEvent::FontSettled { generation, result } => {
                self.font_settled(generation, result)
            }
            WidgetEvent::Resized(size) => self.resize(size),
        }
    }

    pub fn handle_message(&mut self, message: HostMessage) {
        match message {
            HostMessage::SettingsUpdate { settings } => {
                self.apply_settings(&settings);
            }
        }
    }

    /// Merge a sparse settings update and react to what changed.
    pub fn apply_settings(&mut self, partial: &SettingsMap) -> ChangeSet {
        if self.torn_down {
            debug!("Ignoring settings update after teardown");
            return ChangeSet::default();
        }

        let changes = self.store.apply(partial);
        if changes.is_empty() {
            return changes;
        }

        if changes.font_url_changed() {
            let url = self.store.settings().font_url.clone();
            self.start_font_load(&url);
        }

        self.apply_style();

        let refitted = changes.affects_content() && self.refresh();
        if !refitted && (changes.affects_metrics() || changes.font_url_changed()) {
            self.refit();
        }

        if changes.affects_granularity() {
            self.reschedule();
        }

        self.check_ready();
        changes
    }

    /// Apply every delta currently available from `source`.
    pub fn pump(&mut self, source: &mut dyn ConfigSource) -> usize {
        let mut applied = 0;
        while let Some(delta) = source.next_delta() {
            self.apply_settings(&delta);
            applied += 1;
        }
        applied
    }

    /// Platform success/error signal for the font load `generation`.
    pub fn font_settled(&mut self, generation: u64, result: Result<(), String>) {
        if self.torn_down {
            return;
        }
        if self.fonts.settle(generation, result).is_some() {
            if let Some(timer) = self.font_timeout.take() {
                self.timers.cancel(timer);
            }
            self.on_font_final();
        }
    }

    /// The container was resized.
    pub fn resize(&mut self, size: ContainerSize) {
        if self.torn_down || size == self.container {
            return;
        }
        trace!("Container resized to {}x{}", size.width, size.height);
        self.container = size;
        self.refit();
    }

    /// Fire every timer due at the clock's current time.
    pub fn advance(&mut self) {
        if self.torn_down {
            return;
        }
        let now = self.ports.clock.now_ms();
        while let Some((id, kind)) = self.timers.pop_due(now) {
            match kind {
                TimerKind::Refresh => {
                    if self.scheduler.owns(id) {
                        self.refresh();
                        self.check_ready();
                    }
                }
                TimerKind::FontTimeout { generation } => {
                    if self.font_timeout == Some(id) {
                        self.font_timeout = None;
                    }
                    if self.fonts.time_out(generation).is_some() {
                        self.on_font_final();
                    }
                }
            }
        }
    }

    /// Monotonic time of the next pending timer, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    /// Cancel all timers and drop the custom font. Later events are ignored.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.scheduler.cancel(&mut self.timers);
        self.timers.cancel_all();
        self.font_timeout = None;
        self.fonts.unload(self.ports.fonts.as_mut());
        self.torn_down = true;
        info!("Date display addon torn down");
    }

    pub fn settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn raw_settings(&self) -> &SettingsMap {
        self.store.values()
    }

    pub fn text(&self) -> &DisplayText {
        &self.text
    }

    pub fn fit(&self) -> Option<FitResult> {
        self.fit
    }

    pub fn font_state(&self) -> &FontLoadState {
        self.fonts.state()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.has_fired()
    }

    pub fn refresh_interval_ms(&self) -> Option<u64> {
        self.scheduler.interval_ms()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn start_font_load(&mut self, url: &str) {
        if let Some(timer) = self.font_timeout.take() {
            self.timers.cancel(timer);
        }

        let now = self.ports.clock.now_ms();
        match self.fonts.load(url, now, self.ports.fonts.as_mut()) {
            LoadStart::Skipped => {}
            LoadStart::Started { generation } => {
                let timer = self.timers.schedule_once(
                    now,
                    self.fonts.timeout_ms(),
                    TimerKind::FontTimeout { generation },
                );
                self.font_timeout = Some(timer);
            }
        }
    }

    /// The font load settled one way or another; metrics may have changed.
    fn on_font_final(&mut self) {
        self.apply_style();
        self.refit();
        self.check_ready();
    }

    fn font_phase(&self) -> FontPhase {
        match self.fonts.state() {
            FontLoadState::Idle => FontPhase::None,
            FontLoadState::Loading { .. } => FontPhase::Loading,
            _ => FontPhase::Settled,
        }
    }

    fn apply_style(&mut self) {
        let style = ContainerStyle::from_settings(self.store.settings(), self.font_phase());
        self.ports.surface.apply_style(&style);
    }

    /// Recompute the display string; refit when it changed. Returns whether
    /// it refitted.
    fn refresh(&mut self) -> bool {
        let now = self.ports.clock.local_now();
        let Some(text) =
            compose_with_fallback(self.ports.formatter.as_ref(), &now, self.store.settings())
        else {
            return false;
        };

        if text == self.text {
            return false;
        }
        self.ports.surface.set_text(&text);
        self.text = text;
        self.refit();
        true
    }

    fn refit(&mut self) {
        let settings = self.store.settings();
        let result = {
            let lines = self.text.lines();
            if lines.is_empty() {
                trace!("Nothing to fit");
                return;
            }

            match settings.font_size {
                FontSize::Px(px) => Some(FitResult::fixed(px, settings.letter_spacing_percent)),
                FontSize::Auto => {
                    let base = TextStyle {
                        font_family: settings.font_family.clone(),
                        font_weight: settings.font_weight.clone(),
                        font_size_px: 0.0,
                        letter_spacing_px: 0.0,
                    };
                    let surface = &self.ports.surface;
                    let measure =
                        |lines: &[&str], style: &TextStyle| surface.measure(lines, style);
                    self.fitter.fit(
                        &lines,
                        self.container,
                        &base,
                        settings.letter_spacing_percent,
                        &measure,
                    )
                }
            }
        };

        if let Some(fit) = result {
            if self.fit != Some(fit) {
                debug!(
                    "Fit {}x{} -> {:.1}px, spacing {:.2}px, scale {:.3}",
                    self.container.width,
                    self.container.height,
                    fit.font_size_px,
                    fit.letter_spacing_px,
                    fit.scale_factor
                );
                self.ports.surface.apply_fit(&fit);
                self.fit = Some(fit);
            }
        }
    }

    fn reschedule(&mut self) {
        let now_ms = self.ports.clock.now_ms();
        let wall = self.ports.clock.local_now();
        self.scheduler.schedule(
            self.store.settings().shows_seconds(),
            now_ms,
            &wall,
            &mut self.timers,
            TimerKind::Refresh,
        );
    }

    fn check_ready(&mut self) {
        self.ready.try_fire(
            !self.text.is_empty(),
            !self.fonts.is_loading(),
            self.ports.notifier.as_mut(),
        );
    }
}

impl Drop for DateWidget {
    fn drop(&mut self) {
        // Cancel timers and detach the font so nothing outlives the surface
        self.teardown();
    }
}
