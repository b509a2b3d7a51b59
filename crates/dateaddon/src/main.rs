//! dateaddon - day, date and time display addon
//!
//! Headless host bridge: reads `SETTINGS_UPDATE` messages as JSON lines on
//! stdin, previews the widget on stderr and announces readiness on stdout.

mod host;

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};

use dateaddon_core::fit::FitStrategy;
use dateaddon_core::{
    ChronoFormatter, Clock, Config, ContainerSize, DateWidget, FontLoadState, SystemClock,
    WidgetPorts, logging,
};

use crate::host::{HostEvent, HttpFontHost, StdoutNotifier, TerminalSurface};

/// dateaddon - day, date and time display addon
#[derive(Parser, Debug)]
#[command(name = "dateaddon", version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (uses XDG lookup if not specified)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Correlation token for the ready message (overrides addon.layer_id)
    #[arg(long)]
    layer_id: Option<String>,

    /// Container width in pixels
    #[arg(long, default_value_t = 360.0)]
    width: f64,

    /// Container height in pixels
    #[arg(long, default_value_t = 100.0)]
    height: f64,

    /// Fitting strategy (overrides fit.strategy)
    #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(FitStrategy::VALID.iter().copied()))]
    strategy: Option<String>,

    /// Exit once the first frame is final (after the ready message, if any)
    #[arg(long)]
    once: bool,

    /// Validate configuration and exit (returns non-zero on errors)
    #[arg(long)]
    check_config: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    logging::init(args.verbose);

    if args.print_default_config {
        print!("{}", dateaddon_core::DEFAULT_CONFIG_TOML);
        return ExitCode::SUCCESS;
    }

    // If --config is specified, it must exist and be valid (no fallback)
    let load_result = match Config::find_and_load(args.config.as_deref()) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref source) = load_result.source {
        info!("Loaded configuration from {:?}", source);
    } else if load_result.used_defaults {
        warn!("Using default configuration (no config file found)");
    }

    let mut config = load_result.config;
    if let Some(layer_id) = args.layer_id.clone() {
        config.addon.layer_id = Some(layer_id);
    }
    if let Some(strategy) = args.strategy.clone() {
        config.fit.strategy = strategy;
    }

    // Strict: fail on invalid values
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    for warning in config.warnings() {
        warn!("{}", warning);
    }

    debug!("Configuration validated successfully");

    if args.check_config {
        if let Some(ref source) = load_result.source {
            println!("Configuration valid: {}", source.display());
        } else {
            println!("Configuration valid (using defaults)");
        }
        eprintln!("{}", config.summary());
        return ExitCode::SUCCESS;
    }

    match run(&config, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Drive the widget until stdin closes (or the first final frame with `--once`).
fn run(config: &Config, args: &Args) -> anyhow::Result<()> {
    let options = config
        .widget_options()
        .context("failed to read [settings] from configuration")?;
    let wait_for_ready = options.layer_id.is_some();

    let size = ContainerSize::new(args.width, args.height);
    if size.is_degenerate() {
        anyhow::bail!("container size must be positive, got {}x{}", size.width, size.height);
    }

    let (tx, rx) = mpsc::channel::<HostEvent>();
    let clock = Rc::new(SystemClock::new());

    let ports = WidgetPorts {
        surface: Box::new(TerminalSurface::new(size)),
        fonts: Box::new(HttpFontHost::new(tx.clone(), options.font_timeout_ms)),
        notifier: Box::new(StdoutNotifier),
        formatter: Box::new(ChronoFormatter),
        clock: clock.clone(),
    };
    let mut widget = DateWidget::new(options, ports);

    if !args.once {
        host::spawn_stdin_reader(tx);
    }

    loop {
        if args.once && is_final(&widget, wait_for_ready) {
            debug!("First frame final, exiting");
            break;
        }

        let event = match widget.next_deadline() {
            Some(deadline) => {
                let wait = deadline.saturating_sub(clock.now_ms());
                rx.recv_timeout(Duration::from_millis(wait))
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match event {
            Ok(HostEvent::Settings(delta)) => {
                widget.apply_settings(&delta);
            }
            Ok(HostEvent::Widget(event)) => widget.handle_event(event),
            Ok(HostEvent::InputClosed) => {
                info!("Host closed input, shutting down");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        widget.advance();
    }

    widget.teardown();
    Ok(())
}

/// The displayed text is in its final font (and announced, if announcing).
fn is_final(widget: &DateWidget, wait_for_ready: bool) -> bool {
    if matches!(widget.font_state(), FontLoadState::Loading { .. }) {
        return false;
    }
    // Nothing visible means nothing will ever be announced
    !wait_for_ready || widget.is_ready() || widget.text().is_empty()
}
