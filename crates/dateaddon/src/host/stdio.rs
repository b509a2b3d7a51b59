use std::io::{self, Write};
use std::sync::mpsc::Sender;
use std::thread;

use dateaddon_core::{AddonMessage, ConfigSource, JsonLinesSource, ReadyNotifier};
use tracing::{debug, info, warn};

use super::HostEvent;

/// Read `SETTINGS_UPDATE` lines from stdin on a background thread.
pub fn spawn_stdin_reader(tx: Sender<HostEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut source = JsonLinesSource::new(stdin.lock());

        while let Some(delta) = source.next_delta() {
            if tx.send(HostEvent::Settings(delta)).is_err() {
                debug!("Main loop gone, stopping stdin reader");
                return;
            }
        }

        info!("Host input closed");
        let _ = tx.send(HostEvent::InputClosed);
    });
}

/// Writes outbound messages to stdout as JSON lines.
#[derive(Debug, Default)]
pub struct StdoutNotifier;

impl ReadyNotifier for StdoutNotifier {
    fn notify(&mut self, message: &AddonMessage) {
        let line = match serde_json::to_string(message) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode host message: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line).and_then(|()| stdout.flush()) {
            warn!("Failed to write host message: {}", e);
        }
    }
}
