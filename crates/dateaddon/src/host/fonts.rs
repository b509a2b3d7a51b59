//! Font stylesheet fetching.
//!
//! There is no renderer to install the font into, so a load counts as
//! successful once the stylesheet itself has been fetched.

use std::sync::mpsc::Sender;
use std::thread;

use dateaddon_core::{FontHost, WidgetEvent};
use tracing::{debug, trace};

use super::HostEvent;

/// Fetches stylesheets with `minreq` on short-lived threads.
///
/// Outcomes are posted back with the generation they were started for; the
/// widget drops those that have been superseded in the meantime.
pub struct HttpFontHost {
    tx: Sender<HostEvent>,
    timeout_secs: u64,
    attached: Option<u64>,
}

impl HttpFontHost {
    /// `timeout_ms` bounds the HTTP request; the widget applies its own
    /// (usually identical) load timeout independently.
    pub fn new(tx: Sender<HostEvent>, timeout_ms: u64) -> Self {
        Self {
            tx,
            timeout_secs: timeout_ms.div_ceil(1000).max(1),
            attached: None,
        }
    }
}

impl FontHost for HttpFontHost {
    fn attach(&mut self, url: &str, generation: u64) {
        self.attached = Some(generation);

        let url = url.to_string();
        let tx = self.tx.clone();
        let timeout_secs = self.timeout_secs;

        // minreq is blocking, so fetch on a separate thread
        thread::spawn(move || {
            let result = fetch_stylesheet(&url, timeout_secs);
            let event = WidgetEvent::FontSettled { generation, result };
            if tx.send(HostEvent::Widget(event)).is_err() {
                trace!("Main loop gone, dropping font result #{}", generation);
            }
        });
    }

    fn detach(&mut self) {
        if let Some(generation) = self.attached.take() {
            debug!("Detached font stylesheet #{}", generation);
        }
    }
}

/// Fetch `url` and check it answered with a stylesheet.
fn fetch_stylesheet(url: &str, timeout_secs: u64) -> Result<(), String> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(format!("unsupported font URL scheme: {}", url));
    }

    let response = minreq::get(url)
        .with_timeout(timeout_secs)
        .send()
        .map_err(|e| e.to_string())?;

    if !(200..300).contains(&response.status_code) {
        return Err(format!(
            "HTTP {} {}",
            response.status_code, response.reason_phrase
        ));
    }

    let css = response.as_str().map_err(|e| e.to_string())?;
    if !css.contains("@font-face") {
        debug!("Stylesheet {} declares no @font-face rules", url);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_unsupported_scheme_is_rejected() {
        let err = fetch_stylesheet("ftp://fonts.example.com/a.css", 1).unwrap_err();
        assert!(err.contains("unsupported"));
    }

    #[test]
    fn test_attach_reports_with_generation() {
        let (tx, rx) = mpsc::channel();
        let mut host = HttpFontHost::new(tx, 5000);
        assert_eq!(host.timeout_secs, 5);

        host.attach("file:///tmp/font.css", 7);
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(HostEvent::Widget(WidgetEvent::FontSettled { generation, result })) => {
                assert_eq!(generation, 7);
                assert!(result.is_err());
            }
            other => panic!("unexpected event: {other:?}"),
        }

        host.detach();
        assert!(host.attached.is_none());
    }
}
