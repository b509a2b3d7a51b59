//! Web font stylesheet loading.
//!
//! Only one stylesheet is attached at a time. Every load bumps a generation
//! counter; settlements and timeouts carry the generation they belong to and
//! are discarded unless it is still current, so a superseded or timed-out
//! request can never change state afterwards.

use tracing::{debug, info, warn};

use crate::error::FontLoadError;

/// Load timeout used when none is configured.
pub const DEFAULT_FONT_TIMEOUT_MS: u64 = 5000;

/// Attaches and detaches the external font stylesheet.
///
/// Implementations report completion of an attach by feeding
/// [`FontLoader::settle`] with the same `generation`.
pub trait FontHost {
    fn attach(&mut self, url: &str, generation: u64);
    fn detach(&mut self);
}

/// State of the widget's custom font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontLoadState {
    Idle,
    Loading { url: String, started_at_ms: u64 },
    Loaded { url: String },
    Failed { url: String, reason: String },
    TimedOut { url: String },
}

/// Result of starting a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStart {
    /// Empty URL: nothing to load, fallback fonts are final.
    Skipped,
    /// Waiting for settlement; arm a timeout for `generation`.
    Started { generation: u64 },
}

/// Tracks the current font load and discards stale outcomes.
#[derive(Debug, Clone)]
pub struct FontLoader {
    state: FontLoadState,
    generation: u64,
    timeout_ms: u64,
}

impl Default for FontLoader {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_TIMEOUT_MS)
    }
}

impl FontLoader {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            state: FontLoadState::Idle,
            generation: 0,
            timeout_ms,
        }
    }

    pub fn state(&self) -> &FontLoadState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, FontLoadState::Loading { .. })
    }

    /// Start loading `url`, superseding any earlier request.
    ///
    /// The previous stylesheet is detached first, also when `url` is empty.
    pub fn load(&mut self, url: &str, now_ms: u64, host: &mut dyn FontHost) -> LoadStart {
        if self.is_loading() {
            debug!("Font load #{} superseded", self.generation);
        }
        self.generation += 1;
        host.detach();

        let url = url.trim();
        if url.is_empty() {
            self.state = FontLoadState::Idle;
            return LoadStart::Skipped;
        }

        info!("Loading custom font #{}: {}", self.generation, url);
        host.attach(url, self.generation);
        self.state = FontLoadState::Loading {
            url: url.to_string(),
            started_at_ms: now_ms,
        };

        LoadStart::Started {
            generation: self.generation,
        }
    }

    /// Apply the platform's success/error signal for `generation`.
    ///
    /// Returns the outcome if it was applied, `None` if it was stale.
    pub fn settle(
        &mut self,
        generation: u64,
        result: Result<(), String>,
    ) -> Option<Result<(), FontLoadError>> {
        let url = self.take_loading_url(generation)?;

        match result {
            Ok(()) => {
                info!("Custom font loaded: {}", url);
                self.state = FontLoadState::Loaded { url };
                Some(Ok(()))
            }
            Err(reason) => {
                warn!("Failed to load custom font {}, using fallback: {}", url, reason);
                self.state = FontLoadState::Failed {
                    url,
                    reason: reason.clone(),
                };
                Some(Err(FontLoadError::Failed(reason)))
            }
        }
    }

    /// Apply the timeout for `generation`.
    pub fn time_out(&mut self, generation: u64) -> Option<Result<(), FontLoadError>> {
        let url = self.take_loading_url(generation)?;
        warn!(
            "Font load timed out after {}ms, using fallback: {}",
            self.timeout_ms, url
        );
        self.state = FontLoadState::TimedOut { url };
        Some(Err(FontLoadError::TimedOut))
    }

    /// Drop the custom font entirely (teardown).
    pub fn unload(&mut self, host: &mut dyn FontHost) {
        self.generation += 1;
        host.detach();
        self.state = FontLoadState::Idle;
    }

    fn take_loading_url(&self, generation: u64) -> Option<String> {
        if generation != self.generation {
            debug!(
                "Ignoring outcome of superseded font load #{} (current #{})",
                generation, self.generation
            );
            return None;
        }
        match &self.state {
            FontLoadState::Loading { url, .. } => Some(url.clone()),
            _ => {
                debug!("Ignoring outcome of already settled font load #{}", generation);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingHost {
        attached: Option<(String, u64)>,
        attaches: u32,
        detaches: u32,
    }

    impl FontHost for RecordingHost {
        fn attach(&mut self, url: &str, generation: u64) {
            assert!(self.attached.is_none(), "attached over an existing stylesheet");
            self.attached = Some((url.to_string(), generation));
            self.attaches += 1;
        }

        fn detach(&mut self) {
            self.attached = None;
            self.detaches += 1;
        }
    }

    const URL_A: &str = "https://fonts.example/a.css";
    const URL_B: &str = "https://fonts.example/b.css";

    #[test]
    fn test_empty_url_is_skipped() {
        let mut host = RecordingHost::default();
        let mut loader = FontLoader::default();
        assert_eq!(loader.load("", 0, &mut host), LoadStart::Skipped);
        assert_eq!(loader.state(), &FontLoadState::Idle);
        assert_eq!(host.attaches, 0);
    }

    #[test]
    fn test_load_then_success() {
        let mut host = RecordingHost::default();
        let mut loader = FontLoader::default();
        let LoadStart::Started { generation } = loader.load(URL_A, 10, &mut host) else {
            panic!("expected a started load");
        };
        assert!(loader.is_loading());
        assert_eq!(host.attached, Some((URL_A.to_string(), generation)));

        assert_eq!(loader.settle(generation, Ok(())), Some(Ok(())));
        assert_eq!(
            loader.state(),
            &FontLoadState::Loaded {
                url: URL_A.to_string()
            }
        );
    }

    #[test]
    fn test_failure_is_reported() {
        let mut host = RecordingHost::default();
        let mut loader = FontLoader::default();
        let LoadStart::Started { generation } = loader.load(URL_A, 0, &mut host) else {
            panic!("expected a started load");
        };
        let outcome = loader.settle(generation, Err("404".to_string()));
        assert_eq!(outcome, Some(Err(FontLoadError::Failed("404".to_string()))));
        assert!(matches!(loader.state(), FontLoadState::Failed { .. }));
    }

    #[test]
    fn test_timeout_wins_over_late_success() {
        let mut host = RecordingHost::default();
        let mut loader = FontLoader::default();
        let LoadStart::Started { generation } = loader.load(URL_A, 0, &mut host) else {
            panic!("expected a started load");
        };

        assert_eq!(loader.time_out(generation), Some(Err(FontLoadError::TimedOut)));
        assert_eq!(loader.settle(generation, Ok(())), None);
        assert_eq!(
            loader.state(),
            &FontLoadState::TimedOut {
                url: URL_A.to_string()
            }
        );
    }

    #[test]
    fn test_timeout_after_success_is_ignored() {
        let mut host = RecordingHost::default();
        let mut loader = FontLoader::default();
        let LoadStart::Started { generation } = loader.load(URL_A, 0, &mut host) else {
            panic!("expected a started load");
        };
        loader.settle(generation, Ok(()));
        assert_eq!(loader.time_out(generation), None);
        assert!(matches!(loader.state(), FontLoadState::Loaded { .. }));
    }

    #[test]
    fn test_superseded_outcome_is_discarded() {
        let mut host = RecordingHost::default();
        let mut loader = FontLoader::default();
        let LoadStart::Started { generation: first } = loader.load(URL_A, 0, &mut host) else {
            panic!("expected a started load");
        };
        let LoadStart::Started { generation: second } = loader.load(URL_B, 5, &mut host) else {
            panic!("expected a started load");
        };
        assert!(second > first);
        assert_eq!(host.attached, Some((URL_B.to_string(), second)));

        // Late outcomes of #1 change nothing
        assert_eq!(loader.settle(first, Err("network".to_string())), None);
        assert_eq!(loader.time_out(first), None);
        assert!(loader.is_loading());

        assert_eq!(loader.settle(second, Ok(())), Some(Ok(())));
    }

    #[test]
    fn test_new_load_detaches_previous() {
        let mut host = RecordingHost::default();
        let mut loader = FontLoader::default();
        loader.load(URL_A, 0, &mut host);
        loader.load(URL_B, 0, &mut host);
        assert_eq!(host.attaches, 2);
        assert_eq!(host.detaches, 2);

        // Clearing the URL removes the stylesheet and retires the pending load
        let pending = loader.generation();
        assert_eq!(loader.load("", 0, &mut host), LoadStart::Skipped);
        assert!(host.attached.is_none());
        assert_eq!(loader.settle(pending, Ok(())), None);
    }

    #[test]
    fn test_unload_retires_pending_load() {
        let mut host = RecordingHost::default();
        let mut loader = FontLoader::default();
        let LoadStart::Started { generation } = loader.load(URL_A, 0, &mut host) else {
            panic!("expected a started load");
        };
        loader.unload(&mut host);
        assert!(host.attached.is_none());
        assert_eq!(loader.settle(generation, Ok(())), None);
        assert_eq!(loader.state(), &FontLoadState::Idle);
    }
}
