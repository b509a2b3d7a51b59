//! Configuration delta sources.
//!
//! A [`ConfigSource`] yields sparse settings updates lazily. The widget pulls
//! from it with [`DateWidget::pump`](crate::widget::DateWidget::pump).

use std::io::BufRead;

use tracing::{debug, warn};

use crate::protocol::HostMessage;
use crate::settings::SettingsMap;

pub trait ConfigSource {
    /// Next pending delta, or `None` when nothing is available right now.
    fn next_delta(&mut self) -> Option<SettingsMap>;

    /// Rewind to the first delta. Returns false if the source can't replay.
    fn restart(&mut self) -> bool {
        false
    }
}

/// A fixed list of deltas, replayable from the start.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    deltas: Vec<SettingsMap>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(deltas: Vec<SettingsMap>) -> Self {
        Self { deltas, cursor: 0 }
    }

    pub fn push(&mut self, delta: SettingsMap) {
        self.deltas.push(delta);
    }
}

impl ConfigSource for ScriptedSource {
    fn next_delta(&mut self) -> Option<SettingsMap> {
        let delta = self.deltas.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(delta)
    }

    fn restart(&mut self) -> bool {
        self.cursor = 0;
        true
    }
}

/// Host messages as JSON lines.
///
/// Blank lines, malformed lines and message types other than
/// `SETTINGS_UPDATE` are skipped.
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

impl<R: BufRead> ConfigSource for JsonLinesSource<R> {
    fn next_delta(&mut self) -> Option<SettingsMap> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    warn!("Failed to read host message: {}", e);
                    return None;
                }
            }

            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }

            match HostMessage::parse(line) {
                Ok(Some(HostMessage::SettingsUpdate { settings })) => return Some(settings),
                Ok(None) => debug!("Ignoring host message: {}", line),
                Err(e) => warn!("Ignoring malformed host message: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_json_lines_source_skips_noise() {
        let input = concat!(
            "\n",
            "{\"type\":\"SETTINGS_UPDATE\",\"settings\":{\"showTime\":true}}\n",
            "not json\n",
            "{\"type\":\"PING\"}\n",
            "{\"type\":\"SETTINGS_UPDATE\",\"settings\":{\"language\":\"de-DE\"}}\n",
        );
        let mut source = JsonLinesSource::new(Cursor::new(input));

        let first = source.next_delta().unwrap();
        assert_eq!(first.get("showTime"), Some(&json!(true)));
        let second = source.next_delta().unwrap();
        assert_eq!(second.get("language"), Some(&json!("de-DE")));
        assert!(source.next_delta().is_none());
        assert!(!source.restart());
    }

    #[test]
    fn test_scripted_source_restarts() {
        let mut delta = SettingsMap::new();
        delta.insert("showDate".to_string(), json!(false));
        let mut source = ScriptedSource::new(vec![delta.clone()]);

        assert_eq!(source.next_delta(), Some(delta.clone()));
        assert_eq!(source.next_delta(), None);
        assert!(source.restart());
        assert_eq!(source.next_delta(), Some(delta));
    }
}
