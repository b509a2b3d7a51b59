//! Host message wire format.
//!
//! Messages are JSON objects discriminated by a `type` field:
//!
//! ```json
//! {"type": "SETTINGS_UPDATE", "settings": {"showTime": true}}
//! {"type": "ADDON_READY", "layerId": "layer-1"}
//! ```

use serde::{Deserialize, Serialize};

use crate::settings::SettingsMap;

/// Messages sent from the host to the addon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    /// Sparse settings update.
    SettingsUpdate { settings: SettingsMap },
}

/// Messages sent from the addon to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddonMessage {
    /// First real content is painted in its final font.
    AddonReady {
        #[serde(rename = "layerId")]
        layer_id: String,
    },
}

impl HostMessage {
    /// Parse one host message.
    ///
    /// Returns `Ok(None)` for well-formed JSON carrying a message type this
    /// addon doesn't handle; the host broadcasts to every addon.
    pub fn parse(line: &str) -> crate::Result<Option<Self>> {
        let value: serde_json::Value = serde_json::from_str(line)?;

        let known = value
            .get("type")
            .and_then(|t| t.as_str())
            .is_some_and(|t| t == "SETTINGS_UPDATE");
        if !known {
            return Ok(None);
        }

        Ok(Some(serde_json::from_value(value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_settings_update() {
        let msg = HostMessage::parse(r#"{"type":"SETTINGS_UPDATE","settings":{"showTime":true}}"#)
            .unwrap()
            .unwrap();
        let HostMessage::SettingsUpdate { settings } = msg;
        assert_eq!(settings.get("showTime"), Some(&json!(true)));
    }

    #[test]
    fn test_parse_ignores_other_types() {
        let msg = HostMessage::parse(r#"{"type":"THEME_CHANGED","dark":true}"#).unwrap();
        assert!(msg.is_none());

        let msg = HostMessage::parse(r#"{"hello":"world"}"#).unwrap();
        assert!(msg.is_none());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(HostMessage::parse("{not json").is_err());
        // Known type but missing payload
        assert!(HostMessage::parse(r#"{"type":"SETTINGS_UPDATE"}"#).is_err());
    }

    #[test]
    fn test_ready_wire_shape() {
        let msg = AddonMessage::AddonReady {
            layer_id: "L1".to_string(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({ "type": "ADDON_READY", "layerId": "L1" }));
    }
}
