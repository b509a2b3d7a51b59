//! One-time readiness notification to the host.

use tracing::{debug, info};

use crate::protocol::AddonMessage;

/// Sink for outbound host messages.
pub trait ReadyNotifier {
    fn notify(&mut self, message: &AddonMessage);
}

/// Fires `ADDON_READY` exactly once, after the first non-empty render with no
/// font load in flight.
///
/// Without a layer id there is nobody to correlate with, so it never fires.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    layer_id: Option<String>,
    fired: bool,
}

impl ReadySignal {
    pub fn new(layer_id: Option<String>) -> Self {
        let layer_id = layer_id.filter(|id| !id.is_empty());
        if layer_id.is_none() {
            debug!("No layer id supplied, ready signal disabled");
        }
        Self {
            layer_id,
            fired: false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn layer_id(&self) -> Option<&str> {
        self.layer_id.as_deref()
    }

    /// Fire if every precondition holds. Returns true only on the call that
    /// actually fired.
    pub fn try_fire(
        &mut self,
        content_rendered: bool,
        font_settled: bool,
        notifier: &mut dyn ReadyNotifier,
    ) -> bool {
        if self.fired || !content_rendered || !font_settled {
            return false;
        }
        let Some(layer_id) = self.layer_id.clone() else {
            return false;
        };

        self.fired = true;
        info!("Addon ready (layer {})", layer_id);
        notifier.notify(&AddonMessage::AddonReady { layer_id });
        true
    }
}
