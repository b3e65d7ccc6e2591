use tokio::sync::mpsc::UnboundedSender;
use super::events::LookupEvent;

/// Consumer of session events (the overlay renderer)
pub trait DisplaySink: Send + Sync {
    fn emit(&self, event: &LookupEvent);
}

/// Emit an event to the sink, if one is attached
pub fn emit_event(sink: Option<&dyn DisplaySink>, event: LookupEvent) {
    if let Some(sink) = sink {
        log::debug!("[Emit] {}", event.name());
        sink.emit(&event);
    }
}

/// Forwards events over an unbounded channel
#[derive(Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<LookupEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<LookupEvent>) -> Self {
        Self { tx }
    }
}

impl DisplaySink for ChannelSink {
    fn emit(&self, event: &LookupEvent) {
        if let Err(e) = self.tx.send(event.clone()) {
            log::warn!("[Emit] Failed to emit {}: receiver dropped ({})", event.name(), e);
        }
    }
}
