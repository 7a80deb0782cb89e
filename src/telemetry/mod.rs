//! Voice telemetry collector.
//!
//! The collector keeps a bounded history of [`VoiceEvent`]s for CLI
//! reporting and fans every event out over a broadcast channel.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub mod events;

pub use events::{MutePath, VoiceEvent};

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<VoiceEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of events.
pub struct EventCollector {
    tx: broadcast::Sender<VoiceEvent>,
    history: VecDeque<VoiceEvent>,
    history_capacity: usize,
    total_events: u64,
    dropped_history: u64,
}

impl EventCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: VecDeque::with_capacity(history_capacity),
            history_capacity,
            total_events: 0,
            dropped_history: 0,
        }
    }

    pub fn publish(&mut self, event: VoiceEvent) {
        self.total_events += 1;
        if self.history_capacity > 0 {
            if self.history.len() == self.history_capacity {
                self.history.pop_front();
                self.dropped_history += 1;
            }
            self.history.push_back(event.clone());
        }

        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            recent: self.history.iter().cloned().collect(),
            total_events: self.total_events,
            dropped_events: self.dropped_history,
        }
    }

    pub fn count(&self, pred: impl Fn(&VoiceEvent) -> bool) -> usize {
        self.history.iter().filter(|e| pred(e)).count()
    }
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SndDevice;

    fn sidetone(enabled: bool) -> VoiceEvent {
        VoiceEvent::SidetoneChanged {
            device: SndDevice::OutVoiceHandset,
            enabled,
        }
    }

    #[test]
    fn collector_preserves_order_within_history() {
        let mut collector = EventCollector::new(8, 3);
        collector.publish(sidetone(true));
        collector.publish(VoiceEvent::DeviceMuteFlagChanged { active: true });
        collector.publish(sidetone(false));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 3);
        assert_eq!(snapshot.recent[0], sidetone(true));
        assert_eq!(snapshot.recent[2], sidetone(false));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let mut collector = EventCollector::new(8, 2);
        collector.publish(sidetone(true));
        collector.publish(sidetone(false));
        collector.publish(VoiceEvent::DeviceMuteFlagChanged { active: false });

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.total_events, 3);
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(snapshot.recent[0], sidetone(false));
    }

    #[test]
    fn subscribers_receive_events() {
        let mut collector = EventCollector::default();
        let mut rx = collector.subscribe();
        collector.publish(VoiceEvent::DeviceMuteFlagChanged { active: true });

        assert_eq!(
            rx.try_recv().unwrap(),
            VoiceEvent::DeviceMuteFlagChanged { active: true }
        );
    }

    #[test]
    fn events_serialize_tagged() {
        let json = serde_json::to_string(&sidetone(true)).unwrap();
        assert!(json.contains("\"type\":\"sidetone_changed\""));
        assert!(json.contains("\"payload\""));
    }
}
