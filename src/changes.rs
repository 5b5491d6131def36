//! Change notification.
//!
//! Mutations push a [`ChangeEvent`]; the view drains the queue once at the
//! start of the next query and invalidates whatever the events touch.

use std::collections::VecDeque;

/// Something that may make cached layout stale.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Regions of a track were added, removed or moved
    RegionsChanged { track: String },
    /// The sequence set changed
    SequencesChanged,
    /// A track was added or replaced
    TrackChanged { track: String },
    SettingsChanged,
    FilterChanged,
    Resized { width: f64 },
}

/// FIFO of pending change events.
#[derive(Debug, Clone, Default)]
pub struct ChangeQueue {
    events: VecDeque<ChangeEvent>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event. A resize replaces any pending resize so only the
    /// latest width is applied; other events are dropped if an identical one
    /// is already pending.
    pub fn push(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Resized { .. } => {
                self.events.retain(|e| !matches!(e, ChangeEvent::Resized { .. }));
                self.events.push_back(event);
            }
            _ if self.events.contains(&event) => {}
            _ => self.events.push_back(event),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Takes every pending event, oldest first.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        self.events.drain(..).collect()
    }
}
