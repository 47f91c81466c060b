/// Camera angle state and change notification.
use log::debug;

use crate::projection::AngleConfig;

/// Handle returned by [`AngleBroadcast::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&AngleConfig)>;

/// Owner of the current camera angles.
///
/// Every change produces a fresh [`AngleConfig`] that is handed to each
/// subscriber. Consumers are expected to read [`AngleBroadcast::current`]
/// at every recomputation rather than hold on to an earlier copy.
pub struct AngleBroadcast {
    current: AngleConfig,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl AngleBroadcast {
    pub fn new(angles: AngleConfig) -> Self {
        Self {
            current: angles,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn current(&self) -> AngleConfig {
        self.current
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&AngleConfig) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Replace the angles and notify subscribers.
    pub fn set(&mut self, angles: AngleConfig) {
        if angles == self.current {
            return;
        }
        debug!(
            "camera angles changed: rotateX={} rotateZ={} perspective={}",
            angles.rotate_x, angles.rotate_z, angles.perspective
        );
        self.current = angles;
        let snapshot = self.current;
        for (_, listener) in &mut self.listeners {
            listener(&snapshot);
        }
    }

    /// Rotate by delta amounts (in degrees).
    pub fn rotate(&mut self, d_rotate_x: f64, d_rotate_z: f64) {
        let mut next = self.current;
        next.rotate_x += d_rotate_x;
        next.rotate_z += d_rotate_z;
        self.set(next);
    }
}

impl Default for AngleBroadcast {
    fn default() -> Self {
        Self::new(AngleConfig::default())
    }
}
