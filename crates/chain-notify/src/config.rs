//! Configuration of a [`Fanout`](crate::Fanout).

use serde::{Deserialize, Serialize};

/// Capacity of each subscriber channel unless configured otherwise.
///
/// One slot is a handoff: the next `notify` waits until the subscriber took the previous event.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

/// Tuning knobs of a [`Fanout`](crate::Fanout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanoutConfig {
    channel_capacity: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl FanoutConfig {
    /// Sets the number of events buffered per subscriber before `notify` waits.
    ///
    /// A capacity of zero is raised to one.
    pub fn with_channel_capacity(self, capacity: usize) -> Self {
        Self {
            channel_capacity: capacity.max(1),
        }
    }

    /// Returns the number of events buffered per subscriber.
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }
}
