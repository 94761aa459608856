use super::motion::Direction;
use crate::config::AggregatorConfig;
use std::time::Duration;

/// A debounced gesture, ready for a consumer to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureEvent {
    pub fingers: u32,
    pub direction: Direction,
    /// Time since the pipeline started.
    pub timestamp: Duration,
}

/// Rate limiter between noisy per-frame readings and gesture consumers.
///
/// At most one event is emitted per debounce interval. The emitted value is
/// whatever the frame that opened the window reported; readings inside the
/// window are not averaged or voted on.
pub struct GestureAggregator {
    debounce: Duration,
    last_emitted: Option<Duration>,
}

impl GestureAggregator {
    pub fn new(config: &AggregatorConfig) -> Self {
        Self::with_debounce(config.debounce())
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce,
            last_emitted: None,
        }
    }

    pub fn observe(&mut self, fingers: u32, direction: Direction, now: Duration) -> Option<GestureEvent> {
        if let Some(last) = self.last_emitted {
            if now.saturating_sub(last) < self.debounce {
                return None;
            }
        }

        self.last_emitted = Some(now);
        Some(GestureEvent {
            fingers,
            direction,
            timestamp: now,
        })
    }

    pub fn reset(&mut self) {
        self.last_emitted = None;
    }
}
