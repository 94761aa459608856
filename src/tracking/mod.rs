mod gesture;
mod motion;

pub use gesture::{GestureAggregator, GestureEvent};
pub use motion::{Direction, MotionState, MotionTracker};
