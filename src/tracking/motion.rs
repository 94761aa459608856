use crate::config::MotionConfig;
use imageproc::point::Point;
use std::fmt;

/// Coarse movement direction of the hand, from the user's point of view
/// when the camera is mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::None => "none",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(label)
    }
}

/// Cross-frame motion state: the last seen centroid and the current label.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionState {
    pub previous: Option<Point<f64>>,
    pub direction: Direction,
}

/// Turns successive hand centroids into a direction label.
pub struct MotionTracker {
    min_movement: f64,
    mirrored: bool,
    reset_after_lost_frames: Option<u32>,
    state: MotionState,
    frames_lost: u32,
}

impl MotionTracker {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            min_movement: config.min_movement,
            mirrored: config.mirrored,
            reset_after_lost_frames: config.reset_after_lost_frames,
            state: MotionState::default(),
            frames_lost: 0,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Feed the centroid of the current frame's hand.
    ///
    /// Movements that do not exceed `min_movement` keep the previous label,
    /// so a hand held still does not flap between directions. The stored
    /// centroid is replaced either way.
    pub fn update(&mut self, centroid: Point<f64>) -> Direction {
        self.frames_lost = 0;

        let Some(previous) = self.state.previous.replace(centroid) else {
            return self.state.direction;
        };

        let dx = centroid.x - previous.x;
        let dy = centroid.y - previous.y;
        if dx.hypot(dy) > self.min_movement {
            self.state.direction = self.classify(dx, dy);
        }
        self.state.direction
    }

    /// Record a frame without a hand. After enough consecutive misses the
    /// tracker forgets the old position, so a hand re-entering elsewhere does
    /// not register as a jump.
    pub fn mark_lost(&mut self) {
        self.frames_lost = self.frames_lost.saturating_add(1);
        if let Some(limit) = self.reset_after_lost_frames {
            if self.frames_lost >= limit && self.state != MotionState::default() {
                tracing::debug!("Hand lost for {} frames, resetting motion", self.frames_lost);
                self.state = MotionState::default();
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = MotionState::default();
        self.frames_lost = 0;
    }

    /// Dominant axis wins; a tie goes to the vertical axis. Image y grows
    /// downwards.
    fn classify(&self, dx: f64, dy: f64) -> Direction {
        if dx.abs() > dy.abs() {
            let towards_image_right = dx > 0.0;
            if towards_image_right != self.mirrored {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if dy > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }
}
