use crate::tracking::{Direction, GestureEvent};

/// Action requested by a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Pause or resume publishing frames.
    ToggleCapture,
    Quit,
    Steer(Direction),
}

/// Maps debounced gestures to commands for the application shell.
///
/// One raised finger toggles capture, an open hand quits, and any other
/// reading with a movement direction steers.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    toggle_fingers: u32,
    quit_fingers: u32,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self {
            toggle_fingers: 1,
            quit_fingers: 5,
        }
    }
}

impl CommandDispatcher {
    /// Finger count that maps to [`Command::Quit`].
    pub fn quit_fingers(&self) -> u32 {
        self.quit_fingers
    }

    pub fn dispatch(&self, event: &GestureEvent) -> Option<Command> {
        let command = if event.fingers == self.toggle_fingers {
            Some(Command::ToggleCapture)
        } else if event.fingers == self.quit_fingers {
            Some(Command::Quit)
        } else if event.direction != Direction::None {
            Some(Command::Steer(event.direction))
        } else {
            None
        };

        match command {
            Some(command) => tracing::info!("Gesture {} fingers -> {:?}", event.fingers, command),
            None => tracing::debug!("Gesture {} fingers ignored", event.fingers),
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn event(fingers: u32, direction: Direction) -> GestureEvent {
        GestureEvent {
            fingers,
            direction,
            timestamp: Duration::ZERO,
        }
    }

    #[test]
    fn finger_counts_map_to_commands() {
        let dispatcher = CommandDispatcher::default();
        assert_eq!(dispatcher.dispatch(&event(1, Direction::Up)), Some(Command::ToggleCapture));
        assert_eq!(dispatcher.dispatch(&event(5, Direction::None)), Some(Command::Quit));
        assert_eq!(dispatcher.quit_fingers(), 5);
    }

    #[test]
    fn other_counts_steer_when_moving() {
        let dispatcher = CommandDispatcher::default();
        assert_eq!(
            dispatcher.dispatch(&event(0, Direction::Left)),
            Some(Command::Steer(Direction::Left))
        );
        assert_eq!(
            dispatcher.dispatch(&event(3, Direction::Down)),
            Some(Command::Steer(Direction::Down))
        );
    }

    #[test]
    fn still_hand_without_mapped_count_is_ignored() {
        let dispatcher = CommandDispatcher::default();
        assert_eq!(dispatcher.dispatch(&event(0, Direction::None)), None);
        assert_eq!(dispatcher.dispatch(&event(2, Direction::None)), None);
    }
}
