//! Pump state machine.

/// Lifecycle state of a background pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PumpState {
    /// No thread is running; the pump can be started.
    #[default]
    Idle,
    /// A thread is moving bytes.
    Running,
    /// A stop was requested and the thread has not confirmed yet.
    Stopping,
    /// The pump ended for good (EOF, failure or close).
    Finished,
}

impl PumpState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Idle -> Running
    /// - Running -> Stopping
    /// - Stopping -> Idle
    /// - Running | Stopping | Idle -> Finished
    pub fn can_transition_to(&self, target: PumpState) -> bool {
        use PumpState::*;
        matches!(
            (*self, target),
            (Idle, Running)
                | (Running, Stopping)
                | (Stopping, Idle)
                | (Running, Finished)
                | (Stopping, Finished)
                | (Idle, Finished)
        )
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: PumpState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::TtyError::InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PumpState::Finished)
    }

    /// Whether the pump is not currently moving bytes but could be resumed.
    pub fn is_paused(&self) -> bool {
        matches!(self, PumpState::Idle | PumpState::Stopping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let mut state = PumpState::Idle;
        assert!(state.transition_to(PumpState::Running).is_ok());
        assert!(state.transition_to(PumpState::Stopping).is_ok());
        assert!(state.transition_to(PumpState::Idle).is_ok());
        assert!(state.transition_to(PumpState::Running).is_ok());
        assert!(state.transition_to(PumpState::Finished).is_ok());
        assert_eq!(state, PumpState::Finished);
    }

    #[test]
    fn test_invalid_idle_to_stopping() {
        let mut state = PumpState::Idle;
        assert!(state.transition_to(PumpState::Stopping).is_err());
        assert_eq!(state, PumpState::Idle);
    }

    #[test]
    fn test_running_cannot_restart() {
        let mut state = PumpState::Running;
        assert!(state.transition_to(PumpState::Running).is_err());
        assert!(state.transition_to(PumpState::Idle).is_err());
    }

    #[test]
    fn test_invalid_from_finished() {
        let mut state = PumpState::Finished;
        for target in [PumpState::Idle, PumpState::Running, PumpState::Stopping] {
            assert!(state.transition_to(target).is_err());
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_is_paused() {
        assert!(PumpState::Idle.is_paused());
        assert!(PumpState::Stopping.is_paused());
        assert!(!PumpState::Running.is_paused());
        assert!(!PumpState::Finished.is_paused());
    }
}
