//! Press/release chain every tracked button walks through.
//!
//! ```text
//! Rest ─press─► AwaitingFirstRelease ─release─► FirstReleased
//!      ─press─► AwaitingSecondRelease ─release─► DoubleDone
//! ```
//!
//! The chain only moves forward. `DoubleDone` is terminal.

use std::fmt;

use super::model::ButtonAction;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GestureError {
    #[error("Invalid transition from {from}: {reason}")]
    InvalidTransition { from: GestureState, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum GestureState {
    #[default]
    Rest,
    AwaitingFirstRelease,
    FirstReleased,
    AwaitingSecondRelease,
    DoubleDone,
}

impl GestureState {
    pub fn next_state(self) -> Result<GestureState, GestureError> {
        match self {
            GestureState::Rest => Ok(GestureState::AwaitingFirstRelease),
            GestureState::AwaitingFirstRelease => Ok(GestureState::FirstReleased),
            GestureState::FirstReleased => Ok(GestureState::AwaitingSecondRelease),
            GestureState::AwaitingSecondRelease => Ok(GestureState::DoubleDone),
            GestureState::DoubleDone => Err(GestureError::InvalidTransition {
                from: self,
                reason: "there is no state after finishing a double press".to_string(),
            }),
        }
    }

    pub fn is_awaiting_press(self) -> bool {
        matches!(self, GestureState::Rest | GestureState::FirstReleased)
    }

    pub fn is_awaiting_release(self) -> bool {
        matches!(
            self,
            GestureState::AwaitingFirstRelease | GestureState::AwaitingSecondRelease
        )
    }

    pub fn is_valid_action(self, action: ButtonAction) -> bool {
        match action {
            ButtonAction::Press => self.is_awaiting_press(),
            ButtonAction::Release => self.is_awaiting_release(),
        }
    }

    /// Next state for `action`, or `InvalidTransition` if the action does not
    /// fit the press/release alternation.
    pub fn advance(self, action: ButtonAction) -> Result<GestureState, GestureError> {
        if !self.is_valid_action(action) {
            return Err(GestureError::InvalidTransition {
                from: self,
                reason: format!("received a button action of {}", action),
            });
        }
        self.next_state()
    }
}

impl fmt::Display for GestureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GestureState::Rest => "rest",
            GestureState::AwaitingFirstRelease => "awaiting first release",
            GestureState::FirstReleased => "first released",
            GestureState::AwaitingSecondRelease => "awaiting second release",
            GestureState::DoubleDone => "double press done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternating_actions_walk_the_whole_chain() {
        let mut state = GestureState::Rest;
        let actions = [
            ButtonAction::Press,
            ButtonAction::Release,
            ButtonAction::Press,
            ButtonAction::Release,
        ];
        let mut seen = vec![state];
        for action in actions {
            state = state.advance(action).unwrap();
            seen.push(state);
        }

        assert_eq!(
            seen,
            vec![
                GestureState::Rest,
                GestureState::AwaitingFirstRelease,
                GestureState::FirstReleased,
                GestureState::AwaitingSecondRelease,
                GestureState::DoubleDone,
            ]
        );
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn double_done_is_terminal() {
        assert!(GestureState::DoubleDone.next_state().is_err());
        assert!(GestureState::DoubleDone.advance(ButtonAction::Press).is_err());
        assert!(GestureState::DoubleDone
            .advance(ButtonAction::Release)
            .is_err());
    }

    #[test]
    fn out_of_order_actions_are_rejected() {
        let invalid = [
            (GestureState::Rest, ButtonAction::Release),
            (GestureState::AwaitingFirstRelease, ButtonAction::Press),
            (GestureState::FirstReleased, ButtonAction::Release),
            (GestureState::AwaitingSecondRelease, ButtonAction::Press),
        ];
        for (state, action) in invalid {
            assert!(!state.is_valid_action(action));
            assert!(matches!(
                state.advance(action),
                Err(GestureError::InvalidTransition { from, .. }) if from == state
            ));
        }
    }
}
