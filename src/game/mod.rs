pub mod driver;
pub mod player;

use strum_macros::Display;

/// How a match ended, if it did. Positive codes are cop wins, negative codes
/// robber wins, mirroring each other by failure class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Outcome {
    GameContinues,
    RobberCaught,
    RobberInvalidStep,
    RobberTimeout,
    RobberException,
    CopsOutOfSteps,
    CopsInvalidStep,
    CopsTimeout,
    CopsException,
}

impl Outcome {
    pub fn code(self) -> i32 {
        match self {
            Outcome::GameContinues => 0,
            Outcome::RobberCaught => 1,
            Outcome::RobberInvalidStep => 2,
            Outcome::RobberTimeout => 3,
            Outcome::RobberException => 4,
            Outcome::CopsOutOfSteps => -1,
            Outcome::CopsInvalidStep => -2,
            Outcome::CopsTimeout => -3,
            Outcome::CopsException => -4,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != Outcome::GameContinues
    }

    /// Some(true) once the cops have won, Some(false) once the robber has.
    pub fn cops_won(self) -> Option<bool> {
        match self.code() {
            0 => None,
            code => Some(code > 0),
        }
    }
}

#[cfg(test)]
mod outcome_tests {
    use super::*;

    #[test]
    fn codes_mirror_by_failure_class() {
        assert_eq!(Outcome::GameContinues.code(), 0);
        assert_eq!(Outcome::RobberCaught.code(), 1);
        assert_eq!(Outcome::RobberTimeout.code(), -Outcome::CopsTimeout.code());
        assert_eq!(Outcome::RobberInvalidStep.code(), -Outcome::CopsInvalidStep.code());
        assert_eq!(Outcome::RobberException.code(), -Outcome::CopsException.code());
        assert_eq!(Outcome::CopsOutOfSteps.code(), -1);
        assert_eq!(Outcome::RobberCaught.cops_won(), Some(true));
        assert_eq!(Outcome::CopsTimeout.cops_won(), Some(false));
        assert_eq!(Outcome::GameContinues.cops_won(), None);
    }
}
