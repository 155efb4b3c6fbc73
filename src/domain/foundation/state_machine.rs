//! State machine trait for lifecycle status enums.
//!
//! Membership status and trade-in batch status both follow strict transition
//! rules; this trait gives them a shared, validated transition API.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define the transition table; validated transitions come
/// for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for BatchStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Pending, Priced) | (Priced, Credited))
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Pending => vec![Priced],
///             Priced => vec![Credited],
///             Credited => vec![],
///         }
///     }
/// }
///
/// let status = status.transition_to(BatchStatus::Priced)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestStatus {
        Received,
        Priced,
        Credited,
    }

    impl StateMachine for TestStatus {
        fn can_transition_to(&self, target: &Self) -> bool {
            use TestStatus::*;
            matches!((self, target), (Received, Priced) | (Priced, Credited))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use TestStatus::*;
            match self {
                Received => vec![Priced],
                Priced => vec![Credited],
                Credited => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        let result = TestStatus::Received.transition_to(TestStatus::Priced);
        assert_eq!(result, Ok(TestStatus::Priced));
    }

    #[test]
    fn transition_to_fails_for_skipped_state() {
        let result = TestStatus::Received.transition_to(TestStatus::Credited);
        assert!(result.is_err());
    }

    #[test]
    fn terminal_state_has_no_transitions() {
        assert!(TestStatus::Credited.is_terminal());
        assert!(!TestStatus::Received.is_terminal());
    }

    #[test]
    fn can_transition_to_agrees_with_valid_transitions() {
        for status in [TestStatus::Received, TestStatus::Priced, TestStatus::Credited] {
            for target in status.valid_transitions() {
                assert!(status.can_transition_to(&target));
            }
        }
    }
}
