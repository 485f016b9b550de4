//! Authentication state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                 ┌─────────────────┐
//!                 │     Unknown     │ (initial)
//!                 └────────┬────────┘
//!    SessionConfirmed      │      SessionMissing
//!          ┌───────────────┴───────────────┐
//!          ▼                               ▼
//! ┌─────────────────┐  SessionMissing  ┌─────────────────┐
//! │  Authenticated  │ ───────────────► │ Unauthenticated │
//! │                 │ ◄─────────────── │                 │
//! └─────────────────┘ SessionConfirmed └─────────────────┘
//!
//! GraceStarted moves any state back to Unknown.
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::fmt;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub gate_machine(Unknown)

    Unknown => {
        GraceStarted => Unknown,
        SessionConfirmed => Authenticated,
        SessionMissing => Unauthenticated
    },
    Authenticated => {
        // Only a new grace cycle may forget a decision.
        GraceStarted => Unknown,
        SessionConfirmed => Authenticated,
        SessionMissing => Unauthenticated
    },
    Unauthenticated => {
        GraceStarted => Unknown,
        SessionConfirmed => Authenticated,
        SessionMissing => Unauthenticated
    }
}

pub use gate_machine::Input as GateMachineInput;
pub use gate_machine::State as GateMachineState;
pub use gate_machine::StateMachine as GateMachine;

/// Authentication state as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No decision yet (startup or grace period).
    Unknown,
    Authenticated,
    Unauthenticated,
}

impl AuthState {
    /// Returns true once a decision has been made.
    pub fn is_known(&self) -> bool {
        !matches!(self, AuthState::Unknown)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::Unknown => write!(f, "unknown"),
            AuthState::Authenticated => write!(f, "authenticated"),
            AuthState::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

impl From<&GateMachineState> for AuthState {
    fn from(state: &GateMachineState) -> Self {
        match state {
            GateMachineState::Unknown => AuthState::Unknown,
            GateMachineState::Authenticated => AuthState::Authenticated,
            GateMachineState::Unauthenticated => AuthState::Unauthenticated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_unknown() {
        let machine = GateMachine::new();
        assert_eq!(*machine.state(), GateMachineState::Unknown);
    }

    #[test]
    fn test_unknown_resolves_to_either_terminal() {
        let mut machine = GateMachine::new();
        machine.consume(&GateMachineInput::SessionConfirmed).unwrap();
        assert_eq!(*machine.state(), GateMachineState::Authenticated);

        let mut machine = GateMachine::new();
        machine.consume(&GateMachineInput::SessionMissing).unwrap();
        assert_eq!(*machine.state(), GateMachineState::Unauthenticated);
    }

    #[test]
    fn test_terminal_states_flip() {
        let mut machine = GateMachine::new();
        machine.consume(&GateMachineInput::SessionConfirmed).unwrap();
        machine.consume(&GateMachineInput::SessionMissing).unwrap();
        assert_eq!(*machine.state(), GateMachineState::Unauthenticated);
        machine.consume(&GateMachineInput::SessionConfirmed).unwrap();
        assert_eq!(*machine.state(), GateMachineState::Authenticated);
    }

    #[test]
    fn test_grace_returns_to_unknown() {
        let mut machine = GateMachine::new();
        machine.consume(&GateMachineInput::SessionMissing).unwrap();
        machine.consume(&GateMachineInput::GraceStarted).unwrap();
        assert_eq!(*machine.state(), GateMachineState::Unknown);
    }

    #[test]
    fn test_auth_state_conversion() {
        assert_eq!(
            AuthState::from(&GateMachineState::Unknown),
            AuthState::Unknown
        );
        assert_eq!(
            AuthState::from(&GateMachineState::Authenticated),
            AuthState::Authenticated
        );
        assert_eq!(
            AuthState::from(&GateMachineState::Unauthenticated),
            AuthState::Unauthenticated
        );
    }

    #[test]
    fn test_auth_state_predicates() {
        assert!(!AuthState::Unknown.is_known());
        assert!(AuthState::Authenticated.is_known());
        assert!(AuthState::Unauthenticated.is_known());
        assert!(AuthState::Authenticated.is_authenticated());
        assert!(!AuthState::Unauthenticated.is_authenticated());
    }

    #[test]
    fn test_auth_state_serializes_snake_case() {
        let json = serde_json::to_string(&AuthState::Unauthenticated).unwrap();
        assert_eq!(json, "\"unauthenticated\"");
    }
}
