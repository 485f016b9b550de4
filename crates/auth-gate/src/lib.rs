//! Tri-state authentication gate for the sync layer.
//!
//! This crate provides:
//! - An explicit FSM for `Unknown` / `Authenticated` / `Unauthenticated`
//! - [`AuthGate`], which holds `Unknown` for a short grace period before
//!   probing the session, so the UI does not flicker between states
//! - Decision waiters with abort support
//! - The [`SessionProbe`] seam plus an HTTP implementation
//! - Credential claim inspection for refusing privileged keys

mod auth_fsm;
pub mod claims;
mod error;
mod gate;
mod probe;
mod supabase_probe;

pub use auth_fsm::gate_machine;
pub use auth_fsm::{AuthState, GateMachine, GateMachineInput, GateMachineState};
pub use error::{AuthError, AuthResult};
pub use gate::{AuthGate, GateConfig};
pub use probe::{AuthEvent, Session, SessionProbe, StaticProbe};
pub use supabase_probe::SupabaseSessionProbe;
