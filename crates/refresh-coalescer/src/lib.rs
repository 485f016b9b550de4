//! Coalesces refresh requests from independent UI surfaces.
//!
//! Any number of callers may ask for any subset of surfaces at any time.
//! Their requests are OR-merged into one need set, and a single drain loop
//! keeps running passes until a pass finds nothing left to do. Every caller
//! is released only when the drain ends, so each one has seen its surfaces
//! refreshed after it asked.
//!
//! Steps are isolated: a failing, panicking or slow step is recorded in the
//! [`DrainReport`] and never stops its siblings or the loop.

mod coordinator;
mod error;
mod report;
mod step;
mod surface;

pub use coordinator::{CoalescerConfig, RefreshCoordinator, RefreshTicket};
pub use error::RefreshError;
pub use report::{DrainReport, StepOutcome, StepReport};
pub use step::{step_fn, FnStep, RefreshStep};
pub use surface::{RefreshFlags, Surface};
