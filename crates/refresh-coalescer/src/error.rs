use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The drain task ended without answering, e.g. the runtime shut down.
    #[error("Refresh coordinator stopped before the drain finished")]
    CoordinatorGone,
}
