//! Remote reads behind the vitals surfaces.
//!
//! [`RestClient`] turns table queries into requests run through
//! [`ResilientRequest`](resilient_request::ResilientRequest). The loaders
//! deduplicate concurrent reads with a
//! [`SingleFlightLoader`](single_flight_loader::SingleFlightLoader), and the
//! steps in [`steps`] plug them into the refresh coordinator.

mod bootstrap;
mod client;
mod day_data;
mod error;
mod response;
mod snapshots;
pub mod steps;

#[cfg(test)]
mod testing;

pub use bootstrap::{ClientBootstrapLoader, ClientProfile, CLIENT_PROFILE_TABLE};
pub use client::{RestClient, RowSource};
pub use day_data::{DayDataLoader, DayKey, DayRows, DAY_COLUMN};
pub use error::{LoaderError, LoaderResult};
pub use response::BufferedResponse;
pub use snapshots::{SurfaceSnapshot, SurfaceSnapshots};
pub use steps::{register_surface_steps, ChartStep, DoctorAccessStep, LifestyleStep};
