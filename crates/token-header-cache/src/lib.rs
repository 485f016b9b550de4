//! Authorization headers for REST calls.
//!
//! [`TokenHeaderCache`] builds `apikey` + `Authorization: Bearer` headers
//! from the stored API credential and the current session, caches them for
//! a bounded age and deduplicates concurrent resolutions.

mod cache;
mod error;
mod headers;

pub use cache::{HeaderCacheConfig, TokenHeaderCache};
pub use error::HeaderError;
pub use headers::AuthHeaders;
