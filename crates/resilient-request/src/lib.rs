//! Retrying, backing-off request execution.
//!
//! [`ResilientRequest::execute`] wraps a caller-supplied request builder:
//! - headers come from the [`TokenHeaderCache`](token_header_cache::TokenHeaderCache)
//! - each attempt is bounded by a timeout
//! - timeouts, transport errors and 5xx responses are retried with a linear
//!   backoff
//! - one 401/403 per call forces a header refresh and restarts the attempts
//!
//! Terminal failures raise the login overlay before they are returned.

mod error;
mod request;
mod response;
mod success_log;

pub use error::{RequestError, RequestResult};
pub use request::{RequestConfig, RequestOptions, ResilientRequest};
pub use response::ResponseLike;
pub use success_log::SuccessLog;
