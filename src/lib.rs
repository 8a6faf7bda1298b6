//! Image edge service library.
//!
//! Upload, list and serve images stored behind a WebDAV endpoint, with a
//! per-client rate limiter, a bounded in-process cache and a shared edge
//! cache for image bytes.

pub mod assets;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod routing;
pub mod security;
pub mod storage;

pub use config::EdgeConfig;
pub use error::{AppError, ErrorContext};
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
