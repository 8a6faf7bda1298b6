//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → security::rate_limit (per-client fixed window)
//!     → routing (classify method + path)
//!     → handlers (upload, listing, image, pages)
//!     → error formatter / CORS headers
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use server::{app, AppState, HttpServer};
