//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (sweep bounded cache, check per-client window)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Runs before any path classification, OPTIONS included
//! - Client identity comes from a trusted forwarded-IP header only

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, Decision, RateLimiter, UNKNOWN_CLIENT};
