//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (ordered classification)
//!     → matcher.rs (section prefixes, static aliases)
//!     → Return: Route (always exactly one, NotFound included)
//!
//! Route Compilation (at startup):
//!     SiteConfig
//!     → Build alias table (upload page path, .html variant, fixed assets)
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (exact and prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins, in a fixed order

pub mod matcher;
pub mod router;

pub use router::{Route, Router};
