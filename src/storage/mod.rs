//! Remote file-storage subsystem.
//!
//! # Data Flow
//! ```text
//! handlers
//!     → client.rs (StorageClient trait: put / get / list)
//!     → webdav.rs (authenticated PUT, GET, PROPFIND over reqwest)
//!     → storage backend
//! ```
//!
//! # Design Decisions
//! - Handlers only see the trait; tests inject an in-memory double
//! - The client is stateless aside from immutable config, safe to share via Arc
//! - No retries: callers surface the structured error

pub mod client;
pub mod path;
pub mod webdav;

pub use client::{StorageClient, StorageEntry, StorageError, StorageResult};
pub use path::{encode_path, normalize_relative_path, PathError};
pub use webdav::WebDavClient;
