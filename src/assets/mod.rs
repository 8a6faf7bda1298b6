//! Static content served verbatim by the edge.
//!
//! # Data Flow
//! ```text
//! request path
//!     → routing (alias → canonical filename)
//!     → table.rs (canonical filename → bytes + content type)
//!     → template.rs (carousel page only: subdirectory substitution)
//! ```
//!
//! Content type resolution lives in `mime.rs` and is shared with the
//! image handlers and the upload validator.

pub mod mime;
pub mod table;
pub mod template;

pub use mime::{content_type, extension_of, is_image_file, IMAGE_EXTENSIONS};
pub use table::{StaticAsset, StaticAssetTable};
pub use template::render_carousel;
