//! Response middleware applied to every route.

pub mod cors;
pub mod rejections;

pub use cors::cors_middleware;
pub use rejections::format_layer_rejections;
