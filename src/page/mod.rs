//! The Insights article page
//!
//! Three steps, mirroring how the page is built and served:
//! [`paths`] lists the slugs to pre-render, [`loader`] turns a slug into
//! page input (or "not found"), and [`render`] turns that input into HTML.

pub mod loader;
pub mod paths;
pub mod render;

pub use loader::{load_page, NotFoundReason, PageProps, PageResult};
pub use paths::{static_paths, Fallback, PathParams, StaticPaths};
pub use render::PageRenderer;
