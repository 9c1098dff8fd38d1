//! Helper functions for page rendering
//!
//! Small formatting utilities shared by the page renderer, the templates
//! and the server.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
