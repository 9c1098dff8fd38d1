//! Content module - post model and rich-text rendering

pub mod portable_text;
mod post;

pub use portable_text::{Block, Components, MarkDef, PortableTextRenderer, Span};
pub use post::{Asset, Author, Category, Image, Post};
