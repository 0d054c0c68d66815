//! Server-rendered HTML.
//!
//! Pages are plain strings built with `format!`; HTMX swaps fragments in
//! place when scripts are available.
//!
//! # Structure
//!
//! - [`shell`]: document wrapper
//! - [`landing`]: marketing page
//! - [`chat`]: chat widget fragment
//! - [`icons`]: inline SVG icons

pub mod chat;
pub mod icons;
pub mod landing;
pub mod shell;
