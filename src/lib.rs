//! PropertyLoop
//!
//! A real-estate landing page with an embedded property assistant chat
//! widget, the assistant service the widget talks to, and a terminal client.
//!
//! # Architecture
//!
//! - **Widget**: conversation state and the send lifecycle, independent of
//!   how it is rendered
//! - **Site**: Axum server rendering the landing page and widget as HTML,
//!   enhanced with HTMX
//! - **Assistant**: `/chat` endpoint with sessions, image analysis and
//!   knowledge retrieval in front of an OpenAI-compatible model
//!
//! # Modules
//!
//! - [`widget`]: chat widget state, attachments and transport
//! - [`markdown`]: restricted markdown rendering for chat bubbles
//! - [`ui`]: HTML rendering
//! - [`site`]: landing site server
//! - [`assistant`]: assistant service
//! - [`repl`]: terminal client
//! - [`config`]: command line and layered settings
//! - [`telemetry`]: logging setup

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod assistant;
pub mod config;
pub mod markdown;
pub mod repl;
pub mod site;
pub mod telemetry;
pub mod ui;
pub mod widget;
