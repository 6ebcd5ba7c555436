//! Client core for a project tracker's XML API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values for the
//! tracker's project, story and note resources. Response bodies are parsed
//! into a markup tree, validated against the element the operation expects,
//! and mapped into nested `Record`s with integer coercion driven by the
//! `type` attribute.
//!
//! # Design
//! - `TrackerClient` is stateless; each operation is a `build_*` /
//!   `parse_*` pair and the caller may execute the round trip itself.
//! - `Tracker` pairs the client with a `Transport` for callers who want one
//!   blocking call per operation. `UreqTransport` (feature `ureq`) is the
//!   stock transport.
//! - The mapper and validator are independent of the resource vocabulary;
//!   stories stay records, projects and notes get small typed projections.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod mapper;
pub mod markup;
pub mod record;
pub mod serialize;
pub mod story;
pub mod tracker;
pub mod transport;
pub mod validate;

pub use client::TrackerClient;
pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use mapper::{coerce, map_children, map_element, TypeHint};
pub use markup::{Content, Element};
pub use record::{Record, Value};
pub use serialize::record_to_markup;
pub use story::{apply_state_change, Note, Project, StoryId, StoryState};
pub use tracker::Tracker;
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use validate::{validate, validate_document};
