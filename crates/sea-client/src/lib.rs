//! Typed client for the Sea social network API.
//!
//! This crate provides request builders for the Sea HTTP API, validation of
//! API payloads into domain objects, and WebSocket stream sessions.
//!
//! ## Features
//!
//! - **Domain objects**: Posts, users, files and OAuth records, validated on construction
//! - **HTTP Client**: OAuth2 authorization, posting, timelines, account and album updates
//! - **Streams**: Live post delivery over a single WebSocket subscription

mod client;
mod config;
mod error;
pub mod stream;
mod types;
pub mod validator;

pub use client::{SeaClient, TIMELINE_COUNT_MAX, TIMELINE_COUNT_MIN, TimelineQuery};
pub use config::{ClientConfig, DEFAULT_API_BASE, DEFAULT_OAUTH_BASE};
pub use error::{Constraint, SeaError, ValidationError};
pub use stream::{FrameHandler, SessionState, StreamEvent, StreamSession};
pub use types::*;
pub use validator::{is_valid_date, is_valid_url};
