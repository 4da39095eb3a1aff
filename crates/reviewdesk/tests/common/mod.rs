//! Shared test utilities for reviewdesk integration tests.
//!
//! This module provides:
//! - `ScriptedTransport`, a fake service that records every call and answers
//!   from a script, optionally holding a reply until the test releases it
//! - `TestServer`, a local axum server that captures real HTTP requests

#![allow(dead_code)]

pub mod server;
pub mod transport;

pub use server::{CannedReply, CapturedField, CapturedRequest, TestServer};
pub use transport::{reply, RecordedCall, ScriptedTransport};
