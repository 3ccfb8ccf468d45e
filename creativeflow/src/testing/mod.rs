//! Testing utilities for creativeflow pipelines.
//!
//! This module provides:
//! - A scripted in-memory model service
//! - Request fixtures and canned replies for the default templates

mod fixtures;
mod mocks;

pub use fixtures::{canned_reply, lumen_request};
pub use mocks::{Script, ScriptedModel};
