//! # PromptDeck Core Library
//!
//! Data model, schema resolution, persistence and backend plumbing for editing and
//! running node-graph workflows against a ComfyUI-compatible server (Headless).
//!

pub mod backend;
pub mod config;
pub mod domain;
pub mod error;
pub mod schema;
pub mod store;

pub use error::{PromptDeckError, Result};
