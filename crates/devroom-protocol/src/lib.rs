//! Devroom Protocol - the AI assistant reply contract
//!
//! The assistant replies with one raw text blob that is *expected*, not
//! guaranteed, to contain a single JSON object in one of two shapes:
//! - `{"text": "..."}` — a plain reply
//! - `{"text": "...", "fileTree": {...}, "buildCommand": {...},
//!   "startCommand": {...}}` — a project bundle
//!
//! This crate owns:
//! - The [`CompletionProvider`] boundary and its timeout wrapper
//! - Tolerant extraction of the JSON object out of arbitrary model output
//! - The [`AiResponse`] tagged variant, discriminated by `fileTree` presence
//! - The instruction text that asks the provider for this contract

#![warn(unreachable_pub)]

pub mod extract;
pub mod instruction;
pub mod provider;
pub mod response;

pub use extract::{extract_json, fallback_text, FORMAT_FALLBACK_NOTICE, PROVIDER_ERROR_NOTICE};
pub use instruction::{build_prompt, mentions_ai, AI_MENTION, SYSTEM_INSTRUCTION};
pub use provider::{complete, CompletionProvider, ProviderError};
pub use response::{AiResponse, ParseError, ProjectBundle, RunCommand};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
