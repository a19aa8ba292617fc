//! # Find Code Protocol
//!
//! Values exchanged between the page-side capture, the resolver and the
//! editor-side consumer.
//!
//! ```text
//! ElementDescriptor ──> resolver ──> ResolvedLocation | ResolveFailure
//! ```

use anyhow::Result;
use serde::Serialize;

mod descriptor;
mod location;
mod message;

pub use descriptor::{ElementDescriptor, TEXT_CONTENT_MAX_CHARS};
pub use location::{
    Accuracy, FailureKind, Resolution, ResolutionResponse, ResolveFailure, ResolvedLocation,
};
pub use message::{ClientMessage, ServerMessage};

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}
