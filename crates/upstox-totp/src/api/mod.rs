//! Wire-level request and response models for the login protocol.
//!
//! The provider uses two hosts with different conventions: the browser-facing
//! service host wraps everything in a `{"status", "data", "errors"}` envelope
//! with camelCase fields, while the public API host returns bare snake_case
//! payloads.

mod request;
mod response;

pub(crate) use request::*;
pub(crate) use response::*;
pub use response::TokenData;
