//! HTTP client for the FitFind REST API.
//!
//! `ApiClient` implements [`fitfind_core::FitFindApi`]. Each call performs a
//! single request and decodes the response envelope into a typed result.

#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]

pub mod client;
mod endpoints;
mod envelope;
pub mod error;

#[cfg(test)]
mod tests;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::ClientError;
