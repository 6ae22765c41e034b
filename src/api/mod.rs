//! # Module: api
//!
//! HTTP adapter over the Anosunu REST API.
//!
//! - [`client`]: the [`ApiClient`], with base URL, bearer-token injection, `{data: …}`
//!   envelope unwrapping and error extraction.
//!
//! Errors are passed through unchanged; there is no retry at this layer.
//! The flows that need one (payment and join pollers) own it.

pub mod client;

pub use client::{decode_data, extract_error, ApiClient};
