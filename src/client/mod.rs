//! Request client
//!
//! Talks to the inference server's OpenAI-compatible HTTP surface.

pub mod api;
pub mod headers;
pub mod http;

pub use api::InferenceApi;
pub use http::InferenceClient;
