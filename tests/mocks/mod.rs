//! Mock infrastructure for testing against an inference server
//!
//! All mocks are reusable across test files and support success, error and
//! streaming scenarios.

pub mod inference_server;

pub use inference_server::*;
