//! Tether - drive a local OpenAI-compatible inference server
//!
//! Launches the server as a subprocess, waits until it answers, sends chat
//! and text completion requests (aggregated or streamed), and stops it again.

pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod streaming;
pub mod types;

pub use crate::client::{InferenceApi, InferenceClient};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::server::{
    launch_server, wait_for_server, LaunchCommand, PortChoice, ReadinessPolicy, ServerHandle,
    ServerState,
};
pub use crate::session::Session;
pub use crate::streaming::{collect_choices, collect_text, Fragment, FragmentStream};
pub use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, CompletionResponse, Message,
    RequestOptions, Role,
};
