//! Server process management
//!
//! Launching the inference server, waiting for it to accept requests, and
//! stopping it again.

pub mod handle;
pub mod launcher;
pub mod readiness;
pub mod state;

pub use handle::ServerHandle;
pub use launcher::{
    connect_host_for, find_free_port, launch_server, launch_server_with, LaunchCommand,
    LaunchOptions, PortChoice,
};
pub use readiness::{health_url, wait_for_server, ReadinessPolicy};
pub use state::ServerState;
