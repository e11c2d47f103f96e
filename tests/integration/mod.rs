//! Integration test modules

mod completions;
mod readiness;
mod session;
