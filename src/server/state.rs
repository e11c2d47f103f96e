//! Server lifecycle state
//!
//! A launched server only ever moves forward:
//! `Unstarted -> Starting -> Ready -> Terminated`. There is no restart.

use std::fmt;

use crate::error::{Error, Result};

/// Lifecycle state of a managed server process
///
/// Ordered so that a legal transition is always to a strictly later state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServerState {
    /// Command prepared, no process yet
    #[default]
    Unstarted,
    /// Process spawned, not yet accepting connections
    Starting,
    /// Health probe succeeded
    Ready,
    /// Process stopped
    Terminated,
}

impl ServerState {
    /// Check whether moving from the current state to `next` is allowed.
    ///
    /// Any forward move is legal, including skipping `Ready` when a server
    /// is terminated before it came up.
    pub fn can_transition_to(&self, next: ServerState) -> bool {
        next > *self
    }

    /// Advance to `next`, rejecting backward or repeated transitions
    pub fn advance(&mut self, next: ServerState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Unstarted => write!(f, "unstarted"),
            ServerState::Starting => write!(f, "starting"),
            ServerState::Ready => write!(f, "ready"),
            ServerState::Terminated => write!(f, "terminated"),
        }
    }
}
