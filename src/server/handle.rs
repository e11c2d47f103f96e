//! Handle to a launched server process

use std::process::ExitStatus;

use tokio::process::Child;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::server::readiness::{wait_until, ReadinessPolicy};
use crate::server::ServerState;

/// A running server subprocess and the port it listens on.
///
/// Owned by the caller. Stop it with [`ServerHandle::terminate`]; if the
/// handle is dropped first the server and its process group are killed
/// anyway.
#[derive(Debug)]
pub struct ServerHandle {
    child: Child,
    pid: u32,
    port: u16,
    host: String,
    state: ServerState,
}

impl ServerHandle {
    /// Wrap a freshly spawned child
    pub(crate) fn starting(child: Child, pid: u32, port: u16, host: String) -> Self {
        Self {
            child,
            pid,
            port,
            host,
            state: ServerState::Starting,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Base URL of the server's HTTP API, e.g. `http://127.0.0.1:30000`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Check whether the process is still alive
    pub fn is_running(&mut self) -> Result<bool> {
        Ok(self.child.try_wait()?.is_none())
    }

    /// Poll the server until it answers, failing fast if the process exits.
    ///
    /// Calling this on a handle that is already ready returns immediately.
    #[instrument(skip(self, client, api_key, policy), fields(pid = self.pid, port = self.port))]
    pub async fn wait_until_ready(
        &mut self,
        client: &reqwest::Client,
        api_key: &str,
        policy: &ReadinessPolicy,
    ) -> Result<()> {
        match self.state {
            ServerState::Ready => return Ok(()),
            ServerState::Starting => {}
            other => {
                return Err(Error::InvalidTransition {
                    from: other,
                    to: ServerState::Ready,
                })
            }
        }

        let base_url = self.base_url();
        let child = &mut self.child;
        wait_until(client, &base_url, api_key, policy, || match child.try_wait()? {
            Some(status) => {
                warn!(status = %status, "Server process exited while starting");
                Err(Error::ServerExited { status })
            }
            None => Ok(()),
        })
        .await?;

        self.state.advance(ServerState::Ready)
    }

    /// Stop the server process and wait for it to be reaped, freeing its port
    #[instrument(skip(self), fields(pid = self.pid, port = self.port))]
    pub async fn terminate(&mut self) -> Result<ExitStatus> {
        if self.state == ServerState::Terminated {
            return Err(Error::InvalidTransition {
                from: self.state,
                to: ServerState::Terminated,
            });
        }

        // Workers spawned by the server share its process group
        self.kill_process_group();

        let status = match self.child.try_wait()? {
            Some(status) => status,
            None => {
                self.child.kill().await?;
                self.child.wait().await?
            }
        };

        self.state.advance(ServerState::Terminated)?;
        info!(status = %status, "Server terminated");
        Ok(status)
    }

    #[cfg(unix)]
    fn kill_process_group(&self) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(self.pid as i32), Signal::SIGKILL) {
            debug!(pid = self.pid, error = %e, "Process group already gone");
        }
    }

    #[cfg(not(unix))]
    fn kill_process_group(&self) {}
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.state != ServerState::Terminated {
            warn!(pid = self.pid, "Server handle dropped without terminate, killing server");
            self.kill_process_group();
        }
    }
}
