//! Launch-wait-request-terminate lifecycle
//!
//! A `Session` either launches a server from configuration or attaches to an
//! already running one, and hands out a client once the server is ready.

use tracing::{error, info, instrument};

use crate::client::InferenceClient;
use crate::config::Config;
use crate::error::Result;
use crate::server::{launch_server_with, wait_for_server, LaunchOptions, ServerHandle};

/// A ready server plus a client pointed at it
pub struct Session {
    client: InferenceClient,
    server: Option<ServerHandle>,
}

impl Session {
    /// Bring up a server (or attach to `config.base_url`) and wait until it is ready.
    ///
    /// If a launched server never becomes ready it is terminated before the
    /// error is returned.
    #[instrument(skip(config))]
    pub async fn start(config: &Config) -> Result<Self> {
        let http_client = config.http_client()?;
        let policy = config.readiness_policy();

        if let Some(base_url) = &config.base_url {
            info!(base_url = %base_url, "Attaching to running inference server");
            wait_for_server(&http_client, base_url, &config.api_key, &policy).await?;
            return Ok(Self {
                client: InferenceClient::new(http_client, base_url.as_str(), config.api_key.as_str()),
                server: None,
            });
        }

        let command = config.launch_command();
        let options = LaunchOptions {
            connect_host: command.connect_host(),
            ..Default::default()
        };
        let mut server = launch_server_with(&command.render(), config.port_choice(), options).await?;

        if let Err(e) = server
            .wait_until_ready(&http_client, &config.api_key, &policy)
            .await
        {
            error!(error = %e, "Inference server failed to become ready");
            if let Err(stop_err) = server.terminate().await {
                error!(error = %stop_err, "Failed to stop inference server");
            }
            return Err(e);
        }

        Ok(Self {
            client: InferenceClient::new(http_client, server.base_url(), config.api_key.as_str()),
            server: Some(server),
        })
    }

    pub fn client(&self) -> &InferenceClient {
        &self.client
    }

    /// The launched server, or `None` when attached to an external one
    pub fn server(&self) -> Option<&ServerHandle> {
        self.server.as_ref()
    }

    /// Terminate the launched server, if any
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(mut server) = self.server.take() {
            server.terminate().await?;
        }
        Ok(())
    }
}
