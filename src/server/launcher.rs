//! Inference server launcher
//!
//! Builds the server command line and spawns it as a subprocess bound to a
//! fixed or dynamically chosen port.

use std::io;
use std::net::TcpListener;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::server::ServerHandle;

/// Structured form of the documented launch command line
///
/// ```
/// use tether::server::LaunchCommand;
///
/// let command = LaunchCommand::new("python3 -m sglang.launch_server", "qwen/qwen2.5-0.5b-instruct")
///     .host("0.0.0.0")
///     .mem_fraction_static(0.8);
/// assert_eq!(
///     command.render(),
///     "python3 -m sglang.launch_server --model-path qwen/qwen2.5-0.5b-instruct \
///      --host 0.0.0.0 --mem-fraction-static 0.8"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchCommand {
    program: String,
    model_path: String,
    host: Option<String>,
    mem_fraction_static: Option<f64>,
    chat_template: Option<String>,
    reasoning_parser: Option<String>,
    extra_args: Vec<String>,
}

impl LaunchCommand {
    /// Start a command for `program` serving the model at `model_path`.
    ///
    /// `program` is inserted verbatim and may carry its own arguments
    /// (e.g. `python3 -m sglang.launch_server`).
    pub fn new(program: impl Into<String>, model_path: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            model_path: model_path.into(),
            host: None,
            mem_fraction_static: None,
            chat_template: None,
            reasoning_parser: None,
            extra_args: Vec::new(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn mem_fraction_static(mut self, fraction: f64) -> Self {
        self.mem_fraction_static = Some(fraction);
        self
    }

    pub fn chat_template(mut self, path: impl Into<String>) -> Self {
        self.chat_template = Some(path.into());
        self
    }

    pub fn reasoning_parser(mut self, name: impl Into<String>) -> Self {
        self.reasoning_parser = Some(name.into());
        self
    }

    /// Append an argument the builder has no dedicated setter for
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Address clients should connect to for this command's bind host
    pub fn connect_host(&self) -> String {
        connect_host_for(self.host.as_deref().unwrap_or("127.0.0.1"))
    }

    /// Render the shell command string (without `--port`)
    pub fn render(&self) -> String {
        let mut args = vec!["--model-path".to_string(), self.model_path.clone()];
        if let Some(host) = &self.host {
            args.push("--host".to_string());
            args.push(host.clone());
        }
        if let Some(fraction) = self.mem_fraction_static {
            args.push("--mem-fraction-static".to_string());
            args.push(fraction.to_string());
        }
        if let Some(template) = &self.chat_template {
            args.push("--chat-template".to_string());
            args.push(template.clone());
        }
        if let Some(parser) = &self.reasoning_parser {
            args.push("--reasoning-parser".to_string());
            args.push(parser.clone());
        }
        args.extend(self.extra_args.iter().cloned());

        format!("{} {}", self.program.trim(), shell_words::join(&args))
    }
}

/// How the server's listening port is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortChoice {
    /// Use exactly this port
    Fixed(u16),
    /// Ask the OS for a currently free port
    Dynamic,
}

impl PortChoice {
    /// Resolve to a concrete port number
    pub fn resolve(self) -> Result<u16> {
        match self {
            PortChoice::Fixed(port) => Ok(port),
            PortChoice::Dynamic => find_free_port(),
        }
    }
}

/// Options that don't belong on the server's own command line
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Host used to build the handle's base URL
    pub connect_host: String,
    /// Forward the server's stdout/stderr into `tracing` instead of inheriting them
    pub capture_output: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            connect_host: "127.0.0.1".to_string(),
            capture_output: false,
        }
    }
}

/// Find a port that is free right now on the loopback interface.
///
/// The listener is dropped before returning, so another process may still
/// claim the port before the server binds it.
pub fn find_free_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

/// Launch a server from a shell command string with default options
pub async fn launch_server(command: &str, port: PortChoice) -> Result<ServerHandle> {
    launch_server_with(command, port, LaunchOptions::default()).await
}

/// Launch a server from a shell command string.
///
/// `command` is split into words with shell quoting rules and the program is
/// spawned directly with `--port <port>` appended, so a missing program fails
/// here with `Error::Spawn` and the handle's PID is the server's own. On Unix
/// the server leads its own process group, which `terminate` kills as a
/// whole. The child is killed if the handle is dropped.
#[instrument(skip(options))]
pub async fn launch_server_with(
    command: &str,
    port: PortChoice,
    options: LaunchOptions,
) -> Result<ServerHandle> {
    let words = shell_words::split(command)
        .map_err(|e| Error::Config(format!("Invalid launch command {:?}: {}", command, e)))?;
    let (program, args) = words
        .split_first()
        .ok_or_else(|| Error::Config("Launch command is empty".to_string()))?;

    let port = port.resolve()?;
    let full_command = format!("{} --port {}", command.trim(), port);

    let mut process = tokio::process::Command::new(program);
    process
        .args(args)
        .arg("--port")
        .arg(port.to_string())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    #[cfg(unix)]
    process.process_group(0);

    if options.capture_output {
        process.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        process.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    }

    let mut child = process.spawn().map_err(|e| {
        warn!(program = %program, error = %e, "Failed to spawn inference server");
        Error::Spawn(e)
    })?;

    let pid = child.id().ok_or_else(|| {
        Error::Spawn(io::Error::new(
            io::ErrorKind::Other,
            "server process exited before its pid could be read",
        ))
    })?;

    if options.capture_output {
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, pid, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, pid, "stderr"));
        }
    }

    info!(pid = pid, port = port, command = %full_command, "Launched inference server");

    Ok(ServerHandle::starting(child, pid, port, options.connect_host))
}

/// Forward a captured output pipe line by line into the log
pub(crate) async fn forward_output<R>(reader: R, pid: u32, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!(pid = pid, stream = stream, "{}", line),
            Ok(None) => break,
            Err(e) => {
                debug!(pid = pid, stream = stream, error = %e, "Stopped reading server output");
                break;
            }
        }
    }
}

/// Map a bind address to one a local client can connect to
pub fn connect_host_for(bind_host: &str) -> String {
    match bind_host {
        "0.0.0.0" | "" => "127.0.0.1".to_string(),
        "::" | "[::]" => "[::1]".to_string(),
        other => other.to_string(),
    }
}
