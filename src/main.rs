//! Tether - drive a local OpenAI-compatible inference server
//!
//! Launches the configured server, waits for it, runs one request and prints
//! the result, then stops the server.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tokio::signal;
use tracing::{info, warn};

use tether::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, CompletionResponse, Config,
    FragmentStream, InferenceApi, Message, RequestOptions, Session,
};
use tether::types::Usage;

#[derive(Debug, Parser)]
#[command(name = "tether", version, about = "Launch a local inference server and query it")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a chat completion request
    Chat {
        /// User message
        message: String,
        /// Optional system prompt placed before the user message
        #[arg(long)]
        system: Option<String>,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Send a text completion request
    Complete {
        /// Prompt to continue
        prompt: String,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// List the models the server has loaded
    Models,
}

#[derive(Debug, Args)]
struct RequestArgs {
    /// Model identifier (defaults to the configured model path)
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    temperature: Option<f64>,
    #[arg(long)]
    max_tokens: Option<u32>,
    #[arg(long)]
    top_p: Option<f64>,
    #[arg(long)]
    presence_penalty: Option<f64>,
    #[arg(long)]
    frequency_penalty: Option<f64>,
    /// Number of choices to generate
    #[arg(short = 'n', long = "num-choices")]
    n: Option<u32>,
    /// Stop sequence (repeatable)
    #[arg(long)]
    stop: Vec<String>,
    #[arg(long)]
    seed: Option<u64>,
    /// Print output as it is generated
    #[arg(long)]
    stream: bool,
    /// Ask for reasoning text separately from the answer
    #[arg(long)]
    separate_reasoning: bool,
    /// Pass `enable_thinking` to the chat template
    #[arg(long)]
    enable_thinking: bool,
}

impl RequestArgs {
    fn model(&self, config: &Config) -> String {
        self.model.clone().unwrap_or_else(|| config.model_path.clone())
    }

    fn choices(&self) -> u32 {
        self.n.unwrap_or(1)
    }

    fn apply<R: RequestOptions>(&self, mut request: R) -> R {
        if let Some(temperature) = self.temperature {
            request = request.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.max_tokens(max_tokens);
        }
        if let Some(top_p) = self.top_p {
            request = request.top_p(top_p);
        }
        if let Some(penalty) = self.presence_penalty {
            request = request.presence_penalty(penalty);
        }
        if let Some(penalty) = self.frequency_penalty {
            request = request.frequency_penalty(penalty);
        }
        if let Some(n) = self.n {
            request = request.n(n);
        }
        match self.stop.len() {
            0 => {}
            1 => request = request.stop(self.stop[0].as_str()),
            _ => request = request.stop(self.stop.clone()),
        }
        if let Some(seed) = self.seed {
            request = request.seed(seed);
        }
        if self.separate_reasoning {
            request = request.separate_reasoning(true);
        }
        if self.enable_thinking {
            request = request.chat_template_kwarg("enable_thinking", true);
        }
        request
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout carries only model output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether=info".into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    // Dropping an unfinished start kills the server it launched
    let session = tokio::select! {
        session = Session::start(&config) => session.context("Failed to start inference server")?,
        _ = shutdown_signal() => {
            info!("Startup interrupted");
            return Ok(());
        }
    };

    let outcome = tokio::select! {
        result = run(&cli.command, &config, session.client()) => result,
        _ = shutdown_signal() => Ok(()),
    };

    session
        .shutdown()
        .await
        .context("Failed to stop inference server")?;
    info!("Tether shutdown complete");

    outcome
}

async fn run(command: &Command, config: &Config, api: &dyn InferenceApi) -> Result<()> {
    match command {
        Command::Chat {
            message,
            system,
            request: args,
        } => {
            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(Message::system(system.as_str()));
            }
            messages.push(Message::user(message.as_str()));
            let request = args.apply(ChatCompletionRequest::new(args.model(config), messages));

            if args.stream {
                let stream = api.chat_completions_stream(&request.include_usage()).await?;
                print_stream(stream, args.choices()).await
            } else {
                let response = api.chat_completions(&request).await?;
                print_chat(&response);
                Ok(())
            }
        }
        Command::Complete {
            prompt,
            request: args,
        } => {
            let request = args.apply(CompletionRequest::new(args.model(config), prompt.as_str()));

            if args.stream {
                let stream = api.completions_stream(&request.include_usage()).await?;
                print_stream(stream, args.choices()).await
            } else {
                let response = api.completions(&request).await?;
                print_completion(&response);
                Ok(())
            }
        }
        Command::Models => {
            let models = api.list_models().await?;
            for id in models.ids() {
                println!("{}", id);
            }
            Ok(())
        }
    }
}

fn print_chat(response: &ChatCompletionResponse) {
    let many = response.choices.len() > 1;
    for choice in &response.choices {
        if many {
            println!("--- choice {} ---", choice.index);
        }
        if let Some(reasoning) = choice.message.reasoning_content.as_deref().filter(|r| !r.is_empty()) {
            println!("[reasoning]\n{}\n[answer]", reasoning);
        }
        println!("{}", choice.message.content.as_deref().unwrap_or_default());
    }
    if let Some(usage) = &response.usage {
        info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            finish_reason = ?response.choices.first().and_then(|c| c.finish_reason.as_deref()),
            "Usage"
        );
    }
}

fn print_completion(response: &CompletionResponse) {
    let many = response.choices.len() > 1;
    for choice in &response.choices {
        if many {
            println!("--- choice {} ---", choice.index);
        }
        println!("{}", choice.text);
    }
    if let Some(usage) = &response.usage {
        log_usage(usage);
    }
}

/// Print streamed output; several choices are buffered and printed one after another
async fn print_stream(stream: FragmentStream, choices: u32) -> Result<()> {
    if choices > 1 {
        print_buffered_stream(stream).await
    } else {
        print_live_stream(stream).await
    }
}

#[derive(Default)]
struct StreamedChoice {
    reasoning: String,
    text: String,
}

async fn print_buffered_stream(mut stream: FragmentStream) -> Result<()> {
    let mut choices: BTreeMap<u32, StreamedChoice> = BTreeMap::new();

    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        if let Some(usage) = &fragment.usage {
            log_usage(usage);
        }
        let choice = choices.entry(fragment.index).or_default();
        if let Some(reasoning) = &fragment.reasoning {
            choice.reasoning.push_str(reasoning);
        }
        choice.text.push_str(&fragment.text);
    }

    for (index, choice) in &choices {
        println!("--- choice {} ---", index);
        if !choice.reasoning.is_empty() {
            println!("[reasoning]\n{}\n[answer]", choice.reasoning);
        }
        println!("{}", choice.text);
    }
    Ok(())
}

async fn print_live_stream(mut stream: FragmentStream) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut in_reasoning = false;

    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;

        if let Some(reasoning) = &fragment.reasoning {
            if !in_reasoning {
                writeln!(stdout, "[reasoning]")?;
                in_reasoning = true;
            }
            write!(stdout, "{}", reasoning)?;
        }
        if !fragment.text.is_empty() {
            if in_reasoning {
                write!(stdout, "\n[answer]\n")?;
                in_reasoning = false;
            }
            write!(stdout, "{}", fragment.text)?;
        }
        stdout.flush()?;

        if let Some(usage) = &fragment.usage {
            log_usage(usage);
        }
    }
    writeln!(stdout)?;
    Ok(())
}

fn log_usage(usage: &Usage) {
    info!(
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        total_tokens = usage.total_tokens,
        "Usage"
    );
}

/// Resolve when the user asks to stop
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, stopping server");
        }
        _ = terminate => {
            warn!("Received SIGTERM, stopping server");
        }
    }
}
