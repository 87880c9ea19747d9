//! # Queue Consumer CLI
//!
//! Command-line interface for inspecting and driving queue consumers.
//!
//! This module provides CLI commands for:
//! - Resolving the queue name a consumer maps to
//! - Checking existence and approximate depth of a queue
//! - Sending messages and draining a queue
//! - Deleting queues and publishing to notification topics

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use queue_consumer::{
    Configuration, ConfigurationError, HandlerError, NotificationTopic, Queue, QueueConsumer,
    QueueError, QueueRuntime, ReceivedMessage, SendOptions,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// CLI Structure
// ============================================================================

/// Queue Consumer CLI - drive environment-aware queues from the shell
#[derive(Parser, Debug)]
#[command(name = "queue-consumer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and drive environment-aware message queues")]
#[command(
    long_about = "Resolves consumer queue names per environment and sends, receives, counts and deletes messages on them"
)]
pub struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long, env = "QUEUE_CONSUMER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Environment tag appended to queue and topic names
    #[arg(short, long, global = true)]
    pub environment: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Consumer identity shared by the queue subcommands
#[derive(Args, Debug, Clone)]
pub struct QueueArgs {
    /// Consumer name the queue is derived from (e.g. `OrderEvents`)
    #[arg(long)]
    pub consumer: String,

    /// Base queue name that replaces the derived one
    #[arg(long)]
    pub queue_name: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the fully resolved queue name
    Name {
        #[command(flatten)]
        queue: QueueArgs,
    },

    /// Check whether the queue exists
    Exists {
        #[command(flatten)]
        queue: QueueArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the approximate number of pending messages
    Count {
        #[command(flatten)]
        queue: QueueArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Send a message to the queue
    Send {
        #[command(flatten)]
        queue: QueueArgs,

        /// Message body
        body: String,

        /// Seconds before the message becomes visible
        #[arg(long)]
        delay_seconds: Option<u32>,

        /// Message attribute as key=value (repeatable)
        #[arg(short, long = "attribute", value_parser = parse_attribute)]
        attributes: Vec<(String, String)>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Drain the queue, printing each message body
    Receive {
        #[command(flatten)]
        queue: QueueArgs,

        /// Seconds without traffic before stopping
        #[arg(long)]
        idle_timeout: Option<u64>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete the queue
    Delete {
        #[command(flatten)]
        queue: QueueArgs,
    },

    /// Publish a message to a notification topic
    Notify {
        /// Topic base name
        topic: String,

        /// Message to publish
        message: String,

        /// Optional subject line
        #[arg(short, long)]
        subject: Option<String>,

        /// Treat the topic as a complete name (no prefix or environment)
        #[arg(long)]
        full_name: bool,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

// ============================================================================
// Output
// ============================================================================

/// Collects command output lines, optionally echoing them to stdout
#[derive(Clone, Default)]
pub struct Output {
    lines: Arc<Mutex<Vec<String>>>,
    echo: bool,
}

impl Output {
    /// Output that prints every line as it is written
    pub fn stdout() -> Self {
        Self {
            lines: Arc::default(),
            echo: true,
        }
    }

    /// Output that only records lines
    pub fn captured() -> Self {
        Self::default()
    }

    pub fn line(&self, line: impl Into<String>) {
        let line = line.into();
        if self.echo {
            println!("{}", line);
        }
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

// ============================================================================
// Consumer
// ============================================================================

/// Consumer whose identity comes from the command line and whose handler
/// prints each body
pub struct CliConsumer {
    name: String,
    queue_name: Option<String>,
    format: OutputFormat,
    output: Output,
}

impl CliConsumer {
    pub fn new(args: &QueueArgs, format: OutputFormat, output: Output) -> Self {
        Self {
            name: args.consumer.clone(),
            queue_name: args.queue_name.clone(),
            format,
            output,
        }
    }
}

#[async_trait]
impl QueueConsumer for CliConsumer {
    fn consumer_name(&self) -> String {
        self.name.clone()
    }

    fn queue_name_override(&self) -> Option<String> {
        self.queue_name.clone()
    }

    async fn process_message(&self, message: &ReceivedMessage) -> Result<(), HandlerError> {
        match self.format {
            OutputFormat::Text => self.output.line(message.body()),
            OutputFormat::Json => self.output.line(
                json!({
                    "message_id": message.message_id.as_str(),
                    "body": message.body(),
                    "receive_count": message.receive_count,
                    "attributes": message.attributes,
                })
                .to_string(),
            ),
        }
        Ok(())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// CLI error types
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Queue(e) if e.is_configuration_error() => 1,
            Self::Queue(_) => 2,
            Self::CommandFailed { .. } => 3,
            Self::InvalidArgument { .. } => 4,
            Self::Io(_) => 5,
        }
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli.log_level, cli.json_logs)?;

    let config = build_configuration(&cli)?;
    let runtime = Arc::new(QueueRuntime::new());

    execute(cli.command, config, runtime, &Output::stdout()).await
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn initialize_logging(level: &str, json_logs: bool) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CliError::InvalidArgument {
            arg: "log-level".to_string(),
            message: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    // A subscriber installed earlier in the process keeps receiving events
    if let Err(e) = result {
        debug!(error = %e, "Tracing subscriber already installed");
    }
    Ok(())
}

/// Load configuration from file and environment, then apply command-line overrides
pub fn build_configuration(cli: &Cli) -> Result<Configuration, CliError> {
    let config = Configuration::load(cli.config.as_deref())?;
    Ok(apply_overrides(config, cli))
}

/// Apply global and per-command overrides to a loaded configuration
pub fn apply_overrides(mut config: Configuration, cli: &Cli) -> Configuration {
    if let Some(environment) = &cli.environment {
        config = config.with_environment(environment.clone());
    }
    if let Commands::Receive {
        idle_timeout: Some(seconds),
        ..
    } = &cli.command
    {
        config = config.with_idle_timeout(*seconds);
    }
    config
}

/// Configure `runtime` with `config` and run one command against it
pub async fn execute(
    command: Commands,
    config: Configuration,
    runtime: Arc<QueueRuntime>,
    output: &Output,
) -> Result<(), CliError> {
    runtime.configure(config).await?;

    match command {
        Commands::Name { queue } => execute_name_command(&queue, runtime, output),
        Commands::Exists { queue, format } => {
            execute_exists_command(&queue, format, runtime, output).await
        }
        Commands::Count { queue, format } => {
            execute_count_command(&queue, format, runtime, output).await
        }
        Commands::Send {
            queue,
            body,
            delay_seconds,
            attributes,
            format,
        } => {
            let mut options = SendOptions::new();
            if let Some(delay) = delay_seconds {
                options = options.with_delay_seconds(delay);
            }
            for (key, value) in attributes {
                options = options.with_attribute(key, value);
            }
            execute_send_command(&queue, &body, &options, format, runtime, output).await
        }
        Commands::Receive { queue, format, .. } => {
            execute_receive_command(&queue, format, runtime, output).await
        }
        Commands::Delete { queue } => execute_delete_command(&queue, runtime, output).await,
        Commands::Notify {
            topic,
            message,
            subject,
            full_name,
        } => {
            execute_notify_command(&topic, &message, subject.as_deref(), full_name, runtime, output)
                .await
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

fn queue_for(
    args: &QueueArgs,
    format: OutputFormat,
    runtime: Arc<QueueRuntime>,
    output: &Output,
) -> Queue<CliConsumer> {
    Queue::new(runtime, CliConsumer::new(args, format, output.clone()))
}

fn execute_name_command(
    args: &QueueArgs,
    runtime: Arc<QueueRuntime>,
    output: &Output,
) -> Result<(), CliError> {
    let queue = queue_for(args, OutputFormat::Text, runtime, output);
    output.line(queue.queue_name()?.as_str());
    Ok(())
}

async fn execute_exists_command(
    args: &QueueArgs,
    format: OutputFormat,
    runtime: Arc<QueueRuntime>,
    output: &Output,
) -> Result<(), CliError> {
    let queue = queue_for(args, format, runtime, output);
    let name = queue.queue_name()?;
    let exists = queue.exists().await;

    match format {
        OutputFormat::Text => output.line(exists.to_string()),
        OutputFormat::Json => {
            output.line(json!({ "queue": name.as_str(), "exists": exists }).to_string())
        }
    }
    Ok(())
}

async fn execute_count_command(
    args: &QueueArgs,
    format: OutputFormat,
    runtime: Arc<QueueRuntime>,
    output: &Output,
) -> Result<(), CliError> {
    let queue = queue_for(args, format, runtime, output);
    let name = queue.queue_name()?;
    let count = queue.count().await?;

    match format {
        OutputFormat::Text => output.line(count.to_string()),
        OutputFormat::Json => {
            output.line(json!({ "queue": name.as_str(), "count": count }).to_string())
        }
    }
    Ok(())
}

async fn execute_send_command(
    args: &QueueArgs,
    body: &str,
    options: &SendOptions,
    format: OutputFormat,
    runtime: Arc<QueueRuntime>,
    output: &Output,
) -> Result<(), CliError> {
    options.validate().map_err(|e| CliError::InvalidArgument {
        arg: "send".to_string(),
        message: e.to_string(),
    })?;

    let queue = queue_for(args, format, runtime, output);
    let outcome = queue.send_with_options(body, options).await?;

    let Some(sent) = outcome.sent() else {
        let message = outcome
            .failure()
            .map(|f| format!("sending to {} failed: {}", f.queue_name, f.error))
            .unwrap_or_else(|| "send failed".to_string());
        return Err(CliError::CommandFailed { message });
    };

    info!(message_id = %sent.message_id, "Message sent");
    match format {
        OutputFormat::Text => output.line(sent.message_id.as_str()),
        OutputFormat::Json => output.line(
            json!({
                "queue": queue.queue_name()?.as_str(),
                "message_id": sent.message_id.as_str(),
            })
            .to_string(),
        ),
    }
    Ok(())
}

async fn execute_receive_command(
    args: &QueueArgs,
    format: OutputFormat,
    runtime: Arc<QueueRuntime>,
    output: &Output,
) -> Result<(), CliError> {
    let queue = queue_for(args, format, runtime, output);
    let processed = queue.receive().await?;

    info!(processed, "Receive loop finished");
    if format == OutputFormat::Json {
        let name = queue.queue_name()?;
        output.line(json!({ "queue": name.as_str(), "processed": processed }).to_string());
    }
    Ok(())
}

async fn execute_delete_command(
    args: &QueueArgs,
    runtime: Arc<QueueRuntime>,
    output: &Output,
) -> Result<(), CliError> {
    let queue = queue_for(args, OutputFormat::Text, runtime, output);
    let name = queue.queue_name()?;
    queue.delete_queue().await?;
    output.line(format!("Deleted {}", name));
    Ok(())
}

async fn execute_notify_command(
    topic: &str,
    message: &str,
    subject: Option<&str>,
    full_name: bool,
    runtime: Arc<QueueRuntime>,
    output: &Output,
) -> Result<(), CliError> {
    if message.is_empty() {
        return Err(CliError::InvalidArgument {
            arg: "message".to_string(),
            message: "notification message cannot be empty".to_string(),
        });
    }

    let topic = if full_name {
        NotificationTopic::create_with_full_name(&runtime, topic).await?
    } else {
        NotificationTopic::create(&runtime, topic).await?
    };
    let message_id = topic.send(message, subject).await?;

    output.line(message_id.as_str());
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
