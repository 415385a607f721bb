//! Ready-made message handlers used by the `consume` command.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::client::{ConsumerError, HandlerError, MessageHandler};
use super::message::Message;
use crate::cloudevents::CloudEvent;

/// Renders a message as a single log-friendly line.
pub fn format_message(message: &Message) -> String {
    format!(
        "{}/{}@{}: {}",
        message.topic,
        message.partition,
        message.offset,
        message.value_str()
    )
}

/// Renders the CloudEvent carried by a message as pretty JSON.
///
/// Messages that are not CloudEvents render as the extraction error.
pub fn format_cloud_event(message: &Message) -> String {
    CloudEvent::from_message(message)
        .and_then(|event| serde_json::to_string_pretty(&event).map_err(Into::into))
        .unwrap_or_else(|e| format!("Message at offset {} is not a CloudEvent: {}", message.offset, e))
}

/// Prints every message to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct DumpHandler;

#[async_trait::async_trait]
impl MessageHandler for DumpHandler {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        println!("{}", format_message(&message));
        Ok(())
    }
}

/// Prints the CloudEvent carried by every message to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct CloudEventDumpHandler;

#[async_trait::async_trait]
impl MessageHandler for CloudEventDumpHandler {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        println!("{}", format_cloud_event(&message));
        Ok(())
    }
}

/// Runs an external command per message with the value on stdin.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    program: String,
    args: Vec<String>,
}

impl CommandHandler {
    /// Parses a whitespace-separated command line.
    ///
    /// # Errors
    ///
    /// Returns `ConsumerError::Config` if the command line is blank.
    pub fn new(command_line: &str) -> Result<Self, ConsumerError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ConsumerError::Config("handler command is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Program that will be executed.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait::async_trait]
impl MessageHandler for CommandHandler {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        debug!(program = %self.program, offset = message.offset, "Running handler command");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to start '{}': {}", self.program, e))?;

        // Output is drained while stdin is written, so commands that echo
        // their input cannot fill the pipe and stall.
        let stdin = child.stdin.take();
        let write_input = async {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            let result = stdin.write_all(&message.value).await;
            drop(stdin);
            match result {
                // The command may exit without reading its input.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };

        let (written, output) = tokio::join!(write_input, child.wait_with_output());
        let output = output?;
        written?;
        if !output.status.success() {
            return Err(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into());
        }

        info!(
            program = %self.program,
            offset = message.offset,
            output = %String::from_utf8_lossy(&output.stdout).trim(),
            "Handler command finished"
        );
        Ok(())
    }
}
