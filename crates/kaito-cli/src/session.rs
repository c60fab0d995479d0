//! Interactive chat REPL.
//!
//! The loop is strictly sequential: read a line, handle it, print the
//! result, prompt again. The next prompt is only shown once the in-flight
//! request has returned. Failed requests are reported on the error stream
//! and the session carries on; only `/quit`, `/exit` or end of input close it.

use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::endpoint::Endpoint;
use crate::error::CliError;
use crate::inference::ChatBackend;
use crate::params::{GenerationParams, Param};

/// Input prompt.
pub const PROMPT: &str = ">>> ";

/// Printed when the session closes.
pub const CLOSING_MESSAGE: &str = "Chat session ended.";

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// A slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// `/help`
    Help,
    /// `/quit` or `/exit`
    Quit,
    /// `/clear`
    Clear,
    /// `/model`
    Model,
    /// `/params`
    Params,
    /// `/set <param> <value>`
    Set {
        /// Parameter name as typed.
        param: String,
        /// Raw value as typed.
        value: String,
    },
    /// `/set` with missing arguments.
    SetUsage,
}

/// One classified line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// Whitespace only.
    Blank,
    /// A recognised slash command.
    Command(SessionCommand),
    /// A slash command that is not recognised.
    Unknown(String),
    /// Text to send to the model.
    Message(String),
}

/// Classify a line of input.
#[must_use]
pub fn parse_input(line: &str) -> SessionInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return SessionInput::Blank;
    }
    if !trimmed.starts_with('/') {
        return SessionInput::Message(trimmed.to_string());
    }

    let mut parts = trimmed.split_whitespace();
    let name = parts.next().unwrap_or(trimmed);
    let command = match name {
        "/help" => SessionCommand::Help,
        "/quit" | "/exit" => SessionCommand::Quit,
        "/clear" => SessionCommand::Clear,
        "/model" => SessionCommand::Model,
        "/params" => SessionCommand::Params,
        "/set" => match (parts.next(), parts.next()) {
            (Some(param), Some(value)) => SessionCommand::Set {
                param: param.to_string(),
                value: value.to_string(),
            },
            _ => SessionCommand::SetUsage,
        },
        other => return SessionInput::Unknown(other.to_string()),
    };
    SessionInput::Command(command)
}

/// What the session is talking to, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Workspace name.
    pub workspace: String,
    /// Workspace namespace.
    pub namespace: String,
    /// Model identifier, `Unknown` if it could not be read.
    pub model: String,
}

/// Mutable state owned by the running loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Parameters sent with the next request.
    pub params: GenerationParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// A chat session bound to one resolved endpoint.
#[derive(Debug)]
pub struct ChatSession<'a, B> {
    backend: &'a B,
    endpoint: Endpoint,
    info: SessionInfo,
}

impl<'a, B: ChatBackend> ChatSession<'a, B> {
    /// Create a session.
    pub fn new(backend: &'a B, endpoint: Endpoint, info: SessionInfo) -> Self {
        Self {
            backend,
            endpoint,
            info,
        }
    }

    /// Run until `/quit`, `/exit` or end of input.
    ///
    /// Replies go to `out`, per-message failures to `err`. Returns the final
    /// state.
    ///
    /// # Errors
    ///
    /// Only fails if writing to `out` or `err` fails.
    pub async fn run<R, W, E>(
        &self,
        params: GenerationParams,
        mut input: R,
        out: &mut W,
        err: &mut E,
    ) -> Result<SessionState, CliError>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let mut state = SessionState { params };
        debug!(endpoint = %self.endpoint.base_url, access = %self.endpoint.access, "Starting chat session");
        self.write_banner(out)?;

        let mut line = String::new();
        loop {
            write!(out, "{PROMPT}")?;
            out.flush()?;

            line.clear();
            match input.read_line(&mut line) {
                Ok(0) => {
                    writeln!(out)?;
                    writeln!(out, "{CLOSING_MESSAGE}")?;
                    return Ok(state);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to read input, closing session");
                    writeln!(out)?;
                    writeln!(out, "{CLOSING_MESSAGE}")?;
                    return Ok(state);
                }
            }

            match parse_input(&line) {
                SessionInput::Blank => {}
                SessionInput::Command(command) => {
                    if self.dispatch(&mut state, command, out)? == Flow::Close {
                        return Ok(state);
                    }
                }
                SessionInput::Unknown(name) => {
                    writeln!(out, "Unknown command: {name}")?;
                    writeln!(out, "Type /help for available commands.")?;
                    writeln!(out)?;
                }
                SessionInput::Message(text) => {
                    match self
                        .backend
                        .send_message(&self.endpoint, &text, &state.params)
                        .await
                    {
                        Ok(reply) => {
                            writeln!(out, "{reply}")?;
                            writeln!(out)?;
                        }
                        Err(e) => {
                            debug!(error = %e, "Chat request failed");
                            writeln!(err, "Error: {e}")?;
                            err.flush()?;
                        }
                    }
                }
            }
        }
    }

    fn write_banner<W: Write>(&self, out: &mut W) -> Result<(), CliError> {
        writeln!(
            out,
            "Connected to workspace: {} (model: {})",
            self.info.workspace, self.info.model
        )?;
        writeln!(out, "Type /help for commands or /quit to exit.")?;
        writeln!(out)?;
        Ok(())
    }

    fn dispatch<W: Write>(
        &self,
        state: &mut SessionState,
        command: SessionCommand,
        out: &mut W,
    ) -> Result<Flow, CliError> {
        debug!(?command, "Handling command");
        match command {
            SessionCommand::Help => {
                writeln!(out, "Available commands:")?;
                writeln!(out, "  /help                 - Show this help message")?;
                writeln!(out, "  /quit, /exit          - Exit the chat session")?;
                writeln!(out, "  /clear                - Clear the screen")?;
                writeln!(out, "  /model                - Show current model information")?;
                writeln!(out, "  /params               - Show current inference parameters")?;
                writeln!(out, "  /set <param> <value>  - Set an inference parameter ({})", Param::NAMES)?;
                writeln!(out)?;
            }
            SessionCommand::Quit => {
                writeln!(out, "{CLOSING_MESSAGE}")?;
                return Ok(Flow::Close);
            }
            SessionCommand::Clear => {
                write!(out, "{CLEAR_SCREEN}")?;
                self.write_banner(out)?;
            }
            SessionCommand::Model => {
                writeln!(out, "Current model: {}", self.info.model)?;
                writeln!(out, "Workspace: {}", self.info.workspace)?;
                writeln!(out, "Namespace: {}", self.info.namespace)?;
                writeln!(out)?;
            }
            SessionCommand::Params => {
                writeln!(out, "Current inference parameters:")?;
                writeln!(out, "{}", state.params)?;
                writeln!(out)?;
            }
            SessionCommand::SetUsage => {
                writeln!(out, "Usage: /set <parameter> <value>")?;
                writeln!(out, "Available parameters: {}", Param::NAMES)?;
                writeln!(out)?;
            }
            SessionCommand::Set { param, value } => {
                Self::set_param(state, &param, &value, out)?;
                writeln!(out)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn set_param<W: Write>(
        state: &mut SessionState,
        name: &str,
        value: &str,
        out: &mut W,
    ) -> Result<(), CliError> {
        let Ok(param) = name.parse::<Param>() else {
            writeln!(out, "Unknown parameter: {name}")?;
            writeln!(out, "Available parameters: {}", Param::NAMES)?;
            return Ok(());
        };

        match state.params.set(param, value) {
            Ok(()) => match param {
                Param::Temperature => {
                    writeln!(out, "Temperature set to {:.1}", state.params.temperature())?;
                }
                Param::MaxTokens => {
                    writeln!(out, "Max tokens set to {}", state.params.max_tokens())?;
                }
                Param::TopP => writeln!(out, "Top-p set to {:.1}", state.params.top_p())?,
            },
            Err(CliError::Validation(msg)) => writeln!(out, "Invalid value: {msg}")?,
            Err(other) => return Err(other),
        }
        Ok(())
    }
}
