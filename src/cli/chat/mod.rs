pub mod conversation_state;
pub mod prompt;
pub mod render;

use std::io::Write;
use std::process::ExitCode;

use conversation_state::ConversationState;
use eyre::Result;
use rustyline::error::ReadlineError;
use tracing::{debug, info};

use crate::chat_client::ChatBackend;

/// Shown in place of an answer when the chat service could not be reached.
pub const CONNECTION_ERROR_TEXT: &str = "Error al conectar con el servidor.";

const WELCOME_TEXT: &str = "
Chat de Opiniones por Sucursal

Escribe tu pregunta aquí y pulsa Enter.

/help         Show the help dialogue
/quit         Quit the application
";

const HELP_TEXT: &str = "
Chat de Opiniones por Sucursal

/history      Show the conversation so far
/help         Show this help dialogue
/quit         Quit the application

Anything else is sent to the chat service as a question.
";

pub struct ChatContext {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    conversation_state: ConversationState,
    backend: Box<dyn ChatBackend>,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        backend: Box<dyn ChatBackend>,
    ) -> Self {
        Self {
            output,
            input,
            interactive,
            conversation_state: ConversationState::new(),
            backend,
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Single question from the command line
        if let Some(input) = self.input.take() {
            self.update_input(&input);
            self.send().await?;
            return Ok(ExitCode::SUCCESS);
        }

        if self.interactive {
            self.print_welcome()?;
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    pub fn conversation_state(&self) -> &ConversationState {
        &self.conversation_state
    }

    pub fn update_input(&mut self, text: &str) {
        self.conversation_state.update_input(text);
    }

    /// Sends the pending input and appends the answer, or the connection
    /// error text, as a bot message. Blank input and sends issued while a
    /// request is outstanding are ignored.
    pub async fn send(&mut self) -> Result<()> {
        let Some(question) = self.conversation_state.begin_send() else {
            return Ok(());
        };

        let loading_shown = self.interactive
            && match render::show_loading(&mut self.output) {
                Ok(()) => true,
                Err(e) => {
                    debug!("Could not draw loading indicator: {}", e);
                    false
                }
            };

        let reply = match self.backend.ask(&question).await {
            Ok(reply) => reply.reply_text(),
            Err(e) => {
                debug!("Chat request failed: {}", e);
                CONNECTION_ERROR_TEXT.to_string()
            }
        };
        self.conversation_state.finish_send(reply);

        if loading_shown {
            render::clear_loading(&mut self.output)?;
        }

        if let Some(message) = self.conversation_state.last_message() {
            if self.interactive {
                render::write_message(&mut self.output, message)?;
            } else {
                writeln!(self.output, "{}", message.text)?;
            }
        }

        Ok(())
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", WELCOME_TEXT)?;
        Ok(())
    }

    fn print_history(&mut self) -> Result<()> {
        for message in self.conversation_state.messages() {
            render::write_message(&mut self.output, message)?;
        }
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;

        loop {
            match rl.readline(prompt::PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str());
                    }

                    if !self.handle_line(&line).await? {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        info!("Chat session ended after {} messages", self.conversation_state.messages().len());
        Ok(())
    }

    /// Handles one line from the prompt. Returns `false` once the session
    /// should end. Errors from a single input are reported and the session
    /// goes on.
    async fn handle_line(&mut self, line: &str) -> Result<bool> {
        match line.trim() {
            "" => return Ok(true),
            "/quit" => return Ok(false),
            _ => {}
        }

        if let Err(e) = self.handle_input(line).await {
            writeln!(self.output, "Error: {}", e)?;
        }

        Ok(true)
    }

    async fn handle_input(&mut self, input: &str) -> Result<()> {
        match input.trim() {
            "/help" => {
                writeln!(self.output, "{}", HELP_TEXT)?;
            }
            "/history" => {
                self.print_history()?;
            }
            _ => {
                self.update_input(input);
                self.send().await?;
            }
        }

        Ok(())
    }
}
