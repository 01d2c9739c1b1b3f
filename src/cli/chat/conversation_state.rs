use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::User }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::Bot }
    }
}

/// In-memory state of one chat session. Messages are only ever appended.
#[derive(Debug, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    pending_input: String,
    is_loading: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_input(&mut self, text: &str) {
        self.pending_input = text.to_string();
    }

    /// Starts a send from the pending input.
    ///
    /// Returns the question to submit, or `None` if the input is blank or a
    /// request is already outstanding. On `Some`, the user message has been
    /// appended, the input cleared and the loading flag raised.
    pub fn begin_send(&mut self) -> Option<String> {
        if self.pending_input.trim().is_empty() {
            return None;
        }
        if self.is_loading {
            debug!("Ignoring send while a request is outstanding");
            return None;
        }

        let question = std::mem::take(&mut self.pending_input);
        self.messages.push(Message::user(question.clone()));
        self.is_loading = true;
        Some(question)
    }

    /// Appends the bot reply and returns to idle.
    pub fn finish_send(&mut self, reply: String) {
        self.messages.push(Message::bot(reply));
        self.is_loading = false;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }
}
