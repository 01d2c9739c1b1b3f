use rustyline::{Config, Editor, Result};

pub const PROMPT: &str = "> ";

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .history_ignore_dups(true)
        .max_history_size(100)
        .build();
    Editor::with_config(config)
}
