use std::io::{self, Write};

use color_print::{cwrite, cwriteln};
use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

use super::conversation_state::{Message, Sender};

pub const LOADING_TEXT: &str = "Cargando...";

// Both labels occupy five columns so continuation lines line up.
const INDENT: &str = "     ";

pub fn write_message<W: Write>(out: &mut W, message: &Message) -> io::Result<()> {
    let mut lines = message.text.split('\n');
    let first = lines.next().unwrap_or_default();

    match message.sender {
        Sender::User => cwriteln!(out, "<magenta><bold>Tú:</bold></magenta>  {}", first)?,
        Sender::Bot => cwriteln!(out, "<cyan><bold>Bot:</bold></cyan> {}", first)?,
    }
    for line in lines {
        writeln!(out, "{}{}", INDENT, line)?;
    }

    out.flush()
}

/// Writes the loading line without a trailing newline so it can be erased.
pub fn show_loading<W: Write>(out: &mut W) -> io::Result<()> {
    cwrite!(out, "<magenta><dim>{}</dim></magenta>", LOADING_TEXT)?;
    out.flush()
}

pub fn clear_loading<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    out.flush()
}
