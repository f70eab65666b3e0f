//! The terminal interaction surface.
//!
//! The components never print directly: they talk to a [`Console`] handle
//! that is passed in explicitly, so the menu logic can be driven by a
//! scripted console in tests.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use thiserror::Error;

use crate::display::{self, Table};

#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Input stream closed (EOF or interrupt).
    #[error("input closed")]
    Closed,

    #[error(transparent)]
    Readline(#[from] ReadlineError),
}

/// What the menu components need from a terminal.
pub trait Console {
    /// Show a titled banner panel.
    fn panel(&mut self, title: &str);

    /// Show a rendered table.
    fn table(&mut self, table: &Table);

    /// Show one line of text.
    fn line(&mut self, text: &str);

    /// Prompt for a line of input, trimmed.
    fn prompt(&mut self, text: &str) -> Result<String, ConsoleError>;

    /// Clear the screen.
    fn clear(&mut self);
}

/// Pause until the user presses Enter, then clear the screen.
pub fn pause(console: &mut dyn Console) -> Result<(), ConsoleError> {
    console.prompt("Press Enter to continue... ")?;
    console.clear();
    Ok(())
}

/// Interactive console backed by rustyline.
pub struct LineConsole {
    editor: DefaultEditor,
}

impl LineConsole {
    pub fn new() -> Result<LineConsole, ConsoleError> {
        Ok(LineConsole {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Console for LineConsole {
    fn panel(&mut self, title: &str) {
        println!("{}", display::panel(title));
    }

    fn table(&mut self, table: &Table) {
        print!("{}", table.render());
    }

    fn line(&mut self, text: &str) {
        println!("{text}");
    }

    fn prompt(&mut self, text: &str) -> Result<String, ConsoleError> {
        match self.editor.readline(text) {
            Ok(input) => {
                let trimmed = input.trim().to_string();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(&trimmed);
                }
                Ok(trimmed)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Err(ConsoleError::Closed),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&mut self) {
        let _ = self.editor.clear_screen();
    }
}

/// Scripted console for tests: queued inputs, captured transcript.
#[cfg(test)]
pub struct ScriptedConsole {
    inputs: std::collections::VecDeque<String>,
    pub transcript: Vec<String>,
}

#[cfg(test)]
impl ScriptedConsole {
    pub fn new(inputs: &[&str]) -> ScriptedConsole {
        ScriptedConsole {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            transcript: Vec::new(),
        }
    }

    /// The full transcript as one string, for containment assertions.
    pub fn output(&self) -> String {
        self.transcript.join("\n")
    }
}

#[cfg(test)]
impl Console for ScriptedConsole {
    fn panel(&mut self, title: &str) {
        self.transcript.push(crate::display::panel(title));
    }

    fn table(&mut self, table: &Table) {
        self.transcript.push(table.render());
    }

    fn line(&mut self, text: &str) {
        self.transcript.push(text.to_string());
    }

    fn prompt(&mut self, text: &str) -> Result<String, ConsoleError> {
        self.transcript.push(text.to_string());
        self.inputs.pop_front().ok_or(ConsoleError::Closed)
    }

    fn clear(&mut self) {}
}
