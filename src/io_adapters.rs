use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, Write};

/// Outcome of asking for one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A line, with or without its trailing newline.
    Line(String),
    /// The user interrupted the prompt (Ctrl-C); the line is discarded.
    Interrupted,
    /// No more input.
    Eof,
}

/// Source of input lines for the interactive loop.
pub trait LineReader {
    /// Show `prompt` and read one line.
    fn read_line(&mut self, prompt: &str) -> Result<Input>;
}

/// Terminal reader backed by [`rustyline`].
///
/// Lines are not added to the editor history.
pub struct EditorReader {
    editor: DefaultEditor,
}

impl EditorReader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineReader for EditorReader {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Input::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(err) => Err(err.into()),
        }
    }
}

/// Reader for non-interactive input (pipes, files, tests).
///
/// The prompt is written to `prompt_out` before every line.
pub struct StreamReader<R, W> {
    input: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> StreamReader<R, W> {
    pub fn new(input: R, prompt_out: W) -> Self {
        Self { input, prompt_out }
    }

    pub fn into_prompt_out(self) -> W {
        self.prompt_out
    }
}

impl<R: BufRead, W: Write> LineReader for StreamReader<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        self.prompt_out.write_all(prompt.as_bytes())?;
        self.prompt_out.flush()?;

        let mut line = String::new();
        match self.input.read_line(&mut line)? {
            0 => Ok(Input::Eof),
            _ => Ok(Input::Line(line)),
        }
    }
}
