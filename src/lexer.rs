//! Lexical analysis (tokenization) of one input line into shell words.

use crate::command::{PIPE, Token};
use std::fmt;

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexingError {
    /// A closing quote was not found. `position` is the character index of
    /// the opening quote.
    UnfinishedQuote { quote: char, position: usize },
}

impl fmt::Display for LexingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexingError::UnfinishedQuote { quote, position } => {
                write!(f, "unterminated quote {} at position {}", quote, position)
            }
        }
    }
}

impl std::error::Error for LexingError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    quote_start: usize,
}

fn is_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            quote_start: 0,
        }
    }

    /// Runs the machine over the whole input.
    ///
    /// Single quotes are dropped from the emitted word while double quotes
    /// are kept verbatim; `|` outside quotes always forms its own token.
    fn make_tokens(&mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch, &mut out),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote => Err(LexingError::UnfinishedQuote {
                quote: '\'',
                position: self.quote_start,
            }),
            LexingState::ReadingDoubleQuote => Err(LexingError::UnfinishedQuote {
                quote: '"',
                position: self.quote_start,
            }),
            LexingState::ReadingWord => {
                self.finish_word(&mut out);
                Ok(out)
            }
            LexingState::Start => Ok(out),
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn open_quote(&mut self, quote: char) {
        self.quote_start = self.pos - 1;
        if quote == '"' {
            self.buffer.push(quote);
            self.state = LexingState::ReadingDoubleQuote;
        } else {
            self.state = LexingState::ReadingSingleQuote;
        }
    }

    fn finish_word(&mut self, out: &mut Vec<Token>) {
        out.push(std::mem::take(&mut self.buffer));
        self.state = LexingState::Start;
    }

    fn handle_start(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            c if is_separator(c) => {}
            '|' => out.push(PIPE.to_string()),
            '\'' | '"' => self.open_quote(ch),
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            c if is_separator(c) => self.finish_word(out),
            '|' => {
                self.finish_word(out);
                out.push(PIPE.to_string());
            }
            '\'' | '"' => self.open_quote(ch),
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        self.buffer.push(ch);
        if ch == '"' {
            self.state = LexingState::ReadingWord;
        }
    }
}

/// The main entry point function to perform lexical analysis.
///
/// Returns an empty vector for a blank line (only spaces, tabs, `\r`, `\n`).
///
/// ```
/// use pipesh::lexer::split_into_tokens;
/// let tokens = split_into_tokens("echo 'a b' | wc -c").unwrap();
/// assert_eq!(tokens, ["echo", "a b", "|", "wc", "-c"]);
/// ```
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    let mut lexer = LexingFSM::new(line);
    lexer.make_tokens()
}
