use crate::lexer::LexingError;
use crate::parser::ParsingError;
use std::fmt;
use std::io;

/// Every way running one input line can fail.
///
/// All variants are recoverable: the interpreter prints the message, sets the
/// last result to 1 and keeps reading input.
#[derive(Debug)]
pub enum ShellError {
    /// Malformed quoting.
    Lexing(LexingError),
    /// Malformed pipeline structure.
    Parsing(ParsingError),
    /// The name is neither a builtin nor an executable on `PATH`.
    NotFound { command: String },
    /// The child process could not be started.
    Launch { command: String, source: io::Error },
    /// The child process could not be waited on.
    Wait { command: String, source: io::Error },
    /// A builtin was called with arguments it does not accept.
    Usage { command: String, message: String },
    /// Writing builtin output failed.
    Io(io::Error),
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::Lexing(e) => write!(f, "{}", e),
            ShellError::Parsing(e) => write!(f, "{}", e),
            ShellError::NotFound { command } => write!(f, "{}: command not found", command),
            ShellError::Launch { command, source } => {
                write!(f, "{}: failed starting command: {}", command, source)
            }
            ShellError::Wait { command, source } => write!(f, "{}: failed: {}", command, source),
            ShellError::Usage { command, message } => {
                write!(f, "{}: {}", command, message.trim_end())
            }
            ShellError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ShellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShellError::Lexing(e) => Some(e),
            ShellError::Parsing(e) => Some(e),
            ShellError::Launch { source, .. } | ShellError::Wait { source, .. } => Some(source),
            ShellError::Io(e) => Some(e),
            ShellError::NotFound { .. } | ShellError::Usage { .. } => None,
        }
    }
}

impl From<LexingError> for ShellError {
    fn from(e: LexingError) -> Self {
        ShellError::Lexing(e)
    }
}

impl From<ParsingError> for ShellError {
    fn from(e: ParsingError) -> Self {
        ShellError::Parsing(e)
    }
}

impl From<io::Error> for ShellError {
    fn from(e: io::Error) -> Self {
        ShellError::Io(e)
    }
}
