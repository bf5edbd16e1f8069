use std::fmt;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Internal failures (parse, lookup, launch) are reported as 1.
pub type ExitCode = i32;

/// A single shell word as produced by the lexer.
///
/// There is no separate token kind for the pipe operator: the parser
/// recognizes it by its literal value, see [`PIPE`].
pub type Token = String;

/// Literal token that separates pipeline stages.
pub const PIPE: &str = "|";

/// One command of a pipeline: the program name followed by its arguments.
///
/// An `ArgVector` is never empty, so [`ArgVector::name`] always has a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgVector(Vec<Token>);

impl ArgVector {
    /// Wrap `words`, returning `None` when there is no command name.
    pub fn new(words: Vec<Token>) -> Option<Self> {
        if words.is_empty() {
            None
        } else {
            Some(Self(words))
        }
    }

    /// The command name, `argv[0]`.
    pub fn name(&self) -> &str {
        &self.0[0]
    }

    /// Everything after the command name.
    pub fn args(&self) -> &[Token] {
        &self.0[1..]
    }

    pub fn words(&self) -> &[Token] {
        &self.0
    }
}

impl fmt::Display for ArgVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// Ordered, non-empty chain of commands connected by pipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline(Vec<ArgVector>);

impl Pipeline {
    /// Wrap `stages`, returning `None` for an empty list.
    pub fn new(stages: Vec<ArgVector>) -> Option<Self> {
        if stages.is_empty() {
            None
        } else {
            Some(Self(stages))
        }
    }

    pub fn stages(&self) -> &[ArgVector] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The single command of a one-stage pipeline.
    pub fn as_single(&self) -> Option<&ArgVector> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", PIPE)?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}
