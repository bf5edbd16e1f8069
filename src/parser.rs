//! Splitting a token stream into pipeline stages.

use crate::command::{ArgVector, PIPE, Pipeline, Token};
use std::fmt;

/// Errors that can occur while building a [`Pipeline`] from tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    /// A stage has no words: a leading or trailing `|`, or two `|` in a row.
    /// `stage` is the zero-based position of the empty stage.
    EmptyCommand { stage: usize },
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsingError::EmptyCommand { stage } => {
                write!(f, "syntax error: empty command at pipeline stage {}", stage + 1)
            }
        }
    }
}

impl std::error::Error for ParsingError {}

struct PipelineBuilder {
    stages: Vec<ArgVector>,
    current: Vec<Token>,
}

impl PipelineBuilder {
    fn new() -> Self {
        Self {
            stages: Vec::new(),
            current: Vec::new(),
        }
    }

    fn close_stage(&mut self) -> Result<(), ParsingError> {
        let words = std::mem::take(&mut self.current);
        let stage = self.stages.len();
        let argv = ArgVector::new(words).ok_or(ParsingError::EmptyCommand { stage })?;
        self.stages.push(argv);
        Ok(())
    }

    fn build(mut self, tokens: Vec<Token>) -> Result<Option<Pipeline>, ParsingError> {
        if tokens.is_empty() {
            return Ok(None);
        }
        for token in tokens {
            if token == PIPE {
                self.close_stage()?;
            } else {
                self.current.push(token);
            }
        }
        self.close_stage()?;
        Ok(Pipeline::new(self.stages))
    }
}

/// Partition `tokens` into pipeline stages at every `|` token.
///
/// Returns `Ok(None)` when there are no tokens at all, meaning there is
/// nothing to execute.
pub fn split_pipeline(tokens: Vec<Token>) -> Result<Option<Pipeline>, ParsingError> {
    PipelineBuilder::new().build(tokens)
}
