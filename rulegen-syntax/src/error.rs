use thiserror::Error;

/// A BUILD file could not be read. Positions are 1-based.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{line}:{col}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            col,
            message: message.into(),
        }
    }
}
