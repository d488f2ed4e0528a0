use std::fmt;
use std::io;

/// A position in a text i.e. a `line` number starting from 0, a `column` number starting from 0 (in number of code points) and a global file `offset` starting from 0 (in number of bytes).
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct TextPosition {
    pub line: u64,
    pub column: u64,
    pub offset: u64,
}

/// An error in the syntax of the parsed file.
///
/// It is composed of a message and the position in the input where the error was detected.
#[derive(Debug, thiserror::Error)]
pub struct TurtleSyntaxError {
    position: TextPosition,
    message: String,
}

impl TurtleSyntaxError {
    pub(crate) fn new(position: TextPosition, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    /// The position of the error inside of the file.
    #[inline]
    pub fn position(&self) -> TextPosition {
        self.position
    }

    /// The error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TurtleSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parser error at line {} column {}: {}",
            self.position.line + 1,
            self.position.column + 1,
            self.message
        )
    }
}

impl From<TurtleSyntaxError> for io::Error {
    #[inline]
    fn from(error: TurtleSyntaxError) -> Self {
        Self::new(io::ErrorKind::InvalidData, error)
    }
}
