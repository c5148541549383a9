use crate::arena::ArenaError;
use crate::common::{Condition, UInt};
use crate::parse::ParseError;
use std::fmt;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DiceError {
    #[error("{0}")]
    Syntax(#[from] ParseError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Arithmetic(String),
    #[error("{0}")]
    Resource(#[from] ArenaError),
    #[error("Reroll limit of {limit} attempts exceeded for d{sides} while {condition}")]
    SafetyLimit {
        limit: usize,
        sides: UInt,
        condition: Condition,
    },
    #[error("Function calls not yet supported: {0}")]
    Unsupported(String),
}

impl DiceError {
    pub fn validation(msg: impl ToString) -> Self {
        Self::Validation(msg.to_string())
    }

    pub fn arithmetic(msg: impl ToString) -> Self {
        Self::Arithmetic(msg.to_string())
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax(_) => ErrorKind::Syntax,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Arithmetic(_) => ErrorKind::Arithmetic,
            Self::Resource(_) => ErrorKind::Resource,
            Self::SafetyLimit { .. } => ErrorKind::SafetyLimit,
            Self::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    pub const fn code(&self) -> i32 {
        self.kind().code()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    Syntax,
    Validation,
    Arithmetic,
    Resource,
    SafetyLimit,
    Unsupported,
}

impl ErrorKind {
    /// Stable numeric code for collaborators that report errors as integers. Zero means no error.
    pub const fn code(self) -> i32 {
        match self {
            Self::Syntax => 1,
            Self::Validation => 2,
            Self::Arithmetic => 3,
            Self::Resource => 4,
            Self::SafetyLimit => 5,
            Self::Unsupported => 6,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Syntax => "syntax error",
            Self::Validation => "validation error",
            Self::Arithmetic => "arithmetic error",
            Self::Resource => "resource error",
            Self::SafetyLimit => "safety limit exceeded",
            Self::Unsupported => "unsupported operation",
        };
        f.write_str(s)
    }
}

/// Single-slot record of the most recent failure. A new error replaces the old one.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ErrorState {
    last: Option<DiceError>,
}

impl ErrorState {
    pub fn record(&mut self, error: DiceError) {
        self.last = Some(error);
    }

    pub fn has_error(&self) -> bool {
        self.last.is_some()
    }

    pub fn error(&self) -> Option<&DiceError> {
        self.last.as_ref()
    }

    pub fn message(&self) -> Option<String> {
        self.last.as_ref().map(ToString::to_string)
    }

    pub fn code(&self) -> i32 {
        self.last.as_ref().map_or(0, DiceError::code)
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_state_overwrites() {
        let mut state = ErrorState::default();
        assert!(!state.has_error());
        assert_eq!(state.code(), 0);

        state.record(DiceError::validation("first"));
        state.record(DiceError::arithmetic("Division by zero"));
        assert!(state.has_error());
        assert_eq!(state.message().as_deref(), Some("Division by zero"));
        assert_eq!(state.code(), ErrorKind::Arithmetic.code());

        state.clear();
        assert!(!state.has_error());
        assert_eq!(state.message(), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(DiceError::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(
            DiceError::Unsupported("max".into()).to_string(),
            "Function calls not yet supported: max"
        );
    }
}
