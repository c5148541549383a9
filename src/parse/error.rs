use super::lexer::TokenKind;
use crate::config::Features;
use std::fmt;
use std::ops::Range;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("error at position {} ({slice:?}): {kind}", .span.start)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Range<usize>,
    pub slice: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    UnexpectedToken {
        found: Option<TokenKind>,
        expected: Vec<TokenKind>,
    },
    InvalidCharacter,
    TrailingInput,
    IntegerOutOfRange,
    ExpectedSides,
    MissingComparisonValue(char),
    EmptyCustomDie,
    EmptyAnnotation,
    ModifierOnCustomDie,
    NestingTooDeep,
    FeatureDisabled(Features),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { found, expected } => {
                match found {
                    Some(found) => write!(f, "unexpected token {}, expected ", found)?,
                    None => write!(f, "unexpected end of input, expected ")?,
                }
                fmt_expected(expected, f)
            }
            Self::InvalidCharacter => write!(f, "invalid character"),
            Self::TrailingInput => write!(f, "unexpected characters at end of expression"),
            Self::IntegerOutOfRange => write!(f, "integer literal is out of range"),
            Self::ExpectedSides => write!(
                f,
                "expected number of sides, custom die name, or custom die definition after 'd'"
            ),
            Self::MissingComparisonValue(modifier) => write!(
                f,
                "missing comparison value after '{}' comparison operator",
                modifier
            ),
            Self::EmptyCustomDie => write!(f, "empty custom die definition"),
            Self::EmptyAnnotation => write!(f, "annotations cannot be empty"),
            Self::ModifierOnCustomDie => write!(f, "modifiers cannot be applied to custom dice"),
            Self::NestingTooDeep => write!(f, "expression is nested too deeply"),
            Self::FeatureDisabled(features) => {
                write!(f, "syntax requires the {} feature, which is disabled", features)
            }
        }
    }
}

fn fmt_expected(expected: &[TokenKind], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let len = expected.len();

    if expected.is_empty() {
        Ok(())
    } else if len == 1 {
        f.write_str(expected[0].as_str())
    } else if len == 2 {
        write!(f, "{} or {}", expected[0], expected[1])
    } else {
        for exp in &expected[..len - 1] {
            write!(f, "{}, ", exp)?;
        }
        write!(f, "or {}", expected[len - 1])
    }
}
