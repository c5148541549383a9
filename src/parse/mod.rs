pub mod ast;
mod error;
mod lexer;
mod parser;
pub mod stringify;
pub mod visit;

use crate::arena::{Arena, NodeId};
use crate::config::Features;
use crate::error::DiceError;

pub use error::{ParseError, ParseErrorKind};
pub use lexer::TokenKind;
pub use parser::{MAX_NESTING, MAX_TREE_HEIGHT};

/// Parses `s` into `arena`, returning the root node.
pub(crate) fn parse(s: &str, arena: &mut Arena, features: Features) -> Result<NodeId, DiceError> {
    parser::Parser::new(s, arena, features).parse()
}
