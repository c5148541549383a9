use crate::common::{BinaryOperator, Comparison};
use logos::{Logos, Span};
use std::fmt;

/// Lexes `s` into tokens paired with their byte spans. Whitespace is skipped.
pub fn tokenize(s: &str) -> Vec<(TokenKind, Span)> {
    TokenKind::lexer(s).spanned().collect()
}

#[derive(Logos, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TokenKind {
    #[regex(r"[0-9]+")]
    Integer,
    /// A single letter. Modifiers and names are assembled from adjacent letters by the parser.
    #[regex(r"[A-Za-z_]")]
    Letter,
    #[regex(r#""[^"]*""#)]
    Label,
    #[regex(r"\[[^\]]*\]")]
    Annotation,

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("!")]
    Bang,

    #[token(">=")]
    GreaterEqual,
    #[token("<=")]
    LessEqual,
    #[token("<>")]
    LessGreater,
    #[token("==")]
    EqualEqual,
    #[token("=")]
    Equal,
    #[token(">")]
    Greater,
    #[token("<")]
    Less,

    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    #[error]
    Error,
}

impl TokenKind {
    pub const ADDITION_OPS: &'static [Self] = &[Self::Plus, Self::Minus];

    pub const MULTIPLICATION_OPS: &'static [Self] = &[Self::Star, Self::Slash];

    pub const COMPARISON_OPS: &'static [Self] = &[
        Self::GreaterEqual,
        Self::LessEqual,
        Self::LessGreater,
        Self::EqualEqual,
        Self::Equal,
        Self::Greater,
        Self::Less,
    ];

    pub fn as_str(&self) -> &'static str {
        use TokenKind::*;

        match self {
            Integer => "<integer>",
            Letter => "<letter>",
            Label => "<label>",
            Annotation => "<annotation>",
            LeftParen => "'('",
            RightParen => "')'",
            LeftBrace => "'{'",
            RightBrace => "'}'",
            Comma => "','",
            Colon => "':'",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            Bang => "'!'",
            GreaterEqual => "'>='",
            LessEqual => "'<='",
            LessGreater => "'<>'",
            EqualEqual => "'=='",
            Equal => "'='",
            Greater => "'>'",
            Less => "'<'",
            Error => "<error>",
        }
    }

    pub fn as_binary_op(&self) -> Option<BinaryOperator> {
        use BinaryOperator::*;
        Some(match self {
            Self::Plus => Add,
            Self::Minus => Sub,
            Self::Star => Mul,
            Self::Slash => Div,
            _ => return None,
        })
    }

    pub fn as_comparison(&self) -> Option<Comparison> {
        use Comparison::*;
        Some(match self {
            Self::GreaterEqual => Ge,
            Self::LessEqual => Le,
            Self::LessGreater => Ne,
            Self::EqualEqual | Self::Equal => Eq,
            Self::Greater => Gt,
            Self::Less => Lt,
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use TokenKind::*;

    fn kinds(s: &str) -> Vec<TokenKind> {
        tokenize(s).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn test_lex_dice() {
        assert_eq!(kinds("4d6kh3"), vec![Integer, Letter, Integer, Letter, Letter, Integer]);
        assert_eq!(kinds("1dF"), vec![Integer, Letter, Letter]);
        assert_eq!(kinds("d20 + 5"), vec![Letter, Integer, Plus, Integer]);
    }

    #[test]
    fn test_lex_comparisons() {
        assert_eq!(kinds("s>=4"), vec![Letter, GreaterEqual, Integer]);
        assert_eq!(kinds("r<>3"), vec![Letter, LessGreater, Integer]);
        assert_eq!(kinds("r==1"), vec![Letter, EqualEqual, Integer]);
        assert_eq!(kinds("< > ="), vec![Less, Greater, Equal]);
    }

    #[test]
    fn test_lex_custom() {
        assert_eq!(
            kinds(r#"1d{0:"Skull", -1}"#),
            vec![
                Integer, Letter, LeftBrace, Integer, Colon, Label, Comma, Minus, Integer,
                RightBrace
            ]
        );
    }

    #[test]
    fn test_lex_spans_and_errors() {
        let tokens = tokenize("2 d6 [fire] ?");
        assert_eq!(tokens[0], (Integer, 0..1));
        assert_eq!(tokens[1], (Letter, 2..3));
        assert_eq!(tokens[2], (Integer, 3..4));
        assert_eq!(tokens[3], (Annotation, 5..11));
        assert_eq!(tokens[4], (Error, 12..13));
    }

    #[test]
    fn test_token_helpers() {
        assert_eq!(Star.as_binary_op(), Some(BinaryOperator::Mul));
        assert_eq!(Bang.as_binary_op(), None);
        assert_eq!(LessGreater.as_comparison(), Some(Comparison::Ne));
        assert_eq!(Equal.as_comparison(), EqualEqual.as_comparison());
        assert_eq!(LeftParen.to_string(), "'('");
    }
}
