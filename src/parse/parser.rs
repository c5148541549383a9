use super::ast::*;
use super::error::{ParseError, ParseErrorKind};
use super::lexer::{tokenize, TokenKind};
use crate::arena::{Arena, NodeId};
use crate::common::*;
use crate::config::Features;
use crate::error::DiceError;
use crate::roll::custom::{CustomDie, Face};
use logos::Span;

type PResult<T = NodeId> = Result<T, DiceError>;

/// Deepest chain of nested groups and unary operators the parser will descend into.
pub const MAX_NESTING: usize = 256;

/// Tallest AST the parser will build. Evaluation and traversal recurse once per level.
pub const MAX_TREE_HEIGHT: u32 = 512;

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(TokenKind, Span)>,
    pos: usize,
    arena: &'a mut Arena,
    features: Features,
    depth: usize,
    /// Height of every node allocated by this parser, indexed from `base`.
    heights: Vec<u32>,
    base: u32,
}

impl<'a> Parser<'a> {
    const PRIMARY_START: &'static [TokenKind] =
        &[TokenKind::Integer, TokenKind::Letter, TokenKind::LeftParen];

    pub fn new(source: &'a str, arena: &'a mut Arena, features: Features) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
            base: arena.len() as u32,
            arena,
            features,
            depth: 0,
            heights: Vec::new(),
        }
    }

    pub fn parse(mut self) -> PResult {
        let root = self.parse_sum()?;
        match self.peek() {
            None => Ok(root),
            Some(TokenKind::Error) => Err(self.error_here(ParseErrorKind::InvalidCharacter)),
            Some(_) => {
                let span = self.span_at(self.pos).start..self.source.len();
                Err(self.error(ParseErrorKind::TrailingInput, span))
            }
        }
    }

    fn peek(&self) -> Option<TokenKind> {
        self.peek_at(self.pos)
    }

    fn peek_at(&self, i: usize) -> Option<TokenKind> {
        self.tokens.get(i).map(|(kind, _)| *kind)
    }

    fn span_at(&self, i: usize) -> Span {
        match self.tokens.get(i) {
            Some((_, span)) => span.clone(),
            None => self.source.len()..self.source.len(),
        }
    }

    fn matches(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn matches_any(&self, options: &[TokenKind]) -> bool {
        self.peek().map_or(false, |peeked| options.contains(&peeked))
    }

    fn consume(&mut self, expected: TokenKind) -> PResult<Span> {
        if self.matches(expected) {
            let span = self.span_at(self.pos);
            self.pos += 1;
            Ok(span)
        } else {
            Err(self.unexpected_token(vec![expected]))
        }
    }

    fn consume_op(&mut self, options: &[TokenKind]) -> Option<BinaryOperator> {
        if !self.matches_any(options) {
            return None;
        }
        let op = self.peek()?.as_binary_op()?;
        self.pos += 1;
        Some(op)
    }

    /// Lowercased letter at token `i`, if that token is a letter.
    fn letter_at(&self, i: usize) -> Option<char> {
        match self.tokens.get(i) {
            Some((TokenKind::Letter, span)) => self.source[span.clone()]
                .chars()
                .next()
                .map(|c| c.to_ascii_lowercase()),
            _ => None,
        }
    }

    /// Whether token `i` directly follows token `i - 1` with no whitespace between.
    fn adjacent(&self, i: usize) -> bool {
        match (i.checked_sub(1).and_then(|j| self.tokens.get(j)), self.tokens.get(i)) {
            (Some((_, prev)), Some((_, next))) => prev.end == next.start,
            _ => false,
        }
    }

    fn adjacent_letter(&self) -> Option<char> {
        if self.adjacent(self.pos) {
            self.letter_at(self.pos)
        } else {
            None
        }
    }

    /// The run of adjacent letters and digits starting at token `start`, and its token length.
    fn identifier_at(&self, start: usize) -> (&'a str, usize) {
        let mut end = start;
        while matches!(
            self.peek_at(end),
            Some(TokenKind::Letter | TokenKind::Integer)
        ) && (end == start || self.adjacent(end))
        {
            end += 1;
        }
        if end == start {
            return ("", 0);
        }
        let span = self.span_at(start).start..self.span_at(end - 1).end;
        (&self.source[span], end - start)
    }

    fn error(&self, kind: ParseErrorKind, span: Span) -> DiceError {
        ParseError {
            kind,
            slice: self.source[span.clone()].to_string(),
            span,
        }
        .into()
    }

    fn error_here(&self, kind: ParseErrorKind) -> DiceError {
        self.error(kind, self.span_at(self.pos))
    }

    fn unexpected_token(&self, expected: Vec<TokenKind>) -> DiceError {
        match self.peek() {
            Some(TokenKind::Error) => self.error_here(ParseErrorKind::InvalidCharacter),
            found => self.error_here(ParseErrorKind::UnexpectedToken { found, expected }),
        }
    }

    fn require(&self, feature: Features) -> PResult<()> {
        if self.features.contains(feature) {
            Ok(())
        } else {
            Err(self.error_here(ParseErrorKind::FeatureDisabled(feature)))
        }
    }

    fn height(&self, id: NodeId) -> u32 {
        id.index()
            .checked_sub(self.base)
            .and_then(|i| self.heights.get(i as usize))
            .copied()
            .unwrap_or(0)
    }

    fn alloc(&mut self, node: impl Into<Node>) -> PResult {
        let node = node.into();
        let height = 1 + node
            .children()
            .into_iter()
            .map(|child| self.height(child))
            .max()
            .unwrap_or(0);
        if height > MAX_TREE_HEIGHT {
            return Err(self.error_here(ParseErrorKind::NestingTooDeep));
        }

        let id = self.arena.alloc(node)?;
        self.heights.push(height);
        Ok(id)
    }

    fn parse_sum(&mut self) -> PResult {
        let mut lhs = self.parse_product()?;

        while let Some(op) = self.consume_op(TokenKind::ADDITION_OPS) {
            let rhs = self.parse_product()?;
            lhs = self.alloc(BinaryOp {
                op,
                left: lhs,
                right: rhs,
            })?;
        }

        Ok(lhs)
    }

    fn parse_product(&mut self) -> PResult {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = self.consume_op(TokenKind::MULTIPLICATION_OPS) {
            let rhs = self.parse_unary()?;
            lhs = self.alloc(BinaryOp {
                op,
                left: lhs,
                right: rhs,
            })?;
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult {
        if self.depth == MAX_NESTING {
            return Err(self.error_here(ParseErrorKind::NestingTooDeep));
        }
        self.depth += 1;
        let result = self.parse_unary_inner();
        self.depth -= 1;
        result
    }

    fn parse_unary_inner(&mut self) -> PResult {
        match self.peek() {
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            Some(TokenKind::Minus) => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                let zero = self.alloc(Literal { value: 0 })?;
                self.alloc(BinaryOp {
                    op: BinaryOperator::Sub,
                    left: zero,
                    right: operand,
                })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> PResult {
        let atom = match self.peek() {
            Some(TokenKind::LeftParen) => {
                let group = self.parse_group()?;
                if self.letter_at(self.pos) == Some('d') {
                    self.parse_dice(Some(group))?
                } else {
                    group
                }
            }
            Some(TokenKind::Integer) => {
                let value = self.parse_integer()?;
                if self.letter_at(self.pos) == Some('d') {
                    self.parse_dice(Some(value))?
                } else {
                    value
                }
            }
            Some(TokenKind::Letter) => self.parse_word()?,
            _ => return Err(self.unexpected_token(Self::PRIMARY_START.to_vec())),
        };

        self.parse_annotations(atom)
    }

    fn parse_group(&mut self) -> PResult {
        self.consume(TokenKind::LeftParen)?;
        let inner = self.parse_sum()?;
        self.consume(TokenKind::RightParen)?;
        Ok(inner)
    }

    fn parse_integer_value(&mut self) -> PResult<Int> {
        let span = self.consume(TokenKind::Integer)?;
        self.source[span.clone()]
            .parse()
            .map_err(|_| self.error(ParseErrorKind::IntegerOutOfRange, span))
    }

    fn parse_integer(&mut self) -> PResult {
        let value = self.parse_integer_value()?;
        self.alloc(Literal { value })
    }

    /// A primary starting with a letter: either a function call or a count-less dice term.
    fn parse_word(&mut self) -> PResult {
        let (name, len) = self.identifier_at(self.pos);
        let after = self.pos + len;
        if self.peek_at(after) == Some(TokenKind::LeftParen)
            && self.adjacent(after)
            && !name.eq_ignore_ascii_case("d")
        {
            self.pos = after;
            return self.parse_call(name);
        }

        if self.letter_at(self.pos) == Some('d') {
            self.parse_dice(None)
        } else {
            Err(self.unexpected_token(Self::PRIMARY_START.to_vec()))
        }
    }

    fn parse_call(&mut self, name: &str) -> PResult {
        self.consume(TokenKind::LeftParen)?;
        let mut args = Vec::new();
        if !self.matches(TokenKind::RightParen) {
            args.push(self.parse_sum()?);
            while self.matches(TokenKind::Comma) {
                self.pos += 1;
                args.push(self.parse_sum()?);
            }
        }
        self.consume(TokenKind::RightParen)?;

        self.alloc(FunctionCall {
            name: name.to_string(),
            args,
        })
    }

    /// A dice term from its `d` onwards. `count` is `None` when the term starts with `d`.
    fn parse_dice(&mut self, count: Option<NodeId>) -> PResult {
        if self.letter_at(self.pos) != Some('d') {
            return Err(self.unexpected_token(vec![TokenKind::Letter]));
        }
        self.require(Features::BASIC)?;
        self.pos += 1;

        let kind = match self.peek() {
            Some(TokenKind::LeftBrace) => {
                let die = self.parse_custom_die()?;
                self.reject_modifier()?;
                DiceKind::Custom(CustomRef::Inline(die))
            }
            Some(TokenKind::Letter) => {
                let (name, len) = self.identifier_at(self.pos);
                self.pos += len;
                self.reject_modifier()?;
                DiceKind::Custom(CustomRef::Named(name.to_string()))
            }
            Some(TokenKind::Integer) => {
                let sides = self.parse_integer()?;
                self.parse_modifier(sides)?
            }
            Some(TokenKind::LeftParen) => {
                let sides = self.parse_group()?;
                self.parse_modifier(sides)?
            }
            _ => return Err(self.error_here(ParseErrorKind::ExpectedSides)),
        };

        self.alloc(DiceOp { count, kind })
    }

    fn is_modifier_start(&self) -> bool {
        self.matches(TokenKind::Bang)
            || matches!(
                self.letter_at(self.pos),
                Some('k' | 'h' | 'l' | 'd' | 's' | 'r')
            )
    }

    fn reject_modifier(&self) -> PResult<()> {
        if self.is_modifier_start() {
            Err(self.error_here(ParseErrorKind::ModifierOnCustomDie))
        } else {
            Ok(())
        }
    }

    fn parse_modifier(&mut self, sides: NodeId) -> PResult<DiceKind> {
        if self.matches(TokenKind::Bang) {
            self.require(Features::EXPLODING)?;
            self.pos += 1;
            return Ok(DiceKind::Exploding { sides });
        }

        let selection = match self.letter_at(self.pos) {
            Some('k') => {
                self.require(Features::KEEP_DROP)?;
                self.pos += 1;
                let select_high = match self.adjacent_letter() {
                    Some('h') => {
                        self.pos += 1;
                        true
                    }
                    Some('l') => {
                        self.pos += 1;
                        false
                    }
                    _ => true,
                };
                self.parse_count_selection(select_high, false)?
            }
            Some(c @ ('h' | 'l')) => {
                self.require(Features::KEEP_DROP)?;
                self.pos += 1;
                self.parse_count_selection(c == 'h', false)?
            }
            Some('d') => {
                self.require(Features::KEEP_DROP)?;
                self.pos += 1;
                // `select_high` names the end that survives the drop
                let select_high = match self.adjacent_letter() {
                    Some('h') => {
                        self.pos += 1;
                        false
                    }
                    Some('l') => {
                        self.pos += 1;
                        true
                    }
                    _ => true,
                };
                self.parse_count_selection(select_high, true)?
            }
            Some('s') => {
                self.require(Features::POOL)?;
                self.pos += 1;
                Selection::Conditional(self.parse_condition('s')?)
            }
            Some('r') => {
                self.require(Features::KEEP_DROP)?;
                self.pos += 1;
                Selection::Reroll(self.parse_condition('r')?)
            }
            _ => return Ok(DiceKind::Basic { sides }),
        };

        Ok(DiceKind::Filter { sides, selection })
    }

    fn parse_count_selection(&mut self, select_high: bool, is_drop: bool) -> PResult<Selection> {
        let count = match self.peek() {
            Some(TokenKind::Integer) => self.parse_integer()?,
            Some(TokenKind::LeftParen) => self.parse_group()?,
            _ => self.alloc(Literal { value: 1 })?,
        };
        Ok(Selection::Count {
            count,
            select_high,
            is_drop,
        })
    }

    fn parse_condition(&mut self, modifier: char) -> PResult<Condition> {
        let op = self.peek().and_then(|kind| kind.as_comparison());
        if op.is_some() {
            self.pos += 1;
        }

        let threshold = if self.matches(TokenKind::Integer) {
            Some(self.parse_integer_value()?)
        } else {
            None
        };

        match (op, threshold) {
            (op, Some(threshold)) => Ok(Condition::new(op.unwrap_or(Comparison::Eq), threshold)),
            (None, None) => Ok(Condition::new(Comparison::Eq, 1)),
            (Some(_), None) => Err(self.error_here(ParseErrorKind::MissingComparisonValue(modifier))),
        }
    }

    fn parse_custom_die(&mut self) -> PResult<CustomDie> {
        self.consume(TokenKind::LeftBrace)?;
        if self.matches(TokenKind::RightBrace) {
            return Err(self.error_here(ParseErrorKind::EmptyCustomDie));
        }

        let mut faces = NonEmpty::new(self.parse_face(0)?);
        loop {
            match self.peek() {
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                    if self.matches(TokenKind::RightBrace) {
                        self.pos += 1;
                        break;
                    }
                    let face = self.parse_face(faces.len())?;
                    faces.push(face);
                }
                Some(TokenKind::RightBrace) => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected_token(vec![TokenKind::Comma, TokenKind::RightBrace])),
            }
        }

        Ok(CustomDie::inline(faces))
    }

    /// One side of an inline die. A bare label takes its 1-based position as the value.
    fn parse_face(&mut self, index: usize) -> PResult<Face> {
        if self.matches(TokenKind::Label) {
            let label = self.parse_label()?;
            return Ok(Face::labeled(index as Int + 1, label));
        }

        let negative = match self.peek() {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                true
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                false
            }
            Some(TokenKind::Integer) => false,
            _ => {
                return Err(self.unexpected_token(vec![
                    TokenKind::Integer,
                    TokenKind::Minus,
                    TokenKind::Label,
                ]))
            }
        };
        let magnitude = self.parse_integer_value()?;
        let value = if negative { -magnitude } else { magnitude };

        if self.matches(TokenKind::Colon) {
            self.pos += 1;
            let label = self.parse_label()?;
            Ok(Face::labeled(value, label))
        } else {
            Ok(Face::new(value))
        }
    }

    fn parse_label(&mut self) -> PResult<String> {
        let span = self.consume(TokenKind::Label)?;
        let quoted = &self.source[span];
        Ok(quoted[1..quoted.len() - 1].to_string())
    }

    fn parse_annotations(&mut self, mut node: NodeId) -> PResult {
        while self.matches(TokenKind::Annotation) {
            let span = self.consume(TokenKind::Annotation)?;
            let text = &self.source[span.clone()];
            let content = text[1..text.len() - 1].trim();
            if content.is_empty() {
                return Err(self.error(ParseErrorKind::EmptyAnnotation, span));
            }

            let (key, value) = match content.split_once(':') {
                Some((key, value)) => (key.trim().to_string(), Some(value.trim().to_string())),
                None => (content.to_string(), None),
            };
            node = self.alloc(Annotation {
                key,
                value,
                child: node,
            })?;
        }
        Ok(node)
    }
}
