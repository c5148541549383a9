use super::ast::{self, CustomRef, DiceKind};
use super::visit::AstVisitor;
use crate::arena::NodeId;
use std::fmt::Write;

const INDENT: &str = "  ";

/// Renders an indented dump of an AST, one block per node.
///
/// ```text
/// DICE_OP {
///   dice_type: FILTER
///   selection: keep (high)
///   LITERAL {
///     value: 4
///   }
///   ...
/// }
/// ```
#[derive(Debug, Default)]
pub struct TreePrinter {
    out: String,
}

impl TreePrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, depth: usize, text: impl std::fmt::Display) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        let _ = writeln!(self.out, "{}", text);
    }
}

impl AstVisitor for TreePrinter {
    fn enter_node(&mut self, _id: NodeId, node: &ast::Node, depth: usize) {
        self.line(depth, format_args!("{} {{", node.kind_name()));
    }

    fn exit_node(&mut self, _id: NodeId, _node: &ast::Node, depth: usize) {
        self.line(depth, "}");
    }

    fn visit_literal(&mut self, lit: &ast::Literal, depth: usize) {
        self.line(depth + 1, format_args!("value: {}", lit.value));
    }

    fn visit_binary(&mut self, op: &ast::BinaryOp, depth: usize) {
        self.line(depth + 1, format_args!("operator: {}", op.op));
    }

    fn visit_dice(&mut self, dice: &ast::DiceOp, depth: usize) {
        self.line(depth + 1, format_args!("dice_type: {}", dice.dice_type()));
        match &dice.kind {
            DiceKind::Filter { selection, .. } => {
                self.line(depth + 1, format_args!("selection: {}", selection));
            }
            DiceKind::Custom(CustomRef::Named(name)) => {
                self.line(depth + 1, format_args!("custom_name: {}", name));
            }
            DiceKind::Custom(CustomRef::Inline(die)) => {
                let faces: Vec<_> = die.faces.iter().map(|f| f.value.to_string()).collect();
                self.line(depth + 1, format_args!("faces: {}", faces.join(", ")));
            }
            DiceKind::Basic { .. } | DiceKind::Exploding { .. } => {}
        }
    }

    fn visit_call(&mut self, call: &ast::FunctionCall, depth: usize) {
        self.line(depth + 1, format_args!("function: {}", call.name));
    }

    fn visit_annotation(&mut self, annotation: &ast::Annotation, depth: usize) {
        match &annotation.value {
            Some(value) => self.line(depth + 1, format_args!("{}: {}", annotation.key, value)),
            None => self.line(depth + 1, format_args!("key: {}", annotation.key)),
        }
    }
}
