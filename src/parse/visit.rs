use crate::arena::{Arena, ArenaError, NodeId};
use crate::parse::ast;

/// Callbacks for [walk]. Every method defaults to a no-op.
///
/// For each node, `enter_node` runs first, then the callback for its kind, then the node's
/// children in evaluation order, then `exit_node`.
pub trait AstVisitor {
    fn enter_node(&mut self, _id: NodeId, _node: &ast::Node, _depth: usize) {}

    fn exit_node(&mut self, _id: NodeId, _node: &ast::Node, _depth: usize) {}

    fn visit_literal(&mut self, _lit: &ast::Literal, _depth: usize) {}

    fn visit_binary(&mut self, _op: &ast::BinaryOp, _depth: usize) {}

    fn visit_dice(&mut self, _dice: &ast::DiceOp, _depth: usize) {}

    fn visit_call(&mut self, _call: &ast::FunctionCall, _depth: usize) {}

    fn visit_annotation(&mut self, _annotation: &ast::Annotation, _depth: usize) {}
}

pub trait Accept<V: AstVisitor + ?Sized> {
    fn accept(&self, v: &mut V, depth: usize);
}

impl<V: AstVisitor + ?Sized> Accept<V> for ast::Node {
    fn accept(&self, v: &mut V, depth: usize) {
        match self {
            Self::Literal(x) => v.visit_literal(x, depth),
            Self::Binary(x) => v.visit_binary(x, depth),
            Self::Dice(x) => v.visit_dice(x, depth),
            Self::Call(x) => v.visit_call(x, depth),
            Self::Annotation(x) => v.visit_annotation(x, depth),
        }
    }
}

/// Depth-first traversal from `root`. Fails only if a handle is stale.
pub fn walk<V: AstVisitor + ?Sized>(
    arena: &Arena,
    root: NodeId,
    visitor: &mut V,
) -> Result<(), ArenaError> {
    walk_at(arena, root, visitor, 0)
}

fn walk_at<V: AstVisitor + ?Sized>(
    arena: &Arena,
    id: NodeId,
    visitor: &mut V,
    depth: usize,
) -> Result<(), ArenaError> {
    let node = arena.get(id)?;
    visitor.enter_node(id, node, depth);
    node.accept(visitor, depth);
    for child in node.children() {
        walk_at(arena, child, visitor, depth + 1)?;
    }
    visitor.exit_node(id, node, depth);
    Ok(())
}
