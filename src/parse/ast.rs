use crate::arena::NodeId;
use crate::common::*;
use crate::roll::custom::CustomDie;
use std::fmt;
use std::mem;

#[enum_dispatch::enum_dispatch(Evaluate)]
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Literal),
    Binary(BinaryOp),
    Dice(DiceOp),
    Call(FunctionCall),
    Annotation(Annotation),
}

impl Node {
    /// Heap bytes owned by the node, charged to the arena on top of the node itself.
    pub(crate) fn payload_bytes(&self) -> usize {
        match self {
            Self::Literal(_) | Self::Binary(_) => 0,
            Self::Dice(dice) => match &dice.kind {
                DiceKind::Custom(CustomRef::Inline(die)) => die.payload_bytes(),
                DiceKind::Custom(CustomRef::Named(name)) => name.len(),
                _ => 0,
            },
            Self::Call(call) => call.name.len() + call.args.len() * mem::size_of::<NodeId>(),
            Self::Annotation(a) => a.key.len() + a.value.as_ref().map_or(0, String::len),
        }
    }

    /// Child handles in evaluation order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Literal(_) => vec![],
            Self::Binary(b) => vec![b.left, b.right],
            Self::Dice(d) => {
                let mut ret: Vec<_> = d.count.into_iter().collect();
                ret.extend(d.kind.sides());
                if let DiceKind::Filter {
                    selection: Selection::Count { count, .. },
                    ..
                } = &d.kind
                {
                    ret.push(*count);
                }
                ret
            }
            Self::Call(c) => c.args.clone(),
            Self::Annotation(a) => vec![a.child],
        }
    }

    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Literal(_) => "LITERAL",
            Self::Binary(_) => "BINARY_OP",
            Self::Dice(_) => "DICE_OP",
            Self::Call(_) => "FUNCTION_CALL",
            Self::Annotation(_) => "ANNOTATION",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Literal {
    pub value: Int,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BinaryOp {
    pub op: BinaryOperator,
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiceOp {
    /// `None` when the count was omitted, which means a single die.
    pub count: Option<NodeId>,
    pub kind: DiceKind,
}

impl DiceOp {
    pub const fn dice_type(&self) -> DiceType {
        self.kind.dice_type()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiceKind {
    Basic { sides: NodeId },
    Exploding { sides: NodeId },
    Filter { sides: NodeId, selection: Selection },
    Custom(CustomRef),
}

impl DiceKind {
    pub const fn dice_type(&self) -> DiceType {
        match self {
            Self::Basic { .. } => DiceType::Basic,
            Self::Exploding { .. } => DiceType::Exploding,
            Self::Filter { .. } => DiceType::Filter,
            Self::Custom(_) => DiceType::Custom,
        }
    }

    pub const fn sides(&self) -> Option<NodeId> {
        match self {
            Self::Basic { sides } | Self::Exploding { sides } | Self::Filter { sides, .. } => {
                Some(*sides)
            }
            Self::Custom(_) => None,
        }
    }
}

/// Post-roll filter attached to a [DiceKind::Filter] operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Selection {
    /// Keep or drop `count` dice. `select_high` says which end of the sorted pool is retained,
    /// so drop-low is `{ select_high: true, is_drop: true }`.
    Count {
        count: NodeId,
        select_high: bool,
        is_drop: bool,
    },
    Conditional(Condition),
    Reroll(Condition),
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count {
                select_high,
                is_drop,
                ..
            } => {
                let verb = if *is_drop { "drop" } else { "keep" };
                // a drop names the end that is discarded
                let end = if *select_high != *is_drop { "high" } else { "low" };
                write!(f, "{} ({})", verb, end)
            }
            Self::Conditional(cond) => write!(f, "success {}", cond),
            Self::Reroll(cond) => write!(f, "reroll {}", cond),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CustomRef {
    Inline(CustomDie),
    /// Resolved against the context's registry at evaluation time.
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub key: String,
    pub value: Option<String>,
    pub child: NodeId,
}
