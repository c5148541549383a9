use crate::error::DiceError;
use std::fmt::{self, Write};

pub use vec1::vec1;

pub type Int = i64;
pub type UInt = u64;

pub type NonEmpty<T> = vec1::Vec1<T>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    /// Applies the operator with checked arithmetic. Division truncates toward zero.
    pub fn apply(self, lhs: Int, rhs: Int) -> Result<Int, DiceError> {
        let result = match self {
            Self::Add => lhs.checked_add(rhs),
            Self::Sub => lhs.checked_sub(rhs),
            Self::Mul => lhs.checked_mul(rhs),
            Self::Div => {
                if rhs == 0 {
                    return Err(DiceError::arithmetic("Division by zero"));
                }
                lhs.checked_div(rhs)
            }
        };
        result.ok_or_else(|| {
            DiceError::arithmetic(format!("Integer overflow in {} {} {}", lhs, self, rhs))
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        };
        f.write_char(c)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Comparison {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl Comparison {
    pub const fn matches(self, value: Int, threshold: Int) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Lt => value < threshold,
            Self::Ge => value >= threshold,
            Self::Le => value <= threshold,
            Self::Eq => value == threshold,
            Self::Ne => value != threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ne => "<>",
        };
        f.write_str(s)
    }
}

/// A comparison against a fixed threshold, as used by `s` and `r`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Condition {
    pub op: Comparison,
    pub threshold: Int,
}

impl Condition {
    pub const fn new(op: Comparison, threshold: Int) -> Self {
        Self { op, threshold }
    }

    pub const fn matches(&self, value: Int) -> bool {
        self.op.matches(value, self.threshold)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.threshold)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DiceType {
    Basic,
    Exploding,
    Filter,
    Custom,
}

impl fmt::Display for DiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Basic => "BASIC",
            Self::Exploding => "EXPLODING",
            Self::Filter => "FILTER",
            Self::Custom => "CUSTOM",
        };
        f.write_str(s)
    }
}
