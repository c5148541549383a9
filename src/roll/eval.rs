use super::custom::{CustomDie, CustomDieRegistry};
use super::random::RandomSource;
use super::select;
use super::trace::{AtomicRoll, GroupMarker, Trace, TraceEntry};
use super::RResult;
use crate::arena::{Arena, NodeId};
use crate::common::*;
use crate::config::Policy;
use crate::error::DiceError;
use crate::parse::ast::{
    Annotation, BinaryOp, CustomRef, DiceKind, DiceOp, FunctionCall, Literal, Node, Selection,
};
use std::mem;
use tracing::{trace, warn};

/// Rerolls allowed per die before giving up on a condition that keeps matching.
pub const REROLL_LIMIT: usize = 100;

#[enum_dispatch::enum_dispatch]
pub(crate) trait Evaluate {
    fn evaluate(&self, ev: &mut Evaluator<'_>) -> RResult<Int>;
}

/// Rolls made by one dice operation, with their total.
type Rolled = (Int, Vec<AtomicRoll>);

/// Tree-walking interpreter over an arena of nodes.
///
/// Rolls are buffered per dice operation and only appended to the trace once their selection
/// status is final, so a failed operation leaves no partial entries behind.
pub(crate) struct Evaluator<'c> {
    arena: &'c Arena,
    policy: &'c Policy,
    registry: &'c CustomDieRegistry,
    rng: &'c mut dyn RandomSource,
    trace: &'c mut Trace,
}

impl<'c> Evaluator<'c> {
    pub(crate) fn new(
        arena: &'c Arena,
        policy: &'c Policy,
        registry: &'c CustomDieRegistry,
        rng: &'c mut dyn RandomSource,
        trace: &'c mut Trace,
    ) -> Self {
        Self {
            arena,
            policy,
            registry,
            rng,
            trace,
        }
    }

    pub(crate) fn eval(&mut self, id: NodeId) -> RResult<Int> {
        let arena = self.arena;
        arena.get(id)?.evaluate(self)
    }

    fn dice_count(&mut self, count: Option<NodeId>) -> RResult<(usize, bool)> {
        let count = match count {
            Some(id) => self.eval(id)?,
            None => 1,
        };
        let negate = count < 0 && self.policy.allow_negative_dice;
        if count == 0 || (count < 0 && !negate) {
            return Err(DiceError::validation(format!(
                "Dice count must be positive, got {}",
                count
            )));
        }

        let max = self.policy.max_dice_count;
        match usize::try_from(count.unsigned_abs()) {
            Ok(n) if n <= max => Ok((n, negate)),
            _ => Err(DiceError::validation(format!(
                "Too many dice: {} exceeds limit of {}",
                count, max
            ))),
        }
    }

    fn dice_sides(&mut self, id: NodeId) -> RResult<UInt> {
        let sides = self.eval(id)?;
        if sides <= 0 {
            return Err(DiceError::validation(format!(
                "Dice sides must be positive, got {}",
                sides
            )));
        }

        let max = self.policy.max_sides;
        match UInt::try_from(sides) {
            Ok(s) if s <= max => Ok(s),
            _ => Err(DiceError::validation(format!(
                "Too many sides: {} exceeds limit of {}",
                sides, max
            ))),
        }
    }

    fn roll_die(&mut self, sides: UInt) -> RResult<Int> {
        let value = self.rng.roll(sides);
        match Int::try_from(value) {
            Ok(v) if (1..=sides).contains(&value) => Ok(v),
            _ => Err(DiceError::validation(format!(
                "Random source returned {} for a d{}",
                value, sides
            ))),
        }
    }

    fn roll_pool(&mut self, count: usize, sides: UInt) -> RResult<Vec<Int>> {
        (0..count).map(|_| self.roll_die(sides)).collect()
    }

    fn roll_basic(&mut self, count: usize, sides: UInt) -> RResult<Rolled> {
        let values = self.roll_pool(count, sides)?;
        let total = checked_sum(values.iter().copied())?;
        let rolls = values
            .into_iter()
            .map(|v| AtomicRoll::new(sides, v, false))
            .collect();
        Ok((total, rolls))
    }

    fn roll_exploding(&mut self, count: usize, sides: UInt) -> RResult<Rolled> {
        let depth = self.policy.max_explosion_depth;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let mut value = self.roll_die(sides)?;
            values.push(value);

            let mut explosions = 0;
            while value as UInt == sides && explosions < depth {
                value = self.roll_die(sides)?;
                values.push(value);
                explosions += 1;
            }
        }

        let total = checked_sum(values.iter().copied())?;
        let rolls = values
            .into_iter()
            .map(|v| AtomicRoll::new(sides, v, false))
            .collect();
        Ok((total, rolls))
    }

    fn roll_custom(&mut self, count: usize, die: &CustomDie) -> RResult<Rolled> {
        let faces = die.face_count() as UInt;
        let mut rolls = Vec::with_capacity(count);
        for _ in 0..count {
            let index = self.rng.rand(faces) % faces;
            let face = &die.faces[index as usize];
            rolls.push(AtomicRoll {
                sides: faces,
                result: face.value,
                selected: false,
                label: face.label.clone(),
            });
        }

        let total = checked_sum(rolls.iter().map(|r| r.result))?;
        Ok((total, rolls))
    }

    fn roll_filtered(&mut self, count: usize, sides: UInt, selection: &Selection) -> RResult<Rolled> {
        match selection {
            Selection::Count {
                count: n,
                select_high,
                is_drop,
            } => {
                let n = self.eval(*n)?;
                let keep = keep_count(n, count, *is_drop, self.policy.strict_mode)?;
                let values = self.roll_pool(count, sides)?;
                let selected = select::keep_extreme(&values, keep, *select_high);
                pool_result(sides, values, selected)
            }
            Selection::Conditional(cond) => {
                let values = self.roll_pool(count, sides)?;
                let selected = select::matching(&values, cond);
                pool_result(sides, values, selected)
            }
            Selection::Reroll(cond) => self.roll_rerolled(count, sides, cond),
        }
    }

    fn roll_rerolled(&mut self, count: usize, sides: UInt, cond: &Condition) -> RResult<Rolled> {
        let values = self.roll_pool(count, sides)?;
        let mut rolls = Vec::with_capacity(count);
        let mut finals = Vec::with_capacity(count);

        for mut value in values {
            let mut attempts = 0;
            while cond.matches(value) {
                if attempts == REROLL_LIMIT {
                    warn!(sides, condition = %cond, "reroll safety limit reached");
                    return Err(DiceError::SafetyLimit {
                        limit: REROLL_LIMIT,
                        sides,
                        condition: *cond,
                    });
                }
                rolls.push(AtomicRoll::new(sides, value, false));
                value = self.roll_die(sides)?;
                attempts += 1;
            }
            rolls.push(AtomicRoll::new(sides, value, true));
            finals.push(value);
        }

        let total = checked_sum(finals)?;
        Ok((total, rolls))
    }

    /// Charges the arena for the entries, then appends them in roll order.
    fn record(&mut self, rolls: Vec<AtomicRoll>, marker: GroupMarker) -> RResult<()> {
        self.arena
            .carve((rolls.len() + 1) * mem::size_of::<TraceEntry>())?;
        for roll in rolls {
            trace!(
                sides = roll.sides,
                result = roll.result,
                selected = roll.selected,
                "die rolled"
            );
            self.trace.push(TraceEntry::Roll(roll));
        }
        self.trace.push(TraceEntry::Group(marker));
        Ok(())
    }
}

fn checked_sum(values: impl IntoIterator<Item = Int>) -> RResult<Int> {
    values
        .into_iter()
        .try_fold(0, Int::checked_add)
        .ok_or_else(|| DiceError::arithmetic("Integer overflow while summing dice"))
}

fn pool_result(sides: UInt, values: Vec<Int>, selected: Vec<bool>) -> RResult<Rolled> {
    let total = checked_sum(select::selected_values(&values, &selected))?;
    let rolls = values
        .into_iter()
        .zip(selected)
        .map(|(v, sel)| AtomicRoll::new(sides, v, sel))
        .collect();
    Ok((total, rolls))
}

/// Number of dice a keep/drop of `n` retains from a pool of `count`.
fn keep_count(n: Int, count: usize, is_drop: bool, strict: bool) -> RResult<usize> {
    let verb = if is_drop { "drop" } else { "keep" };
    if n < 0 {
        return Err(DiceError::validation(format!(
            "Cannot {} a negative number of dice, got {}",
            verb, n
        )));
    }

    let n = usize::try_from(n).unwrap_or(usize::MAX);
    if strict && n > count {
        return Err(DiceError::validation(format!(
            "Cannot {} {} dice from a pool of {}",
            verb, n, count
        )));
    }

    let n = n.min(count);
    Ok(if is_drop { count - n } else { n })
}

fn resolve<'n>(registry: &'n CustomDieRegistry, custom: &'n CustomRef) -> RResult<&'n CustomDie> {
    match custom {
        CustomRef::Inline(die) => Ok(die),
        CustomRef::Named(name) => registry
            .lookup(name)
            .ok_or_else(|| DiceError::validation(format!("Unknown custom die: {}", name))),
    }
}

impl Evaluate for Literal {
    fn evaluate(&self, _ev: &mut Evaluator<'_>) -> RResult<Int> {
        Ok(self.value)
    }
}

impl Evaluate for BinaryOp {
    fn evaluate(&self, ev: &mut Evaluator<'_>) -> RResult<Int> {
        let lhs = ev.eval(self.left)?;
        let rhs = ev.eval(self.right)?;
        self.op.apply(lhs, rhs)
    }
}

impl Evaluate for DiceOp {
    fn evaluate(&self, ev: &mut Evaluator<'_>) -> RResult<Int> {
        let (count, negate) = ev.dice_count(self.count)?;
        let (total, rolls) = match &self.kind {
            DiceKind::Basic { sides } => {
                let sides = ev.dice_sides(*sides)?;
                ev.roll_basic(count, sides)?
            }
            DiceKind::Exploding { sides } => {
                let sides = ev.dice_sides(*sides)?;
                ev.roll_exploding(count, sides)?
            }
            DiceKind::Filter { sides, selection } => {
                let sides = ev.dice_sides(*sides)?;
                ev.roll_filtered(count, sides, selection)?
            }
            DiceKind::Custom(custom) => {
                let die = resolve(ev.registry, custom)?;
                ev.roll_custom(count, die)?
            }
        };

        ev.record(
            rolls,
            GroupMarker {
                dice_type: self.dice_type(),
                dice: count,
                total,
            },
        )?;
        Ok(if negate { -total } else { total })
    }
}

impl Evaluate for FunctionCall {
    fn evaluate(&self, _ev: &mut Evaluator<'_>) -> RResult<Int> {
        Err(DiceError::Unsupported(self.name.clone()))
    }
}

impl Evaluate for Annotation {
    fn evaluate(&self, ev: &mut Evaluator<'_>) -> RResult<Int> {
        ev.eval(self.child)
    }
}
