//! Parser and evaluator for tabletop dice notation such as `4d6k3+1d4-2` or `6d6s>=4`.
//!
//! Expressions are parsed into an arena owned by a [Context], evaluated against the context's
//! [RandomSource], and every die rolled along the way is recorded in its [Trace].

pub mod arena;
pub mod common;
pub mod config;
mod context;
pub mod error;
pub mod parse;
pub mod roll;

pub use arena::{Arena, ArenaError, NodeId};
pub use common::{Int, UInt};
pub use config::{Features, Policy};
pub use context::Context;
pub use error::{DiceError, ErrorKind};
pub use roll::{Face, RandomSource, ScriptedRandom, SeededRandom, SystemRandom, Trace};

/// Rolls `text` in a throwaway context with the default policy and every feature enabled.
///
/// The context's arena has room for the expression plus one full trace of
/// `max_dice_count` dice that each use up the reroll limit. Expressions holding several pools that
/// large can still run out; use a [Context] with a bigger capacity for those.
pub fn roll(text: &str) -> Result<Int, DiceError> {
    Context::new(one_shot_capacity(&Policy::default()), Features::ALL).roll(text)
}

fn one_shot_capacity(policy: &Policy) -> usize {
    let entries = policy
        .max_dice_count
        .saturating_mul(roll::REROLL_LIMIT + 1)
        .saturating_add(1);
    entries
        .saturating_mul(std::mem::size_of::<roll::TraceEntry>())
        .saturating_add(arena::DEFAULT_CAPACITY)
}
