pub mod custom;
pub(crate) mod eval;
pub mod random;
mod select;
pub mod trace;

use crate::error::DiceError;

pub(crate) type RResult<T> = Result<T, DiceError>;

pub use custom::{CustomDie, CustomDieRegistry, Face, FATE_NAME};
pub use eval::REROLL_LIMIT;
pub use random::{RandomSource, ScriptedRandom, SeededRandom, SystemRandom};
pub use trace::{AtomicRoll, GroupMarker, Trace, TraceEntry};
