use crate::common::UInt;
use std::fmt;

/// Limits consulted on every dice evaluation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Policy {
    pub max_dice_count: usize,
    pub max_sides: UInt,
    /// Extra rolls a single exploding die may add.
    pub max_explosion_depth: u32,
    /// A negative count `-N` rolls `N` dice and negates the total.
    pub allow_negative_dice: bool,
    /// Reject keep/drop counts larger than the pool instead of clamping them.
    pub strict_mode: bool,
}

impl Policy {
    pub const fn with_max_dice_count(mut self, max: usize) -> Self {
        self.max_dice_count = max;
        self
    }

    pub const fn with_max_sides(mut self, max: UInt) -> Self {
        self.max_sides = max;
        self
    }

    pub const fn with_max_explosion_depth(mut self, depth: u32) -> Self {
        self.max_explosion_depth = depth;
        self
    }

    pub const fn with_negative_dice(mut self, allow: bool) -> Self {
        self.allow_negative_dice = allow;
        self
    }

    pub const fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_dice_count: 1000,
            max_sides: 1_000_000,
            max_explosion_depth: 10,
            allow_negative_dice: false,
            strict_mode: false,
        }
    }
}

bitflags::bitflags! {
    /// Syntax families a context accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        /// Dice terms of any kind. Arithmetic on plain numbers needs no flag.
        const BASIC = 1;
        /// Success counting with `s`.
        const POOL = 2;
        /// Exploding dice with `!`.
        const EXPLODING = 4;
        /// Registers the `F` die.
        const FATE = 8;
        /// Keep, drop and reroll modifiers.
        const KEEP_DROP = 16;
        const ALL = Self::BASIC.bits()
            | Self::POOL.bits()
            | Self::EXPLODING.bits()
            | Self::FATE.bits()
            | Self::KEEP_DROP.bits();
    }
}

impl Default for Features {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter_names().map(|(name, _)| name).collect();
        f.write_str(&names.join(" | "))
    }
}
