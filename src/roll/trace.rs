use crate::common::{DiceType, Int, UInt};
use std::fmt;
use std::io;

const HEADER: &str = "Individual dice results:";

/// One physical die roll and whether it counted toward the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicRoll {
    pub sides: UInt,
    pub result: Int,
    pub selected: bool,
    pub label: Option<String>,
}

impl AtomicRoll {
    pub const fn new(sides: UInt, result: Int, selected: bool) -> Self {
        Self {
            sides,
            result,
            selected,
            label: None,
        }
    }
}

impl fmt::Display for AtomicRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{} -> {}", self.sides, self.result)?;
        if self.selected {
            f.write_str("*")?;
        }
        Ok(())
    }
}

/// Summary appended after the rolls of a dice operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMarker {
    pub dice_type: DiceType,
    pub dice: usize,
    pub total: Int,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEntry {
    Roll(AtomicRoll),
    Group(GroupMarker),
}

/// Append-only audit log of a context's rolls.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn rolls(&self) -> impl Iterator<Item = &AtomicRoll> {
        self.entries.iter().filter_map(|entry| match entry {
            TraceEntry::Roll(roll) => Some(roll),
            TraceEntry::Group(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn format(&self) -> String {
        self.to_string()
    }

    /// Like [Trace::format], but stops adding lines once the next one would exceed `limit` bytes.
    pub fn format_bounded(&self, limit: usize) -> String {
        let mut out = String::new();
        if self.rolls().next().is_none() || HEADER.len() + 1 > limit {
            return out;
        }
        out.push_str(HEADER);
        out.push('\n');
        for roll in self.rolls() {
            let line = format!("  {}\n", roll);
            if out.len() + line.len() > limit {
                break;
            }
            out.push_str(&line);
        }
        out
    }

    pub fn write_to<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        write!(writer, "{}", self)
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rolls().next().is_none() {
            return Ok(());
        }
        writeln!(f, "{}", HEADER)?;
        for roll in self.rolls() {
            writeln!(f, "  {}", roll)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Trace {
        let mut trace = Trace::new();
        trace.push(TraceEntry::Roll(AtomicRoll::new(6, 4, true)));
        trace.push(TraceEntry::Roll(AtomicRoll::new(6, 1, false)));
        trace.push(TraceEntry::Group(GroupMarker {
            dice_type: DiceType::Filter,
            dice: 2,
            total: 4,
        }));
        trace.push(TraceEntry::Roll(AtomicRoll::new(20, 17, false)));
        trace
    }

    #[test]
    fn test_format() {
        assert_eq!(
            sample().format(),
            "Individual dice results:\n  d6 -> 4*\n  d6 -> 1\n  d20 -> 17\n"
        );
        assert_eq!(Trace::new().format(), "");
    }

    #[test]
    fn test_format_bounded() {
        let trace = sample();
        let full = trace.format();
        assert_eq!(trace.format_bounded(full.len()), full);
        assert_eq!(trace.format_bounded(1000), full);

        let header_and_one = "Individual dice results:\n  d6 -> 4*\n";
        assert_eq!(trace.format_bounded(header_and_one.len() + 3), header_and_one);
        assert_eq!(trace.format_bounded(10), "");
    }

    #[test]
    fn test_write_to() {
        let mut buf = Vec::new();
        sample().write_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), sample().format());
    }

    #[test]
    fn test_rolls_skip_markers() {
        let trace = sample();
        assert_eq!(trace.len(), 4);
        assert_eq!(trace.rolls().count(), 3);
        assert_eq!(trace.rolls().filter(|r| r.selected).count(), 1);

        let mut trace = trace;
        trace.clear();
        assert!(trace.is_empty());
    }
}
