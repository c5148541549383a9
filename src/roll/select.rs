use crate::common::{Condition, Int};

/// Marks the `keep` highest (or lowest) values. Ties go to the earlier roll.
pub(crate) fn keep_extreme(values: &[Int], keep: usize, high: bool) -> Vec<bool> {
    let mut order: Vec<(usize, Int)> = values.iter().copied().enumerate().collect();
    // stable sort, so equal values stay in roll order
    if high {
        order.sort_by(|(_, a), (_, b)| b.cmp(a));
    } else {
        order.sort_by(|(_, a), (_, b)| a.cmp(b));
    }

    let mut selected = vec![false; values.len()];
    for (i, _) in order.into_iter().take(keep) {
        selected[i] = true;
    }
    selected
}

pub(crate) fn matching(values: &[Int], cond: &Condition) -> Vec<bool> {
    values.iter().map(|&v| cond.matches(v)).collect()
}

pub(crate) fn selected_values<'a>(
    values: &'a [Int],
    selected: &'a [bool],
) -> impl Iterator<Item = Int> + 'a {
    values
        .iter()
        .zip(selected)
        .filter(|(_, sel)| **sel)
        .map(|(&v, _)| v)
}
