//! Pure helpers over element sequences, run before a breaking search.
//!
//! The rewriting helpers mutate penalty values in place (and may insert
//! zero-width infinite penalties); they never delete elements, so producer
//! position handles and later indices stay meaningful. They are strictly
//! pre-passes: never call them while a search is in progress.

use crate::element::{Element, ElementList, INFINITE_PENALTY};

/// Sum of box and glue widths over the inclusive index range.
///
/// Penalty widths are ignored (they only count when a break is taken), as is
/// stretch/shrink. `end` is clamped to the last element.
pub fn content_length(list: &ElementList, start: usize, end: usize) -> i32 {
    let slice = list.as_slice();
    if slice.is_empty() || start >= slice.len() {
        return 0;
    }
    let end = end.min(slice.len() - 1);
    slice[start..=end]
        .iter()
        .filter(|e| e.is_box() || e.is_glue())
        .map(Element::width)
        .sum()
}

/// Like [`content_length`], additionally folding in the optimum length of
/// pending first/last unresolved spaces (space-before/after not yet reduced).
pub fn full_content_length(list: &ElementList, start: usize, end: usize) -> i32 {
    let slice = list.as_slice();
    if slice.is_empty() || start >= slice.len() {
        return 0;
    }
    let end = end.min(slice.len() - 1);
    let mut total = 0;
    for element in &slice[start..=end] {
        match element {
            Element::UnresolvedSpace { opt, .. } => total += *opt,
            e if e.is_box() || e.is_glue() => total += e.width(),
            _ => {}
        }
    }
    total
}

/// Forbid every legal break within the leading `constraint` units of content.
///
/// Walks from the start accumulating content length; each breakable penalty
/// is rewritten to [`INFINITE_PENALTY`] (width, flag and position preserved)
/// and a zero-width infinite penalty is inserted between a box and a
/// following glue. Unresolved spaces contribute their optimum length;
/// unresolved breaks are clamped in place.
///
/// Returns `false` as soon as accumulated length reaches the constraint
/// (later elements untouched), `true` if the whole sequence was opened up
/// without filling it.
pub fn remove_legal_breaks(list: &mut ElementList, constraint: i32) -> bool {
    let mut accumulated = 0;
    let mut previous_is_word_box = false;
    let mut i = 0;
    while i < list.len() {
        let (is_word_box, is_glue) = {
            let e = match list.get(i) {
                Some(e) => e,
                None => break,
            };
            (e.is_box() && !e.is_auxiliary(), e.is_glue())
        };
        if is_glue && previous_is_word_box {
            // Blocks the glue-after-box break without touching the glue.
            list.insert(i, Element::penalty(INFINITE_PENALTY));
            i += 1;
        }
        if let Some(e) = list.element_mut(i) {
            match e.penalty_value() {
                Some(v) if v < INFINITE_PENALTY => e.set_penalty_value(INFINITE_PENALTY),
                _ => accumulated += content_contribution(e),
            }
        }
        previous_is_word_box = is_word_box;
        if accumulated >= constraint {
            return false;
        }
        i += 1;
    }
    true
}

/// Trailing-span counterpart of [`remove_legal_breaks`]: walks from the end
/// of the sequence toward the start.
pub fn remove_legal_breaks_from_end(list: &mut ElementList, constraint: i32) -> bool {
    let mut accumulated = 0;
    let mut i = list.len();
    while i > 0 {
        i -= 1;
        let is_glue_after_word_box = {
            let here_is_glue = list.get(i).is_some_and(Element::is_glue);
            let prev_is_word_box = i > 0
                && list
                    .get(i - 1)
                    .is_some_and(|e| e.is_box() && !e.is_auxiliary());
            here_is_glue && prev_is_word_box
        };
        if let Some(e) = list.element_mut(i) {
            match e.penalty_value() {
                Some(v) if v < INFINITE_PENALTY => e.set_penalty_value(INFINITE_PENALTY),
                _ => accumulated += content_contribution(e),
            }
        }
        if is_glue_after_word_box {
            list.insert(i, Element::penalty(INFINITE_PENALTY));
        }
        if accumulated >= constraint {
            return false;
        }
    }
    true
}

fn content_contribution(e: &Element) -> i32 {
    match e {
        Element::UnresolvedSpace { opt, .. } => *opt,
        e if e.is_box() || e.is_glue() => e.width(),
        _ => 0,
    }
}

/// Whether the last element is a (possibly unresolved) forced break.
pub fn ends_with_forced_break(list: &ElementList) -> bool {
    list.last().is_some_and(Element::is_forced_break)
}

/// Whether the first element is a (possibly unresolved) forced break.
pub fn starts_with_forced_break(list: &ElementList) -> bool {
    list.first().is_some_and(Element::is_forced_break)
}

/// Nearest index before `start_index` holding a breakable penalty.
pub fn determine_previous_break(list: &ElementList, start_index: usize) -> Option<usize> {
    let upper = start_index.min(list.len());
    (0..upper)
        .rev()
        .find(|&i| matches!(list.get(i).and_then(Element::penalty_value), Some(v) if v < INFINITE_PENALTY))
}
