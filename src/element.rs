use serde::{Deserialize, Serialize};

/// Penalty value that forbids a break at a penalty element.
///
/// Values are on a bounded scale; anything at or above this sentinel is an
/// illegal break, and its negation marks a forced break.
pub const INFINITE_PENALTY: i32 = 1000;

/// Penalty value that forces a break at a penalty element.
pub const FORCED_BREAK_PENALTY: i32 = -INFINITE_PENALTY;

/// Opaque producer-owned handle carried by every element.
///
/// The breaking engine never interprets it; it only travels with the element
/// so consumers can map chosen break indices back to their own content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position(pub u64);

/// Which kind of break a penalty propagates to keep constraints across.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakClass {
    #[default]
    Auto,
    Line,
    Column,
    Page,
}

/// One atom of an element sequence.
///
/// The canonical three (`Box`, `Glue`, `Penalty`) are what the breaking
/// engine consumes. `BlockBox` is a box that carries nested element lists
/// (footnote/float bodies) for downstream consumers; the engine treats it as
/// a plain box. The `Unresolved*` variants are pre-resolution placeholders:
/// the sequence utilities handle them defensively, the engine rejects them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Box {
        width: i32,
        /// Auxiliary boxes (letter spaces and similar) do not make a
        /// following glue a legal break.
        auxiliary: bool,
        position: Position,
    },
    Glue {
        width: i32,
        stretch: i32,
        shrink: i32,
        auxiliary: bool,
        position: Position,
    },
    Penalty {
        width: i32,
        value: i32,
        /// Flagged penalties (hyphens) discourage two consecutive flagged
        /// breaks.
        flagged: bool,
        break_class: BreakClass,
        position: Position,
    },
    /// Block-level box with nested sub-lists riding along.
    BlockBox {
        width: i32,
        position: Position,
        sub_lists: Vec<ElementList>,
    },
    /// Space pending first/last conditional resolution.
    UnresolvedSpace {
        min: i32,
        opt: i32,
        max: i32,
        first: bool,
        last: bool,
        position: Position,
    },
    /// Break pending conditional-mark resolution.
    UnresolvedBreak {
        value: i32,
        break_class: BreakClass,
        position: Position,
    },
}

impl Element {
    /// Plain content box.
    pub fn new_box(width: i32) -> Self {
        Self::Box {
            width,
            auxiliary: false,
            position: Position::default(),
        }
    }

    /// Auxiliary box (does not legalize a following glue break).
    pub fn aux_box(width: i32) -> Self {
        Self::Box {
            width,
            auxiliary: true,
            position: Position::default(),
        }
    }

    /// Stretchable/shrinkable glue.
    pub fn glue(width: i32, stretch: i32, shrink: i32) -> Self {
        Self::Glue {
            width,
            stretch,
            shrink,
            auxiliary: false,
            position: Position::default(),
        }
    }

    /// Zero-width penalty with the given value.
    pub fn penalty(value: i32) -> Self {
        Self::Penalty {
            width: 0,
            value,
            flagged: false,
            break_class: BreakClass::default(),
            position: Position::default(),
        }
    }

    /// Penalty with explicit width and flag (hyphenation candidates).
    pub fn flagged_penalty(width: i32, value: i32) -> Self {
        Self::Penalty {
            width,
            value,
            flagged: true,
            break_class: BreakClass::default(),
            position: Position::default(),
        }
    }

    /// Zero-width forced break of the given class.
    pub fn forced_break(break_class: BreakClass) -> Self {
        Self::Penalty {
            width: 0,
            value: FORCED_BREAK_PENALTY,
            flagged: false,
            break_class,
            position: Position::default(),
        }
    }

    /// Attach a producer position handle.
    pub fn at(mut self, pos: Position) -> Self {
        *self.position_mut() = pos;
        self
    }

    pub fn position(&self) -> Position {
        match self {
            Self::Box { position, .. }
            | Self::Glue { position, .. }
            | Self::Penalty { position, .. }
            | Self::BlockBox { position, .. }
            | Self::UnresolvedSpace { position, .. }
            | Self::UnresolvedBreak { position, .. } => *position,
        }
    }

    fn position_mut(&mut self) -> &mut Position {
        match self {
            Self::Box { position, .. }
            | Self::Glue { position, .. }
            | Self::Penalty { position, .. }
            | Self::BlockBox { position, .. }
            | Self::UnresolvedSpace { position, .. }
            | Self::UnresolvedBreak { position, .. } => position,
        }
    }

    /// True for `Box` and `BlockBox`.
    pub fn is_box(&self) -> bool {
        matches!(self, Self::Box { .. } | Self::BlockBox { .. })
    }

    pub fn is_glue(&self) -> bool {
        matches!(self, Self::Glue { .. })
    }

    pub fn is_penalty(&self) -> bool {
        matches!(self, Self::Penalty { .. })
    }

    /// True for elements a resolution pass still has to reduce.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedSpace { .. } | Self::UnresolvedBreak { .. }
        )
    }

    pub fn is_auxiliary(&self) -> bool {
        match self {
            Self::Box { auxiliary, .. } | Self::Glue { auxiliary, .. } => *auxiliary,
            _ => false,
        }
    }

    /// Fixed extent of this element in the progression direction.
    ///
    /// Penalty widths only count when the break is actually taken; unresolved
    /// spaces report their optimum.
    pub fn width(&self) -> i32 {
        match self {
            Self::Box { width, .. }
            | Self::Glue { width, .. }
            | Self::Penalty { width, .. }
            | Self::BlockBox { width, .. } => *width,
            Self::UnresolvedSpace { opt, .. } => *opt,
            Self::UnresolvedBreak { .. } => 0,
        }
    }

    pub fn stretch(&self) -> i32 {
        match self {
            Self::Glue { stretch, .. } => *stretch,
            _ => 0,
        }
    }

    pub fn shrink(&self) -> i32 {
        match self {
            Self::Glue { shrink, .. } => *shrink,
            _ => 0,
        }
    }

    /// Penalty value for penalty-like elements, `None` otherwise.
    pub fn penalty_value(&self) -> Option<i32> {
        match self {
            Self::Penalty { value, .. } | Self::UnresolvedBreak { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Rewrite the value of a penalty-like element in place.
    ///
    /// No-op for boxes and glue; index positions stay stable.
    pub fn set_penalty_value(&mut self, new_value: i32) {
        if let Self::Penalty { value, .. } | Self::UnresolvedBreak { value, .. } = self {
            *value = new_value;
        }
    }

    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Penalty { flagged: true, .. })
    }

    pub fn break_class(&self) -> Option<BreakClass> {
        match self {
            Self::Penalty { break_class, .. } | Self::UnresolvedBreak { break_class, .. } => {
                Some(*break_class)
            }
            _ => None,
        }
    }

    /// True for a penalty-like element that forces a break.
    pub fn is_forced_break(&self) -> bool {
        self.penalty_value()
            .is_some_and(|v| v <= FORCED_BREAK_PENALTY)
    }
}

/// Flavor of an element sequence.
///
/// Inline sequences hold word-level content and may merge with each other;
/// block sequences hold stacked block content and only merge with blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceKind {
    Inline,
    Block,
}

/// Ordered, appendable element sequence.
///
/// A list is open while the producer appends to it and sealed by
/// [`close`](Self::close); the breaking engine only accepts closed lists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementList {
    kind: SequenceKind,
    elements: Vec<Element>,
    closed: bool,
}

impl ElementList {
    pub fn new(kind: SequenceKind) -> Self {
        Self {
            kind,
            elements: Vec::new(),
            closed: false,
        }
    }

    pub fn inline() -> Self {
        Self::new(SequenceKind::Inline)
    }

    pub fn block() -> Self {
        Self::new(SequenceKind::Block)
    }

    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn first(&self) -> Option<&Element> {
        self.elements.first()
    }

    pub fn last(&self) -> Option<&Element> {
        self.elements.last()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn as_slice(&self) -> &[Element] {
        &self.elements
    }

    /// Append one element. Refused (returns `false`) once the list is closed.
    pub fn append(&mut self, element: Element) -> bool {
        if self.closed {
            return false;
        }
        self.elements.push(element);
        true
    }

    /// Seal the list.
    ///
    /// An inline list that does not already end with a forced break gains a
    /// terminal forced-break penalty so the search always has a final legal
    /// break. Block producers append their own terminal break element.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if self.kind == SequenceKind::Inline && !self.last().is_some_and(Element::is_forced_break) {
            self.elements.push(Element::forced_break(BreakClass::Line));
        }
        self.closed = true;
    }

    /// Whether [`append_list`](Self::append_list) would accept `other`.
    pub fn can_append(&self, other: &ElementList) -> bool {
        !self.closed && self.kind == other.kind
    }

    /// Absorb another sequence of the same flavor.
    ///
    /// Inline into inline merges adjacent word fragments, inserting one
    /// auxiliary letter-space box when two non-auxiliary boxes become
    /// adjacent. Block into block first inserts a joining break: an infinite
    /// penalty under `keep_together`, otherwise the supplied element (or a
    /// zero penalty), and only when the current tail is not already glue.
    ///
    /// Returns `false` without touching either list when flavors are
    /// incompatible or this list is closed.
    pub fn append_list(
        &mut self,
        other: ElementList,
        keep_together: bool,
        joining: Option<Element>,
    ) -> bool {
        if !self.can_append(&other) {
            return false;
        }
        match self.kind {
            SequenceKind::Inline => {
                let tail_is_word_box = self.last().is_some_and(|e| e.is_box() && !e.is_auxiliary());
                let head_is_word_box = other
                    .first()
                    .is_some_and(|e| e.is_box() && !e.is_auxiliary());
                if tail_is_word_box && head_is_word_box {
                    self.elements.push(Element::aux_box(0));
                }
            }
            SequenceKind::Block => {
                if !self.elements.is_empty() && !self.last().is_some_and(Element::is_glue) {
                    let joining_break = if keep_together {
                        Element::penalty(INFINITE_PENALTY)
                    } else {
                        joining.unwrap_or_else(|| Element::penalty(0))
                    };
                    self.elements.push(joining_break);
                }
            }
        }
        self.elements.extend(other.elements);
        true
    }

    /// Index of the first box at or after `from`, if any.
    pub fn first_box_index(&self, from: usize) -> Option<usize> {
        self.elements
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, e)| e.is_box())
            .map(|(i, _)| i)
    }

    pub(crate) fn element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    pub(crate) fn insert(&mut self, index: usize, element: Element) {
        self.elements.insert(index, element);
    }
}

impl<'a> IntoIterator for &'a ElementList {
    type Item = &'a Element;
    type IntoIter = core::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_appends_terminal_forced_break_to_inline() {
        let mut list = ElementList::inline();
        assert!(list.append(Element::new_box(40)));
        list.close();
        assert!(list.is_closed());
        assert!(list.last().is_some_and(Element::is_forced_break));
    }

    #[test]
    fn close_is_idempotent_and_blocks_append() {
        let mut list = ElementList::inline();
        list.append(Element::new_box(10));
        list.close();
        let len = list.len();
        list.close();
        assert_eq!(list.len(), len);
        assert!(!list.append(Element::new_box(10)));
        assert_eq!(list.len(), len);
    }

    #[test]
    fn block_close_does_not_invent_breaks() {
        let mut list = ElementList::block();
        list.append(Element::new_box(40));
        list.close();
        assert!(list.last().is_some_and(Element::is_box));
    }

    #[test]
    fn inline_merge_inserts_letter_space_box() {
        let mut left = ElementList::inline();
        left.append(Element::new_box(20));
        let mut right = ElementList::inline();
        right.append(Element::new_box(30));
        assert!(left.append_list(right, false, None));
        assert_eq!(left.len(), 3);
        let mid = left.get(1).unwrap();
        assert!(mid.is_box() && mid.is_auxiliary());
    }

    #[test]
    fn block_merge_inserts_keep_together_penalty() {
        let mut left = ElementList::block();
        left.append(Element::new_box(100));
        let mut right = ElementList::block();
        right.append(Element::new_box(100));
        assert!(left.append_list(right, true, None));
        assert_eq!(left.get(1).unwrap().penalty_value(), Some(INFINITE_PENALTY));
    }

    #[test]
    fn block_merge_skips_joining_break_after_glue() {
        let mut left = ElementList::block();
        left.append(Element::new_box(100));
        left.append(Element::glue(8, 2, 2));
        let mut right = ElementList::block();
        right.append(Element::new_box(100));
        assert!(left.append_list(right, false, None));
        assert_eq!(left.len(), 3);
        assert!(left.get(2).unwrap().is_box());
    }

    #[test]
    fn append_list_refuses_flavor_mismatch() {
        let mut inline = ElementList::inline();
        inline.append(Element::new_box(10));
        let block = ElementList::block();
        assert!(!inline.can_append(&block));
        assert!(!inline.append_list(block, false, None));
        assert_eq!(inline.len(), 1);
    }

    #[test]
    fn append_list_refuses_closed_target() {
        let mut left = ElementList::block();
        left.close();
        let mut right = ElementList::block();
        right.append(Element::new_box(10));
        assert!(!left.append_list(right, false, None));
    }

    #[test]
    fn first_box_index_skips_non_boxes() {
        let mut list = ElementList::inline();
        list.append(Element::glue(5, 1, 1));
        list.append(Element::penalty(0));
        list.append(Element::new_box(40));
        assert_eq!(list.first_box_index(0), Some(2));
        assert_eq!(list.first_box_index(3), None);
    }

    #[test]
    fn forced_break_detection_uses_negative_sentinel() {
        assert!(Element::forced_break(BreakClass::Page).is_forced_break());
        assert!(!Element::penalty(INFINITE_PENALTY).is_forced_break());
        assert!(!Element::penalty(-999).is_forced_break());
    }

    #[test]
    fn element_round_trips_through_json() {
        let e = Element::flagged_penalty(12, 50).at(Position(7));
        let json = serde_json::to_string(&e).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }
}
