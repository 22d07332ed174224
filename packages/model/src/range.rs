//! Ranges between two positions

use crate::errors::{ModelError, ModelResult};
use crate::position::{compare_arrays, ArrayRelation, Position, Stickiness};
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// Shallow content of a flat range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeItem {
    /// A whole child node
    Node(NodeId),
    /// Part of a text node: `len` characters starting at `offset_in_text`
    TextProxy {
        text: NodeId,
        offset_in_text: usize,
        len: usize,
    },
}

impl RangeItem {
    /// Node carrying the item's attributes
    pub fn node(&self) -> NodeId {
        match self {
            RangeItem::Node(node) => *node,
            RangeItem::TextProxy { text, .. } => *text,
        }
    }

    pub fn offset_size(&self, tree: &Tree) -> usize {
        match self {
            RangeItem::Node(node) => tree.offset_size(*node),
            RangeItem::TextProxy { len, .. } => *len,
        }
    }
}

impl Range {
    /// Non-collapsed ranges stick inwards; collapsed ones do not stick.
    pub fn new(start: Position, end: Position) -> Self {
        let collapsed = start.is_equal(&end);
        let start = start.with_stickiness(if collapsed { Stickiness::ToNone } else { Stickiness::ToNext });
        let end = end.with_stickiness(if collapsed { Stickiness::ToNone } else { Stickiness::ToPrevious });
        Self { start, end }
    }

    pub fn collapsed(position: Position) -> Self {
        Self::new(position.clone(), position)
    }

    /// Range starting at `position` and spanning `shift` offsets
    pub fn from_position_and_shift(position: &Position, shift: usize) -> Self {
        let end = position.with_offset(position.offset().saturating_add(shift));
        Self::new(position.clone(), end)
    }

    /// Range over the whole content of `element`
    pub fn create_in(tree: &Tree, element: NodeId) -> Self {
        Self::new(Position::at(tree, element, 0), Position::at_end(tree, element))
    }

    /// Range containing exactly `node`
    pub fn create_on(tree: &Tree, node: NodeId) -> ModelResult<Self> {
        Ok(Self::new(Position::before(tree, node)?, Position::after(tree, node)?))
    }

    pub fn root(&self) -> NodeId {
        self.start.root
    }

    pub fn is_collapsed(&self) -> bool {
        self.start.is_equal(&self.end)
    }

    /// Start and end share the same parent
    pub fn is_flat(&self) -> bool {
        self.start.root == self.end.root
            && compare_arrays(self.start.parent_path(), self.end.parent_path()) == ArrayRelation::Same
    }

    pub fn contains_position(&self, position: &Position) -> bool {
        position.is_after(&self.start) && position.is_before(&self.end)
    }

    /// Offset span of a flat range
    pub fn how_many(&self) -> usize {
        self.end.offset().saturating_sub(self.start.offset())
    }

    /// Smallest set of flat ranges covering this range, in document order
    pub fn minimal_flat_ranges(&self, tree: &Tree) -> ModelResult<Vec<Range>> {
        let mut ranges = Vec::new();
        let diff_at = self.start.common_path(&self.end).len();
        let mut position = self.start.clone().with_stickiness(Stickiness::ToNone);

        // Climb from the start up to the common ancestor
        while position.path.len() > diff_at + 1 {
            let parent = position.parent(tree)?;
            let how_many = tree.max_offset(parent).saturating_sub(position.offset());
            if how_many != 0 {
                ranges.push(Range::from_position_and_shift(&position, how_many));
            }
            position.path.pop();
            let offset = position.offset() + 1;
            position.set_offset(offset);
        }

        // Descend towards the end
        while position.path.len() <= self.end.path.len() {
            let offset = self.end.path[position.path.len() - 1];
            let how_many = offset.saturating_sub(position.offset());
            if how_many != 0 {
                ranges.push(Range::from_position_and_shift(&position, how_many));
            }
            position.set_offset(offset);
            position.path.push(0);
        }

        Ok(ranges)
    }

    /// Direct children of a flat range, with partially covered text as proxies
    pub fn shallow_items(&self, tree: &Tree) -> ModelResult<Vec<RangeItem>> {
        if !self.is_flat() {
            return Err(ModelError::RangeNotFlat);
        }
        let parent = self.start.parent(tree)?;
        let (from, to) = (self.start.offset(), self.end.offset());
        let mut items = Vec::new();

        for child in tree.children(parent).into_iter().flat_map(|c| c.iter()) {
            let start = tree.start_offset(child).unwrap_or(0);
            let end = start + tree.offset_size(child);
            if end <= from || start >= to {
                continue;
            }
            if start >= from && end <= to {
                items.push(RangeItem::Node(child));
            } else {
                let item_start = start.max(from);
                let item_end = end.min(to);
                items.push(RangeItem::TextProxy {
                    text: child,
                    offset_in_text: item_start - start,
                    len: item_end - item_start,
                });
            }
        }
        Ok(items)
    }

    /// Range after `how_many` offsets were inserted at `insertion`
    pub fn transformed_by_insertion(&self, insertion: &Position, how_many: usize) -> Range {
        Range {
            start: self.start.transformed_by_insertion(insertion, how_many),
            end: self.end.transformed_by_insertion(insertion, how_many),
        }
    }
}
