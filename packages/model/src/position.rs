//! # Positions
//!
//! A position is a location *between* nodes, addressed by a root and an
//! offset path. Every element of the path except the last one is the offset
//! of an element inside its parent; the last one is the offset inside the
//! position's parent.
//!
//! ## Stickiness
//!
//! When content is inserted exactly at a position, stickiness decides whether
//! the position stays before the new content (`ToPrevious`) or moves past it
//! (`ToNone`, `ToNext`). During moves, `ToNext` and `ToPrevious` positions
//! follow the node they stick to.
//!
//! The transformation functions here are pure: they only look at paths and
//! never at the tree, so they can transform positions that refer to content
//! which no longer exists.

use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, ModelResult};
use crate::operation::MergeOperation;
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stickiness {
    #[default]
    ToNone,
    ToPrevious,
    ToNext,
}

/// Relation between two offset paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayRelation {
    Same,
    /// The first array is a prefix of the second
    Prefix,
    /// The first array extends the second
    Extension,
    /// The arrays first differ at this index
    Differs(usize),
}

pub fn compare_arrays(a: &[usize], b: &[usize]) -> ArrayRelation {
    if let Some(i) = a.iter().zip(b).position(|(x, y)| x != y) {
        return ArrayRelation::Differs(i);
    }
    match a.len().cmp(&b.len()) {
        std::cmp::Ordering::Equal => ArrayRelation::Same,
        std::cmp::Ordering::Less => ArrayRelation::Prefix,
        std::cmp::Ordering::Greater => ArrayRelation::Extension,
    }
}

/// Result of [`Position::compare_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionRelation {
    Before,
    After,
    Same,
    /// Positions are in different roots
    Different,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub root: NodeId,
    pub path: Vec<usize>,
    pub stickiness: Stickiness,
}

impl Position {
    pub fn new(root: NodeId, path: Vec<usize>) -> Self {
        Self {
            root,
            path,
            stickiness: Stickiness::ToNone,
        }
    }

    pub fn with_stickiness(mut self, stickiness: Stickiness) -> Self {
        self.stickiness = stickiness;
        self
    }

    /// Position at `offset` inside `parent`
    pub fn at(tree: &Tree, parent: NodeId, offset: usize) -> Self {
        let mut path = tree.path(parent);
        path.push(offset);
        Self::new(tree.root_of(parent), path)
    }

    /// Position at the end of `parent`
    pub fn at_end(tree: &Tree, parent: NodeId) -> Self {
        Self::at(tree, parent, tree.max_offset(parent))
    }

    /// Position right before `node`
    pub fn before(tree: &Tree, node: NodeId) -> ModelResult<Self> {
        let parent = tree.parent(node).ok_or(ModelError::NodeNotFound(node))?;
        let offset = tree.start_offset(node).ok_or(ModelError::NodeNotFound(node))?;
        Ok(Self::at(tree, parent, offset))
    }

    /// Position right after `node`
    pub fn after(tree: &Tree, node: NodeId) -> ModelResult<Self> {
        let parent = tree.parent(node).ok_or(ModelError::NodeNotFound(node))?;
        let offset = tree.end_offset(node).ok_or(ModelError::NodeNotFound(node))?;
        Ok(Self::at(tree, parent, offset))
    }

    /// Offset inside the parent
    pub fn offset(&self) -> usize {
        self.path.last().copied().unwrap_or(0)
    }

    pub fn set_offset(&mut self, offset: usize) {
        if let Some(last) = self.path.last_mut() {
            *last = offset;
        }
    }

    pub fn with_offset(&self, offset: usize) -> Self {
        let mut position = self.clone();
        position.set_offset(offset);
        position
    }

    pub fn parent_path(&self) -> &[usize] {
        &self.path[..self.path.len().saturating_sub(1)]
    }

    /// Copy moved by `shift` offsets, clamped at 0
    pub fn shifted_by(&self, shift: isize) -> Self {
        let offset = self.offset() as isize + shift;
        self.with_offset(offset.max(0) as usize)
    }

    pub fn common_path(&self, other: &Position) -> Vec<usize> {
        if self.root != other.root {
            return Vec::new();
        }
        match compare_arrays(&self.path, &other.path) {
            ArrayRelation::Same | ArrayRelation::Prefix => self.path.clone(),
            ArrayRelation::Extension => other.path.clone(),
            ArrayRelation::Differs(i) => self.path[..i].to_vec(),
        }
    }

    pub fn compare_with(&self, other: &Position) -> PositionRelation {
        if self.root != other.root {
            return PositionRelation::Different;
        }
        match compare_arrays(&self.path, &other.path) {
            ArrayRelation::Same => PositionRelation::Same,
            ArrayRelation::Prefix => PositionRelation::Before,
            ArrayRelation::Extension => PositionRelation::After,
            ArrayRelation::Differs(i) if self.path[i] < other.path[i] => PositionRelation::Before,
            ArrayRelation::Differs(_) => PositionRelation::After,
        }
    }

    pub fn is_before(&self, other: &Position) -> bool {
        self.compare_with(other) == PositionRelation::Before
    }

    pub fn is_after(&self, other: &Position) -> bool {
        self.compare_with(other) == PositionRelation::After
    }

    /// Same root and path (stickiness is ignored)
    pub fn is_equal(&self, other: &Position) -> bool {
        self.compare_with(other) == PositionRelation::Same
    }

    // ── Tree lookups ──────────────────────────────────────────────────────

    /// Element or fragment containing this position
    pub fn parent(&self, tree: &Tree) -> ModelResult<NodeId> {
        let incorrect = || ModelError::PositionPathIncorrect(self.path.clone());
        if self.path.is_empty() {
            return Err(incorrect());
        }

        let mut node = self.root;
        for &offset in self.parent_path() {
            let children = tree.children(node).ok_or_else(incorrect)?;
            let index = children.offset_to_index(offset).map_err(|_| incorrect())?;
            node = children.get(index).ok_or_else(incorrect)?;
        }

        if tree.children(node).is_none() {
            return Err(incorrect());
        }
        Ok(node)
    }

    /// Index of the child at (or containing) this position's offset
    pub fn index(&self, tree: &Tree) -> ModelResult<usize> {
        let parent = self.parent(tree)?;
        tree.children(parent)
            .ok_or(ModelError::NotAContainer(parent))?
            .offset_to_index(self.offset())
    }

    /// Text node this position is strictly inside of
    pub fn text_node(&self, tree: &Tree) -> Option<NodeId> {
        let parent = self.parent(tree).ok()?;
        let index = self.index(tree).ok()?;
        let node = tree.child(parent, index)?;
        (tree.is_text(node) && tree.start_offset(node)? < self.offset()).then_some(node)
    }

    pub fn node_after(&self, tree: &Tree) -> Option<NodeId> {
        if self.text_node(tree).is_some() {
            return None;
        }
        tree.child(self.parent(tree).ok()?, self.index(tree).ok()?)
    }

    pub fn node_before(&self, tree: &Tree) -> Option<NodeId> {
        if self.text_node(tree).is_some() {
            return None;
        }
        let index = self.index(tree).ok()?;
        tree.child(self.parent(tree).ok()?, index.checked_sub(1)?)
    }

    pub fn is_at_start(&self) -> bool {
        self.offset() == 0
    }

    pub fn is_at_end(&self, tree: &Tree) -> bool {
        self.parent(tree).map(|p| self.offset() == tree.max_offset(p)).unwrap_or(false)
    }

    /// The parent resolves and the offset lies within it
    pub fn is_valid(&self, tree: &Tree) -> bool {
        self.parent(tree).map(|p| self.offset() <= tree.max_offset(p)).unwrap_or(false)
    }

    // ── Transformations ───────────────────────────────────────────────────

    /// Position after `how_many` offsets were removed at `deletion`.
    /// `None` when this position was inside the removed content.
    pub fn transformed_by_deletion(&self, deletion: &Position, how_many: usize) -> Option<Position> {
        let mut transformed = self.clone();
        if self.root != deletion.root || deletion.path.is_empty() {
            return Some(transformed);
        }

        let deletion_end = deletion.offset().saturating_add(how_many);
        match compare_arrays(deletion.parent_path(), self.parent_path()) {
            ArrayRelation::Same => {
                if deletion.offset() < self.offset() {
                    if deletion_end > self.offset() {
                        return None;
                    }
                    transformed.set_offset(self.offset() - how_many);
                }
            }
            ArrayRelation::Prefix => {
                let i = deletion.path.len() - 1;
                if deletion.offset() <= self.path[i] {
                    if deletion_end > self.path[i] {
                        return None;
                    }
                    transformed.path[i] -= how_many;
                }
            }
            _ => {}
        }
        Some(transformed)
    }

    /// Position after `how_many` offsets were inserted at `insertion`
    pub fn transformed_by_insertion(&self, insertion: &Position, how_many: usize) -> Position {
        let mut transformed = self.clone();
        if self.root != insertion.root || insertion.path.is_empty() {
            return transformed;
        }

        match compare_arrays(insertion.parent_path(), self.parent_path()) {
            ArrayRelation::Same => {
                if insertion.offset() < self.offset()
                    || (insertion.offset() == self.offset() && self.stickiness != Stickiness::ToPrevious)
                {
                    transformed.set_offset(self.offset() + how_many);
                }
            }
            ArrayRelation::Prefix => {
                let i = insertion.path.len() - 1;
                if insertion.offset() <= self.path[i] {
                    transformed.path[i] += how_many;
                }
            }
            _ => {}
        }
        transformed
    }

    /// Position after `how_many` offsets were moved from `source` to `target`
    pub fn transformed_by_move(&self, source: &Position, target: &Position, how_many: usize) -> Position {
        let target = target
            .transformed_by_deletion(source, how_many)
            .unwrap_or_else(|| target.clone());

        if source.is_equal(&target) {
            return self.clone();
        }

        let transformed = self.transformed_by_deletion(source, how_many);
        let sticks_to_moved = (source.is_equal(self) && self.stickiness == Stickiness::ToNext)
            || (source.shifted_by(how_many as isize).is_equal(self) && self.stickiness == Stickiness::ToPrevious);

        match transformed {
            Some(transformed) if !sticks_to_moved => transformed.transformed_by_insertion(&target, how_many),
            _ => self.combined(source, &target),
        }
    }

    /// Re-root this position, which lies inside content starting at `source`,
    /// to the same place relative to `target`
    pub fn combined(&self, source: &Position, target: &Position) -> Position {
        let i = source.path.len().saturating_sub(1);
        let mut combined = target.clone();
        combined.stickiness = self.stickiness;

        let inner = self.path.get(i).copied().unwrap_or(0);
        combined.set_offset(target.offset() + inner.saturating_sub(source.offset()));
        if self.path.len() > i + 1 {
            combined.path.extend_from_slice(&self.path[i + 1..]);
        }
        combined
    }

    /// Position after `merge` was applied
    pub fn transformed_by_merge_operation(&self, merge: &MergeOperation) -> Position {
        let moved_range = merge.moved_range();
        let deletion = merge.deletion_position();

        let is_contained = moved_range.contains_position(self)
            || (moved_range.start.is_equal(self) && self.stickiness == Stickiness::ToNext);

        if is_contained {
            let position = self.combined(&merge.source_position, &merge.target_position);
            if merge.source_position.is_before(&merge.target_position) {
                return position.transformed_by_deletion(&deletion, 1).unwrap_or(position);
            }
            position
        } else if self.is_equal(&deletion) {
            deletion
        } else {
            self.transformed_by_move(&deletion, &merge.graveyard_position, 1)
        }
    }
}
