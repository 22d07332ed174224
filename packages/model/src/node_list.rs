//! # Node List
//!
//! Ordered container of child nodes, indexed both by child index and by
//! offset. A child occupies `offset_size` consecutive offset slots (1 for
//! elements, the character count for text), so the offset table always has
//! exactly `max_offset` entries.
//!
//! The list stores node handles and their offset sizes; the nodes themselves
//! live in the [`crate::tree::Tree`] arena. Only the tree mutates a list, and
//! it refreshes the cached `index`/`start_offset` of every shifted sibling
//! right after each mutation.

use crate::errors::{ModelError, ModelResult};
use crate::tree::NodeId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeList {
    /// Children in order
    nodes: Vec<NodeId>,

    /// Offset size of each child, parallel to `nodes`
    sizes: Vec<usize>,

    /// Exclusive prefix sums of `sizes` (start offset of each child)
    starts: Vec<usize>,

    /// Child index for every offset slot
    offset_to_index: Vec<usize>,
}

impl NodeList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list from `(node, offset_size)` pairs
    pub fn from_entries(entries: impl IntoIterator<Item = (NodeId, usize)>) -> Self {
        let mut list = Self::new();
        let entries: Vec<_> = entries.into_iter().collect();
        // Inserting at 0 into an empty list cannot fail.
        let _ = list.insert_nodes(0, entries);
        list
    }

    /// Number of children
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sum of the offset sizes of all children
    pub fn max_offset(&self) -> usize {
        self.offset_to_index.len()
    }

    /// Child at `index`
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).copied()
    }

    /// Index of `node` in this list
    pub fn get_node_index(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    /// Start offset of `node` in this list
    pub fn get_node_start_offset(&self, node: NodeId) -> Option<usize> {
        self.get_node_index(node).map(|index| self.starts[index])
    }

    /// Offset size of the child at `index`
    pub fn size_at(&self, index: usize) -> Option<usize> {
        self.sizes.get(index).copied()
    }

    /// Start offset of the child at `index`; `len()` maps to `max_offset()`.
    pub fn index_to_offset(&self, index: usize) -> Option<usize> {
        if index == self.nodes.len() {
            return Some(self.max_offset());
        }
        self.starts.get(index).copied()
    }

    /// Index of the child occupying `offset`; `max_offset()` maps to `len()`.
    pub fn offset_to_index(&self, offset: usize) -> ModelResult<usize> {
        if offset == self.max_offset() {
            return Ok(self.nodes.len());
        }
        self.offset_to_index
            .get(offset)
            .copied()
            .ok_or(ModelError::OffsetOutOfBounds {
                offset,
                max_offset: self.max_offset(),
            })
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Insert nodes before `index`
    pub(crate) fn insert_nodes(
        &mut self,
        index: usize,
        entries: impl IntoIterator<Item = (NodeId, usize)>,
    ) -> ModelResult<()> {
        if index > self.nodes.len() {
            return Err(ModelError::IndexOutOfBounds {
                index,
                len: self.nodes.len(),
            });
        }

        let (nodes, sizes): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        self.nodes.splice(index..index, nodes);
        self.sizes.splice(index..index, sizes);
        self.rebuild_from(index);
        Ok(())
    }

    /// Remove `how_many` nodes starting at `index` and return them
    pub(crate) fn remove_nodes(&mut self, index: usize, how_many: usize) -> ModelResult<Vec<NodeId>> {
        let end = index
            .checked_add(how_many)
            .filter(|&end| end <= self.nodes.len())
            .ok_or(ModelError::IndexOutOfBounds {
                index: index.saturating_add(how_many),
                len: self.nodes.len(),
            })?;

        let removed: Vec<NodeId> = self.nodes.drain(index..end).collect();
        self.sizes.drain(index..end);
        self.rebuild_from(index);
        Ok(removed)
    }

    /// Remove every node in `nodes` that belongs to this list
    pub(crate) fn remove_nodes_array(&mut self, nodes: &[NodeId]) {
        let Some(first) = self.nodes.iter().position(|n| nodes.contains(n)) else {
            return;
        };

        let mut index = first;
        while index < self.nodes.len() {
            if nodes.contains(&self.nodes[index]) {
                self.nodes.remove(index);
                self.sizes.remove(index);
            } else {
                index += 1;
            }
        }
        self.rebuild_from(first);
    }

    /// Recompute start offsets and the offset table for children from `index`
    fn rebuild_from(&mut self, index: usize) {
        let index = index.min(self.nodes.len());
        let first_offset = if index == 0 {
            0
        } else {
            self.starts[index - 1] + self.sizes[index - 1]
        };

        self.starts.truncate(index);
        self.offset_to_index.truncate(first_offset);

        let mut offset = first_offset;
        for (i, &size) in self.sizes.iter().enumerate().skip(index) {
            self.starts.push(offset);
            self.offset_to_index.extend(std::iter::repeat(i).take(size));
            offset += size;
        }
    }
}
