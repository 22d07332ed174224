//! # Node Tree
//!
//! Arena holding every node the document knows about: attached roots, the
//! graveyard, detached elements created by the writer, and document
//! fragments. Nodes are addressed by stable [`NodeId`] handles and refer to
//! their parent by handle, so there are no reference cycles.
//!
//! Structural mutation is `pub(crate)`: the tree is only changed by the
//! mutation primitives that operations call.
//!
//! ```text
//! Element ── children: NodeList ──> [Element | Text]*
//!   └─ root: Option<RootInfo>      (document roots, graveyard)
//! Fragment ── children: NodeList   (detached container, no name)
//! Text ── data
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ModelError, ModelResult};
use crate::node_list::NodeList;

/// Attribute map. Ordered so that snapshots and stringified trees are stable.
pub type Attributes = BTreeMap<String, Value>;

/// Name of the root that receives all removed content
pub const GRAVEYARD_NAME: &str = "$graveyard";

/// The graveyard is always the first node allocated in a tree.
pub const GRAVEYARD: NodeId = NodeId(0);

/// Handle of a node in the [`Tree`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn from_raw(raw: usize) -> Self {
        NodeId(raw)
    }

    pub fn raw(self) -> usize {
        self.0
    }
}

/// Extra state carried by root elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootInfo {
    pub root_name: String,
    pub is_attached: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Element {
        name: String,
        children: NodeList,
        root: Option<RootInfo>,
    },
    Text {
        data: String,
        /// Character count of `data`
        len: usize,
    },
    Fragment {
        children: NodeList,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    parent: Option<NodeId>,
    /// Cached index within the parent
    index: Option<usize>,
    /// Cached start offset within the parent
    start_offset: Option<usize>,
    attributes: Attributes,
    kind: NodeKind,
}

impl NodeData {
    fn new(kind: NodeKind, attributes: Attributes) -> Self {
        Self {
            parent: None,
            index: None,
            start_offset: None,
            attributes,
            kind,
        }
    }

    fn offset_size(&self) -> usize {
        match &self.kind {
            NodeKind::Text { len, .. } => *len,
            _ => 1,
        }
    }
}

/// Owned snapshot of a node and its subtree.
///
/// This is the payload of insert operations and the node format of the
/// operation wire format: elements carry a `name`, text nodes carry `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelNode {
    Element {
        name: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: Attributes,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<ModelNode>,
    },
    Text {
        data: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: Attributes,
    },
}

impl ModelNode {
    pub fn element(name: impl Into<String>) -> Self {
        ModelNode::Element {
            name: name.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn text(data: impl Into<String>) -> Self {
        ModelNode::Text {
            data: data.into(),
            attributes: Attributes::new(),
        }
    }

    /// Builder: append a child (no-op for text)
    pub fn with_child(mut self, child: ModelNode) -> Self {
        if let ModelNode::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    /// Builder: append several children (no-op for text)
    pub fn with_children(mut self, new_children: impl IntoIterator<Item = ModelNode>) -> Self {
        if let ModelNode::Element { children, .. } = &mut self {
            children.extend(new_children);
        }
        self
    }

    /// Builder: set an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes_mut().insert(key.into(), value.into());
        self
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            ModelNode::Element { attributes, .. } | ModelNode::Text { attributes, .. } => attributes,
        }
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            ModelNode::Element { attributes, .. } | ModelNode::Text { attributes, .. } => attributes,
        }
    }

    pub fn offset_size(&self) -> usize {
        match self {
            ModelNode::Element { .. } => 1,
            ModelNode::Text { data, .. } => data.chars().count(),
        }
    }

    /// Merge adjacent text nodes with identical attributes
    pub fn normalize(nodes: Vec<ModelNode>) -> Vec<ModelNode> {
        let mut normalized: Vec<ModelNode> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let (
                Some(ModelNode::Text { data: prev, attributes: prev_attrs }),
                ModelNode::Text { data, attributes },
            ) = (normalized.last_mut(), &node)
            {
                if prev_attrs == attributes {
                    prev.push_str(data);
                    continue;
                }
            }
            normalized.push(node);
        }
        normalized
    }
}

/// Slice `data` by character offsets
pub(crate) fn char_slice(data: &str, from: usize, to: usize) -> &str {
    let mut indices = data.char_indices().map(|(i, _)| i).chain(std::iter::once(data.len()));
    let start = indices.nth(from).unwrap_or(data.len());
    let end = if to > from {
        indices.nth(to - from - 1).unwrap_or(data.len())
    } else {
        start
    };
    &data[start..end]
}

/// Node arena
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree containing only the detached graveyard root
    pub fn new() -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let graveyard = tree.create_root("$root", GRAVEYARD_NAME);
        debug_assert_eq!(graveyard, GRAVEYARD);
        tree.set_root_attached(graveyard, true);
        tree
    }

    fn node(&self, id: NodeId) -> ModelResult<&NodeData> {
        self.nodes.get(id.0).ok_or(ModelError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> ModelResult<&mut NodeData> {
        self.nodes.get_mut(id.0).ok_or(ModelError::NodeNotFound(id))
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    pub fn index(&self, id: NodeId) -> Option<usize> {
        self.node(id).ok().and_then(|n| n.index)
    }

    pub fn start_offset(&self, id: NodeId) -> Option<usize> {
        self.node(id).ok().and_then(|n| n.start_offset)
    }

    pub fn end_offset(&self, id: NodeId) -> Option<usize> {
        self.start_offset(id).map(|start| start + self.offset_size(id))
    }

    /// 1 for elements and fragments, the character count for text
    pub fn offset_size(&self, id: NodeId) -> usize {
        self.node(id).map(NodeData::offset_size).unwrap_or(0)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.kind), Ok(NodeKind::Element { .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.kind), Ok(NodeKind::Text { .. }))
    }

    pub fn is_fragment(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.kind), Ok(NodeKind::Fragment { .. }))
    }

    /// Element name
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).ok()?.kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Text data
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).ok()?.kind {
            NodeKind::Text { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn root_info(&self, id: NodeId) -> Option<&RootInfo> {
        match &self.node(id).ok()?.kind {
            NodeKind::Element { root, .. } => root.as_ref(),
            _ => None,
        }
    }

    pub fn children(&self, id: NodeId) -> Option<&NodeList> {
        match &self.node(id).ok()?.kind {
            NodeKind::Element { children, .. } | NodeKind::Fragment { children } => Some(children),
            NodeKind::Text { .. } => None,
        }
    }

    fn children_mut(&mut self, id: NodeId) -> ModelResult<&mut NodeList> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element { children, .. } | NodeKind::Fragment { children } => Ok(children),
            NodeKind::Text { .. } => Err(ModelError::NotAContainer(id)),
        }
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).and_then(|c| c.get(index))
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).map(NodeList::len).unwrap_or(0)
    }

    /// Sum of children's offset sizes (0 for text)
    pub fn max_offset(&self, id: NodeId) -> usize {
        self.children(id).map(NodeList::max_offset).unwrap_or(0)
    }

    pub fn attributes(&self, id: NodeId) -> Option<&Attributes> {
        self.node(id).ok().map(|n| &n.attributes)
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&Value> {
        self.attributes(id).and_then(|a| a.get(key))
    }

    pub fn has_attribute(&self, id: NodeId, key: &str) -> bool {
        self.attribute(id, key).is_some()
    }

    /// Topmost ancestor (the node itself when it has no parent)
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Ancestors from the root down to the parent, optionally ending with `id`
    pub fn ancestors(&self, id: NodeId, include_self: bool) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = if include_self { Some(id) } else { self.parent(id) };
        while let Some(node) = current {
            ancestors.push(node);
            current = self.parent(node);
        }
        ancestors.reverse();
        ancestors
    }

    /// Offset path from the root to `id`
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let (Some(parent), Some(offset)) = (self.parent(current), self.start_offset(current)) {
            path.push(offset);
            current = parent;
        }
        path.reverse();
        path
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.child(parent, self.index(id)? + 1)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index(id)?;
        index.checked_sub(1).and_then(|i| self.child(parent, i))
    }

    /// Whether two nodes belong to the same tree
    pub fn is_same_tree(&self, a: NodeId, b: NodeId) -> bool {
        let (root_a, root_b) = (self.root_of(a), self.root_of(b));
        root_a == root_b || (self.root_info(root_a).is_some() && self.root_info(root_b).is_some())
    }

    /// Owned copy of `id` and its subtree (fragments have no snapshot form)
    pub fn snapshot(&self, id: NodeId) -> ModelResult<ModelNode> {
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Element { name, children, .. } => Ok(ModelNode::Element {
                name: name.clone(),
                attributes: node.attributes.clone(),
                children: children
                    .iter()
                    .map(|child| self.snapshot(child))
                    .collect::<ModelResult<_>>()?,
            }),
            NodeKind::Text { data, .. } => Ok(ModelNode::Text {
                data: data.clone(),
                attributes: node.attributes.clone(),
            }),
            NodeKind::Fragment { .. } => Err(ModelError::NotAnElement(id)),
        }
    }

    /// Snapshots of the children of `id`
    pub fn snapshot_children(&self, id: NodeId) -> ModelResult<Vec<ModelNode>> {
        self.children(id)
            .ok_or(ModelError::NotAContainer(id))?
            .iter()
            .map(|child| self.snapshot(child))
            .collect()
    }

    /// Debug markup for a node. Roots and fragments print their children only.
    ///
    /// `<paragraph align="left">Foo<$text bold=true>bar</$text></paragraph>`
    pub fn stringify(&self, id: NodeId) -> String {
        let mut out = String::new();
        if self.root_info(id).is_some() || self.is_fragment(id) {
            for child in self.children(id).into_iter().flat_map(NodeList::iter) {
                self.write_node(child, &mut out);
            }
        } else {
            self.write_node(id, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Ok(node) = self.node(id) else {
            return;
        };
        let mut attrs = String::new();
        for (key, value) in &node.attributes {
            match value {
                Value::String(s) => {
                    let _ = write!(attrs, " {key}=\"{s}\"");
                }
                other => {
                    let _ = write!(attrs, " {key}={other}");
                }
            }
        }
        match &node.kind {
            NodeKind::Text { data, .. } if attrs.is_empty() => out.push_str(data),
            NodeKind::Text { data, .. } => {
                let _ = write!(out, "<$text{attrs}>{data}</$text>");
            }
            NodeKind::Element { name, children, .. } => {
                if children.is_empty() {
                    let _ = write!(out, "<{name}{attrs}></{name}>");
                } else {
                    let _ = write!(out, "<{name}{attrs}>");
                    for child in children.iter() {
                        self.write_node(child, out);
                    }
                    let _ = write!(out, "</{name}>");
                }
            }
            NodeKind::Fragment { children } => {
                for child in children.iter() {
                    self.write_node(child, out);
                }
            }
        }
    }

    // ── Construction ──────────────────────────────────────────────────────

    pub(crate) fn create_element(&mut self, name: impl Into<String>, attributes: Attributes) -> NodeId {
        self.alloc(NodeData::new(
            NodeKind::Element {
                name: name.into(),
                children: NodeList::new(),
                root: None,
            },
            attributes,
        ))
    }

    pub(crate) fn create_text(&mut self, data: impl Into<String>, attributes: Attributes) -> NodeId {
        let data = data.into();
        let len = data.chars().count();
        self.alloc(NodeData::new(NodeKind::Text { data, len }, attributes))
    }

    pub(crate) fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeData::new(
            NodeKind::Fragment {
                children: NodeList::new(),
            },
            Attributes::new(),
        ))
    }

    /// Create a detached root element
    pub(crate) fn create_root(&mut self, element_name: &str, root_name: &str) -> NodeId {
        self.alloc(NodeData::new(
            NodeKind::Element {
                name: element_name.to_string(),
                children: NodeList::new(),
                root: Some(RootInfo {
                    root_name: root_name.to_string(),
                    is_attached: false,
                }),
            },
            Attributes::new(),
        ))
    }

    /// Build a detached subtree from a snapshot
    pub(crate) fn materialize(&mut self, node: &ModelNode) -> ModelResult<NodeId> {
        match node {
            ModelNode::Text { data, attributes } => Ok(self.create_text(data.clone(), attributes.clone())),
            ModelNode::Element {
                name,
                attributes,
                children,
            } => {
                let element = self.create_element(name.clone(), attributes.clone());
                let children = children
                    .iter()
                    .map(|child| self.materialize(child))
                    .collect::<ModelResult<Vec<_>>>()?;
                self.insert_children(element, 0, &children)?;
                Ok(element)
            }
        }
    }

    /// Shallow copy of an element: same name and attributes, no children
    pub(crate) fn clone_element(&mut self, id: NodeId) -> ModelResult<NodeId> {
        let name = self.name(id).ok_or(ModelError::NotAnElement(id))?.to_string();
        let attributes = self.node(id)?.attributes.clone();
        Ok(self.create_element(name, attributes))
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Insert nodes as children of `parent` before `index`. Nodes that are
    /// still attached somewhere are detached from their old parent first.
    pub(crate) fn insert_children(&mut self, parent: NodeId, index: usize, nodes: &[NodeId]) -> ModelResult<()> {
        for &node in nodes {
            if self.node(node)?.parent.is_some() {
                self.remove_from_parent(node)?;
            }
        }

        let entries: Vec<(NodeId, usize)> = nodes.iter().map(|&n| (n, self.offset_size(n))).collect();
        self.children_mut(parent)?.insert_nodes(index, entries)?;
        for &node in nodes {
            self.node_mut(node)?.parent = Some(parent);
        }
        self.refresh_child_caches(parent, index)
    }

    /// Replace the data of a text node in place, keeping its parent's
    /// offsets in sync
    pub(crate) fn set_text(&mut self, id: NodeId, data: String) -> ModelResult<()> {
        if !self.is_text(id) {
            return Err(ModelError::NotAText(id));
        }
        let slot = self.parent(id).zip(self.index(id));
        if let Some((parent, index)) = slot {
            self.remove_children(parent, index, 1)?;
        }
        if let NodeKind::Text { data: current, len } = &mut self.node_mut(id)?.kind {
            *len = data.chars().count();
            *current = data;
        }
        match slot {
            Some((parent, index)) => self.insert_children(parent, index, &[id]),
            None => Ok(()),
        }
    }

    /// Remove `how_many` children of `parent` starting at `index`
    pub(crate) fn remove_children(&mut self, parent: NodeId, index: usize, how_many: usize) -> ModelResult<Vec<NodeId>> {
        let removed = self.children_mut(parent)?.remove_nodes(index, how_many)?;
        for &node in &removed {
            let data = self.node_mut(node)?;
            data.parent = None;
            data.index = None;
            data.start_offset = None;
        }
        self.refresh_child_caches(parent, index)?;
        Ok(removed)
    }

    pub(crate) fn remove_from_parent(&mut self, node: NodeId) -> ModelResult<()> {
        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        let index = self.index(node).ok_or(ModelError::NodeNotFound(node))?;
        self.children_mut(parent)?.remove_nodes_array(&[node]);
        let data = self.node_mut(node)?;
        data.parent = None;
        data.index = None;
        data.start_offset = None;
        self.refresh_child_caches(parent, index)
    }

    fn refresh_child_caches(&mut self, parent: NodeId, from: usize) -> ModelResult<()> {
        let updates: Vec<(NodeId, usize, usize)> = {
            let children = self.children(parent).ok_or(ModelError::NotAContainer(parent))?;
            (from..children.len())
                .filter_map(|i| Some((children.get(i)?, i, children.index_to_offset(i)?)))
                .collect()
        };
        for (node, index, start_offset) in updates {
            let data = self.node_mut(node)?;
            data.index = Some(index);
            data.start_offset = Some(start_offset);
        }
        Ok(())
    }

    pub(crate) fn set_attribute(&mut self, id: NodeId, key: &str, value: Value) -> ModelResult<()> {
        self.node_mut(id)?.attributes.insert(key.to_string(), value);
        Ok(())
    }

    pub(crate) fn remove_attribute(&mut self, id: NodeId, key: &str) -> ModelResult<()> {
        self.node_mut(id)?.attributes.remove(key);
        Ok(())
    }

    pub(crate) fn rename(&mut self, id: NodeId, new_name: &str) -> ModelResult<()> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element { name, .. } => {
                *name = new_name.to_string();
                Ok(())
            }
            _ => Err(ModelError::NotAnElement(id)),
        }
    }

    pub(crate) fn set_root_attached(&mut self, id: NodeId, attached: bool) {
        if let Ok(NodeKind::Element { root: Some(info), .. }) = self.node_mut(id).map(|n| &mut n.kind) {
            info.is_attached = attached;
        }
    }
}
