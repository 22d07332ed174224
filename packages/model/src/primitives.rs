//! # Tree Mutation Primitives
//!
//! The only code paths that change the structure of a tree. Operations call
//! these after validating their geometry, so the primitives assume valid
//! positions and only check range flatness themselves.
//!
//! Text is kept canonical: no two adjacent text nodes ever share the same
//! attributes once a primitive returns. Splitting text keeps the first half
//! in the original node; merging appends to the left node in place.

use serde_json::Value;

use crate::errors::{ModelError, ModelResult};
use crate::position::Position;
use crate::range::{Range, RangeItem};
use crate::tree::{char_slice, NodeId, Tree};

/// Anything that can be inserted into a tree
#[derive(Debug, Clone)]
pub enum NodeInput {
    Node(NodeId),
    Text(String),
    /// Part of an existing text node, copied into a new one
    TextProxy {
        text: NodeId,
        offset_in_text: usize,
        len: usize,
    },
    /// Children of a fragment or element container
    Fragment(NodeId),
    Many(Vec<NodeInput>),
}

impl From<NodeId> for NodeInput {
    fn from(node: NodeId) -> Self {
        NodeInput::Node(node)
    }
}

impl From<Vec<NodeId>> for NodeInput {
    fn from(nodes: Vec<NodeId>) -> Self {
        NodeInput::Many(nodes.into_iter().map(NodeInput::Node).collect())
    }
}

impl From<&str> for NodeInput {
    fn from(text: &str) -> Self {
        NodeInput::Text(text.to_string())
    }
}

impl From<RangeItem> for NodeInput {
    fn from(item: RangeItem) -> Self {
        match item {
            RangeItem::Node(node) => NodeInput::Node(node),
            RangeItem::TextProxy {
                text,
                offset_in_text,
                len,
            } => NodeInput::TextProxy {
                text,
                offset_in_text,
                len,
            },
        }
    }
}

/// Flatten `input` into a node sequence, merging adjacent text with equal
/// attributes
pub(crate) fn normalize_nodes(tree: &mut Tree, input: NodeInput) -> ModelResult<Vec<NodeId>> {
    let mut flat = Vec::new();
    flatten(tree, input, &mut flat)?;

    let mut normalized: Vec<NodeId> = Vec::with_capacity(flat.len());
    for node in flat {
        if let Some(&prev) = normalized.last() {
            if tree.is_text(prev) && tree.is_text(node) && tree.attributes(prev) == tree.attributes(node) {
                tree.remove_from_parent(prev)?;
                merge_text_nodes(tree, prev, node)?;
                continue;
            }
        }
        normalized.push(node);
    }
    Ok(normalized)
}

fn flatten(tree: &mut Tree, input: NodeInput, out: &mut Vec<NodeId>) -> ModelResult<()> {
    match input {
        NodeInput::Node(node) => {
            if !tree.contains(node) {
                return Err(ModelError::NodeNotFound(node));
            }
            out.push(node);
        }
        NodeInput::Text(data) => out.push(tree.create_text(data, Default::default())),
        NodeInput::TextProxy {
            text,
            offset_in_text,
            len,
        } => {
            let data = tree.text(text).ok_or(ModelError::NodeNotFound(text))?;
            let data = char_slice(data, offset_in_text, offset_in_text + len).to_string();
            let attributes = tree.attributes(text).cloned().unwrap_or_default();
            out.push(tree.create_text(data, attributes));
        }
        NodeInput::Fragment(container) => {
            let children = tree.children(container).ok_or(ModelError::NotAContainer(container))?;
            out.extend(children.iter());
        }
        NodeInput::Many(inputs) => {
            for input in inputs {
                flatten(tree, input, out)?;
            }
        }
    }
    Ok(())
}

/// Append `b`'s data to `a` in place and detach `b`
fn merge_text_nodes(tree: &mut Tree, a: NodeId, b: NodeId) -> ModelResult<()> {
    let data = format!("{}{}", tree.text(a).unwrap_or_default(), tree.text(b).unwrap_or_default());
    tree.remove_from_parent(b)?;
    tree.set_text(a, data)
}

/// Insert `nodes` at `position` and return the range they occupy
pub(crate) fn insert(tree: &mut Tree, position: &Position, nodes: NodeInput) -> ModelResult<Range> {
    let nodes = normalize_nodes(tree, nodes)?;
    let offset: usize = nodes.iter().map(|&n| tree.offset_size(n)).sum();
    let parent = position.parent(tree)?;

    split_node_at_position(tree, position)?;
    let index = position.index(tree)?;

    tree.insert_children(parent, index, &nodes)?;
    merge_nodes_at_index(tree, parent, index + nodes.len())?;
    merge_nodes_at_index(tree, parent, index)?;

    Ok(Range::from_position_and_shift(position, offset))
}

/// Remove the content of a flat range and return the removed nodes
pub(crate) fn remove(tree: &mut Tree, range: &Range) -> ModelResult<Vec<NodeId>> {
    if !range.is_flat() {
        return Err(ModelError::RangeNotFlat);
    }
    let parent = range.start.parent(tree)?;

    split_node_at_position(tree, &range.start)?;
    split_node_at_position(tree, &range.end)?;

    let start_index = range.start.index(tree)?;
    let end_index = range.end.index(tree)?;
    let removed = tree.remove_children(parent, start_index, end_index - start_index)?;

    merge_nodes_at_index(tree, parent, start_index)?;
    Ok(removed)
}

/// Move the content of a flat range to `target` and return its new range
pub(crate) fn move_range(tree: &mut Tree, source: &Range, target: &Position) -> ModelResult<Range> {
    if !source.is_flat() {
        return Err(ModelError::RangeNotFlat);
    }
    let nodes = remove(tree, source)?;
    let target = target
        .transformed_by_deletion(&source.start, source.how_many())
        .ok_or(ModelError::MoveRangeIntoItself)?;
    insert(tree, &target, NodeInput::from(nodes))
}

/// Set (`Some`) or remove (`None`) `key` on the shallow items of `range`
pub(crate) fn set_attribute(tree: &mut Tree, range: &Range, key: &str, value: Option<&Value>) -> ModelResult<()> {
    split_node_at_position(tree, &range.start)?;
    split_node_at_position(tree, &range.end)?;

    for item in range.shallow_items(tree)? {
        let node = item.node();
        match value {
            Some(value) => tree.set_attribute(node, key, value.clone())?,
            None => tree.remove_attribute(node, key)?,
        }
        if let (Some(parent), Some(index)) = (tree.parent(node), tree.index(node)) {
            merge_nodes_at_index(tree, parent, index)?;
        }
    }

    let end_parent = range.end.parent(tree)?;
    let end_index = range.end.index(tree)?;
    merge_nodes_at_index(tree, end_parent, end_index)
}

/// Merge the text nodes on both sides of `index` if their attributes match
fn merge_nodes_at_index(tree: &mut Tree, element: NodeId, index: usize) -> ModelResult<()> {
    let Some(before_index) = index.checked_sub(1) else {
        return Ok(());
    };
    let (Some(before), Some(after)) = (tree.child(element, before_index), tree.child(element, index)) else {
        return Ok(());
    };
    if !(tree.is_text(before) && tree.is_text(after)) || tree.attributes(before) != tree.attributes(after) {
        return Ok(());
    }

    merge_text_nodes(tree, before, after)
}

/// Split the text node `position` is inside of, if any
fn split_node_at_position(tree: &mut Tree, position: &Position) -> ModelResult<()> {
    let Some(text) = position.text_node(tree) else {
        return Ok(());
    };
    let element = position.parent(tree)?;
    let start = tree.start_offset(text).ok_or(ModelError::NodeNotFound(text))?;
    let index = tree.index(text).ok_or(ModelError::NodeNotFound(text))?;
    let split_at = position.offset() - start;

    let data = tree.text(text).unwrap_or_default().to_string();
    let attributes = tree.attributes(text).cloned().unwrap_or_default();
    let len = tree.offset_size(text);

    tree.remove_children(element, index, 1)?;
    tree.set_text(text, char_slice(&data, 0, split_at).to_string())?;
    let second = tree.create_text(char_slice(&data, split_at, len), attributes);
    tree.insert_children(element, index, &[text, second])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Attributes, ModelNode, GRAVEYARD};

    fn fixture(children: Vec<ModelNode>) -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.create_root("$root", "main");
        let p = tree.materialize(&ModelNode::element("p").with_children(children)).unwrap();
        tree.insert_children(root, 0, &[p]).unwrap();
        (tree, root, p)
    }

    #[test]
    fn test_insert_text_merges_with_neighbours() {
        let (mut tree, root, p) = fixture(vec![ModelNode::text("Foo")]);
        let range = insert(&mut tree, &Position::new(root, vec![0, 1]), NodeInput::from("xx")).unwrap();

        assert_eq!(range.end.path, vec![0, 3]);
        assert_eq!(tree.child_count(p), 1);
        assert_eq!(tree.stringify(p), "<p>Fxxoo</p>");
    }

    #[test]
    fn test_insert_element_splits_text() {
        let (mut tree, root, p) = fixture(vec![ModelNode::text("Foo")]);
        let img = tree.create_element("img", Attributes::new());
        insert(&mut tree, &Position::new(root, vec![0, 2]), NodeInput::Node(img)).unwrap();

        assert_eq!(tree.stringify(p), "<p>Fo<img></img>o</p>");
        assert_eq!(tree.index(img), Some(1));
    }

    #[test]
    fn test_remove_requires_flat_range() {
        let (mut tree, root, _) = fixture(vec![ModelNode::text("Foo")]);
        let range = Range::new(Position::new(root, vec![0, 1]), Position::new(root, vec![1]));
        assert_eq!(remove(&mut tree, &range).unwrap_err(), ModelError::RangeNotFlat);
    }

    #[test]
    fn test_remove_middle_of_text_remerges() {
        let (mut tree, root, p) = fixture(vec![ModelNode::text("Foobar")]);
        let range = Range::new(Position::new(root, vec![0, 2]), Position::new(root, vec![0, 4]));
        let removed = remove(&mut tree, &range).unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(tree.text(removed[0]), Some("ob"));
        assert_eq!(tree.child_count(p), 1);
        assert_eq!(tree.stringify(p), "<p>Foar</p>");
    }

    #[test]
    fn test_move_to_graveyard() {
        let (mut tree, root, p) = fixture(vec![ModelNode::text("abc"), ModelNode::element("img")]);
        let source = Range::new(Position::new(root, vec![0, 1]), Position::new(root, vec![0, 3]));
        let range = move_range(&mut tree, &source, &Position::new(GRAVEYARD, vec![0])).unwrap();

        assert_eq!(range.start.path, vec![0]);
        assert_eq!(tree.stringify(p), "<p>a<img></img></p>");
        assert_eq!(tree.stringify(GRAVEYARD), "bc");
    }

    #[test]
    fn test_move_forward_in_same_parent() {
        let (mut tree, root, p) = fixture(vec![
            ModelNode::element("a"),
            ModelNode::element("b"),
            ModelNode::element("c"),
        ]);
        let source = Range::from_position_and_shift(&Position::new(root, vec![0, 0]), 1);
        move_range(&mut tree, &source, &Position::new(root, vec![0, 3])).unwrap();
        assert_eq!(tree.stringify(p), "<p><b></b><c></c><a></a></p>");
    }

    #[test]
    fn test_set_attribute_on_part_of_text() {
        let (mut tree, root, p) = fixture(vec![ModelNode::text("Foobar")]);
        let range = Range::new(Position::new(root, vec![0, 3]), Position::new(root, vec![0, 6]));
        set_attribute(&mut tree, &range, "bold", Some(&Value::Bool(true))).unwrap();
        assert_eq!(tree.stringify(p), "<p>Foo<$text bold=true>bar</$text></p>");

        set_attribute(&mut tree, &range, "bold", None).unwrap();
        assert_eq!(tree.child_count(p), 1);
        assert_eq!(tree.stringify(p), "<p>Foobar</p>");
    }

    #[test]
    fn test_split_and_merge_reuse_the_left_text_node() {
        let (mut tree, root, p) = fixture(vec![ModelNode::text("Foobar")]);
        let text = tree.child(p, 0).unwrap();
        let range = Range::new(Position::new(root, vec![0, 3]), Position::new(root, vec![0, 6]));

        set_attribute(&mut tree, &range, "bold", Some(&Value::Bool(true))).unwrap();
        assert_eq!(tree.child(p, 0), Some(text));
        assert_eq!(tree.text(text), Some("Foo"));

        set_attribute(&mut tree, &range, "bold", None).unwrap();
        assert_eq!(tree.child(p, 0), Some(text));
        assert_eq!(tree.text(text), Some("Foobar"));
        assert_eq!(tree.max_offset(p), 6);
    }

    #[test]
    fn test_normalize_nodes_flattens_and_merges() {
        let mut tree = Tree::new();
        let fragment = tree.create_fragment();
        let a = tree.create_text("a", Attributes::new());
        let img = tree.create_element("img", Attributes::new());
        tree.insert_children(fragment, 0, &[a, img]).unwrap();
        let source = tree.create_text("xyz", Attributes::new());

        let nodes = normalize_nodes(
            &mut tree,
            NodeInput::Many(vec![
                NodeInput::Text("b".into()),
                NodeInput::Fragment(fragment),
                NodeInput::TextProxy {
                    text: source,
                    offset_in_text: 1,
                    len: 2,
                },
            ]),
        )
        .unwrap();

        assert_eq!(nodes.len(), 3);
        assert_eq!(tree.text(nodes[0]), Some("ba"));
        assert_eq!(tree.parent(a), None);
        assert_eq!(tree.child_count(fragment), 1);
        assert_eq!(nodes[1], img);
        assert_eq!(tree.text(nodes[2]), Some("yz"));
    }
}
