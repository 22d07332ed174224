//! # Writer
//!
//! The only public way to change a document. A writer exists for the
//! duration of one change block; every method turns a high level intent into
//! operations, applies them and records the document ones in the block's
//! batch.
//!
//! Operations on trees that are not part of the document (freshly created
//! elements, fragments) carry no base version. They are executed but never
//! reach the history or the batch.

use serde_json::Value;

use crate::batch::{Batch, BatchType};
use crate::document::Document;
use crate::errors::{ModelError, ModelResult};
use crate::markers::Marker;
use crate::operation::{
    AttributeOperation, DetachOperation, InsertOperation, MarkerOperation, MergeOperation, MoveOperation, Operation,
    RenameOperation, RootAttributeOperation, RootOperation, SplitOperation,
};
use crate::position::Position;
use crate::range::Range;
use crate::tree::{Attributes, NodeId, GRAVEYARD};

/// A single node or a range of content
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOrRange {
    Item(NodeId),
    Range(Range),
}

impl From<NodeId> for ItemOrRange {
    fn from(node: NodeId) -> Self {
        ItemOrRange::Item(node)
    }
}

impl From<Range> for ItemOrRange {
    fn from(range: Range) -> Self {
        ItemOrRange::Range(range)
    }
}

impl From<&Range> for ItemOrRange {
    fn from(range: &Range) -> Self {
        ItemOrRange::Range(range.clone())
    }
}

/// Changes to an existing marker. Fields left `None` keep their value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerOptions {
    pub range: Option<Range>,
    pub using_operation: Option<bool>,
    pub affects_data: Option<bool>,
}

/// Result of [`Writer::split`]
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    /// Position between the last pair of split elements
    pub position: Position,
    /// From the end of the first split element to the start of its copy
    pub range: Range,
}

pub struct Writer<'a> {
    doc: &'a mut Document,
    batch: &'a mut Batch,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(doc: &'a mut Document, batch: &'a mut Batch) -> Self {
        Self { doc, batch }
    }

    pub fn document(&self) -> &Document {
        self.doc
    }

    pub fn batch(&self) -> &Batch {
        self.batch
    }

    pub fn root(&self, name: &str) -> ModelResult<NodeId> {
        self.doc
            .get_root(name)
            .ok_or_else(|| ModelError::RootNotFound(name.to_string()))
    }

    /// Version for an operation acting on the tree containing `node`
    fn version_for(&self, node: NodeId) -> Option<u64> {
        self.doc.is_document_tree(node).then(|| self.doc.version())
    }

    /// Apply `op` and add it to the batch
    pub fn apply_operation(&mut self, op: Operation) -> ModelResult<()> {
        self.doc.apply_operation(op.clone())?;
        self.batch.add_operation(op);
        Ok(())
    }

    /// Run `callback` in its own block once the current one has finished
    pub fn enqueue_change(
        &mut self,
        batch_type: BatchType,
        callback: impl FnOnce(&mut Writer<'_>) -> ModelResult<()> + 'static,
    ) {
        self.doc.push_pending(Batch::new(batch_type), Box::new(callback));
    }

    // ── Factories ─────────────────────────────────────────────────────────

    pub fn create_text(&mut self, data: &str, attributes: Attributes) -> NodeId {
        self.doc.tree_mut().create_text(data, attributes)
    }

    pub fn create_element(&mut self, name: &str, attributes: Attributes) -> NodeId {
        self.doc.tree_mut().create_element(name, attributes)
    }

    pub fn create_document_fragment(&mut self) -> NodeId {
        self.doc.tree_mut().create_fragment()
    }

    pub fn create_position_at(&self, parent: NodeId, offset: usize) -> Position {
        Position::at(self.doc.tree(), parent, offset)
    }

    pub fn create_position_at_end(&self, parent: NodeId) -> Position {
        Position::at_end(self.doc.tree(), parent)
    }

    pub fn create_position_before(&self, node: NodeId) -> ModelResult<Position> {
        Position::before(self.doc.tree(), node)
    }

    pub fn create_position_after(&self, node: NodeId) -> ModelResult<Position> {
        Position::after(self.doc.tree(), node)
    }

    pub fn create_range(&self, start: Position, end: Position) -> Range {
        Range::new(start, end)
    }

    pub fn create_range_in(&self, element: NodeId) -> Range {
        Range::create_in(self.doc.tree(), element)
    }

    pub fn create_range_on(&self, node: NodeId) -> ModelResult<Range> {
        Range::create_on(self.doc.tree(), node)
    }

    // ── Insertion ─────────────────────────────────────────────────────────

    /// Insert `item` at `position`.
    ///
    /// An item that already has a parent in the same tree is moved. One
    /// that sits in a different detached tree is taken out of it first. A
    /// fragment inserts its children.
    pub fn insert(&mut self, item: NodeId, position: &Position) -> ModelResult<()> {
        let tree = self.doc.tree();
        if tree.parent(item).is_some() {
            if tree.is_same_tree(item, position.root) {
                let range = Range::create_on(tree, item)?;
                return self.move_range(&range, position);
            }
            if self.doc.is_document_tree(item) {
                return Err(ModelError::WriterInsertForbiddenMove);
            }
            self.remove(item)?;
        }

        let tree = self.doc.tree();
        let nodes: Vec<NodeId> = if tree.is_fragment(item) {
            tree.children(item).map(|c| c.iter().collect()).unwrap_or_default()
        } else {
            vec![item]
        };
        let snapshot = nodes
            .iter()
            .map(|&node| tree.snapshot(node))
            .collect::<ModelResult<Vec<_>>>()?;

        let mut op = InsertOperation::new(position.clone(), snapshot, self.version_for(position.root));
        op.should_receive_attributes = tree.is_text(item);

        self.doc.apply_insert_with_nodes(op.clone(), nodes)?;
        self.batch.add_operation(op.into());
        Ok(())
    }

    pub fn insert_text(&mut self, data: &str, position: &Position) -> ModelResult<()> {
        self.insert_text_with_attributes(data, Attributes::new(), position)
    }

    pub fn insert_text_with_attributes(
        &mut self,
        data: &str,
        attributes: Attributes,
        position: &Position,
    ) -> ModelResult<()> {
        let text = self.create_text(data, attributes);
        self.insert(text, position)
    }

    /// Create an empty element, insert it and return it
    pub fn insert_element(&mut self, name: &str, position: &Position) -> ModelResult<NodeId> {
        let element = self.create_element(name, Attributes::new());
        self.insert(element, position)?;
        Ok(element)
    }

    /// Insert `item` at the end of `parent`
    pub fn append(&mut self, item: NodeId, parent: NodeId) -> ModelResult<()> {
        let position = self.create_position_at_end(parent);
        self.insert(item, &position)
    }

    // ── Attributes ────────────────────────────────────────────────────────

    pub fn set_attribute(&mut self, key: &str, value: Value, target: impl Into<ItemOrRange>) -> ModelResult<()> {
        self.change_attribute(key, Some(value), target.into())
    }

    pub fn set_attributes(&mut self, attributes: &Attributes, target: impl Into<ItemOrRange>) -> ModelResult<()> {
        let target = target.into();
        for (key, value) in attributes {
            self.change_attribute(key, Some(value.clone()), target.clone())?;
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, key: &str, target: impl Into<ItemOrRange>) -> ModelResult<()> {
        self.change_attribute(key, None, target.into())
    }

    /// Remove every attribute of the item, or of the shallow content of the range
    pub fn clear_attributes(&mut self, target: impl Into<ItemOrRange>) -> ModelResult<()> {
        let target = target.into();
        let tree = self.doc.tree();
        let mut keys: Vec<String> = Vec::new();
        match &target {
            ItemOrRange::Item(node) => {
                keys.extend(tree.attributes(*node).into_iter().flat_map(|a| a.keys().cloned()));
            }
            ItemOrRange::Range(range) => {
                for flat in range.minimal_flat_ranges(tree)? {
                    for item in flat.shallow_items(tree)? {
                        for key in tree.attributes(item.node()).into_iter().flat_map(|a| a.keys()) {
                            if !keys.contains(key) {
                                keys.push(key.clone());
                            }
                        }
                    }
                }
            }
        }
        for key in keys {
            self.change_attribute(&key, None, target.clone())?;
        }
        Ok(())
    }

    fn change_attribute(&mut self, key: &str, value: Option<Value>, target: ItemOrRange) -> ModelResult<()> {
        match target {
            ItemOrRange::Item(node) => self.change_attribute_on_item(key, value, node),
            ItemOrRange::Range(range) => {
                for flat in range.minimal_flat_ranges(self.doc.tree())? {
                    self.change_attribute_on_flat_range(key, value.clone(), &flat)?;
                }
                Ok(())
            }
        }
    }

    fn change_attribute_on_item(&mut self, key: &str, value: Option<Value>, node: NodeId) -> ModelResult<()> {
        let tree = self.doc.tree();
        let previous = tree.attribute(node, key).cloned();
        if previous == value {
            return Ok(());
        }
        let version = self.version_for(node);
        let op: Operation = if tree.parent(node).is_some() {
            AttributeOperation::new(Range::create_on(tree, node)?, key, previous, value, version).into()
        } else {
            RootAttributeOperation::new(node, key, previous, value, version).into()
        };
        self.apply_operation(op)
    }

    /// One operation per run of items sharing the same current value
    fn change_attribute_on_flat_range(&mut self, key: &str, value: Option<Value>, range: &Range) -> ModelResult<()> {
        let tree = self.doc.tree();
        let mut runs: Vec<(usize, usize, Option<Value>)> = Vec::new();
        let mut offset = range.start.offset();
        for item in range.shallow_items(tree)? {
            let current = tree.attribute(item.node(), key).cloned();
            let end = offset + item.offset_size(tree);
            match runs.last_mut() {
                Some((_, run_end, run_value)) if *run_value == current => *run_end = end,
                _ => runs.push((offset, end, current)),
            }
            offset = end;
        }

        for (start, end, previous) in runs {
            if previous == value {
                continue;
            }
            let run = Range::new(range.start.with_offset(start), range.start.with_offset(end));
            let version = self.version_for(range.root());
            self.apply_operation(AttributeOperation::new(run, key, previous, value.clone(), version).into())?;
        }
        Ok(())
    }

    // ── Structure ─────────────────────────────────────────────────────────

    /// Remove an item or a range. Document content goes to the graveyard,
    /// detached content is dropped.
    pub fn remove(&mut self, target: impl Into<ItemOrRange>) -> ModelResult<()> {
        let range = match target.into() {
            ItemOrRange::Item(node) => Range::create_on(self.doc.tree(), node)?,
            ItemOrRange::Range(range) => range,
        };
        let mut flat_ranges = range.minimal_flat_ranges(self.doc.tree())?;
        flat_ranges.reverse();
        for flat in flat_ranges {
            self.remove_flat(&flat.start, flat.how_many())?;
        }
        Ok(())
    }

    fn remove_flat(&mut self, position: &Position, how_many: usize) -> ModelResult<()> {
        let op: Operation = match self.version_for(position.root) {
            Some(version) => {
                MoveOperation::new(position.clone(), how_many, Position::new(GRAVEYARD, vec![0]), Some(version)).into()
            }
            None => DetachOperation::new(position.clone(), how_many).into(),
        };
        self.apply_operation(op)
    }

    /// Move a flat range to `position` within the same tree
    pub fn move_range(&mut self, range: &Range, position: &Position) -> ModelResult<()> {
        if !range.is_flat() {
            return Err(ModelError::RangeNotFlat);
        }
        if !self.doc.tree().is_same_tree(range.root(), position.root) {
            return Err(ModelError::WriterMoveDifferentDocument);
        }
        let version = self.version_for(range.root());
        self.apply_operation(MoveOperation::new(range.start.clone(), range.how_many(), position.clone(), version).into())
    }

    /// Merge the elements right before and after `position`
    pub fn merge(&mut self, position: &Position) -> ModelResult<()> {
        let tree = self.doc.tree();
        let before = position
            .node_before(tree)
            .filter(|&n| tree.is_element(n))
            .ok_or(ModelError::WriterMergeNoElementBefore)?;
        let after = position
            .node_after(tree)
            .filter(|&n| tree.is_element(n))
            .ok_or(ModelError::WriterMergeNoElementAfter)?;

        let target = Position::at_end(tree, before);
        let source = Position::at(tree, after, 0);

        match self.version_for(position.root) {
            Some(version) => {
                let how_many = tree.max_offset(after);
                let op = MergeOperation::new(source, how_many, target, Position::new(GRAVEYARD, vec![0]), Some(version));
                self.apply_operation(op.into())
            }
            None => {
                let content = Range::create_in(tree, after);
                self.move_range(&content, &target)?;
                self.remove(after)
            }
        }
    }

    pub fn rename(&mut self, element: NodeId, new_name: &str) -> ModelResult<()> {
        let tree = self.doc.tree();
        let old_name = tree.name(element).ok_or(ModelError::NotAnElement(element))?.to_string();
        let position = Position::before(tree, element)?;
        let version = self.version_for(element);
        self.apply_operation(RenameOperation::new(position, old_name, new_name, version).into())
    }

    /// Split the element containing `position`, and then its ancestors up to
    /// (not including) `limit`. Without a limit only the parent is split.
    pub fn split(&mut self, position: &Position, limit: Option<NodeId>) -> ModelResult<SplitResult> {
        let tree = self.doc.tree();
        let mut split_element = position.parent(tree)?;
        let split_parent = tree
            .parent(split_element)
            .ok_or(ModelError::WriterSplitElementNoParent)?;
        let limit = limit.unwrap_or(split_parent);
        if !tree.ancestors(split_element, false).contains(&limit) {
            return Err(ModelError::WriterSplitInvalidLimitElement);
        }

        let mut position = position.clone();
        let mut first: Option<(NodeId, NodeId)> = None;
        loop {
            let tree = self.doc.tree();
            let how_many = tree.max_offset(split_element).saturating_sub(position.offset());
            let insertion = SplitOperation::insertion_position_for(&position);
            let version = self.version_for(split_element);
            self.apply_operation(SplitOperation::new(position.clone(), how_many, insertion, None, version).into())?;

            let tree = self.doc.tree();
            if first.is_none() {
                let copy = tree
                    .next_sibling(split_element)
                    .ok_or(ModelError::NodeNotFound(split_element))?;
                first = Some((split_element, copy));
            }
            position = Position::after(tree, split_element)?;
            split_element = position.parent(tree)?;
            if split_element == limit {
                break;
            }
        }

        let tree = self.doc.tree();
        let (first_split, first_copy) = first.ok_or(ModelError::WriterSplitElementNoParent)?;
        let range = Range::new(Position::at_end(tree, first_split), Position::at(tree, first_copy, 0));
        Ok(SplitResult { position, range })
    }

    /// Wrap a flat range in a new element called `name`
    pub fn wrap(&mut self, range: &Range, name: &str) -> ModelResult<NodeId> {
        let element = self.create_element(name, Attributes::new());
        self.wrap_in(range, element)?;
        Ok(element)
    }

    /// Wrap a flat range in `element`, which must be empty and detached
    pub fn wrap_in(&mut self, range: &Range, element: NodeId) -> ModelResult<()> {
        if !range.is_flat() {
            return Err(ModelError::RangeNotFlat);
        }
        let tree = self.doc.tree();
        if tree.child_count(element) > 0 {
            return Err(ModelError::WriterWrapElementNotEmpty);
        }
        if tree.parent(element).is_some() {
            return Err(ModelError::WriterWrapElementAttached);
        }

        self.insert(element, &range.start)?;
        let shifted = Range::new(range.start.shifted_by(1), range.end.shifted_by(1));
        let target = self.create_position_at(element, 0);
        self.move_range(&shifted, &target)
    }

    /// Replace `element` with its children
    pub fn unwrap(&mut self, element: NodeId) -> ModelResult<()> {
        if self.doc.tree().parent(element).is_none() {
            return Err(ModelError::WriterUnwrapElementNoParent);
        }
        let content = self.create_range_in(element);
        let target = self.create_position_after(element)?;
        self.move_range(&content, &target)?;
        self.remove(element)
    }

    // ── Roots ─────────────────────────────────────────────────────────────

    /// Attach a root, creating it if needed
    pub fn add_root(&mut self, root_name: &str, element_name: &str) -> ModelResult<NodeId> {
        if let Some(root) = self.doc.get_root(root_name) {
            if self.doc.is_attached_root(root) {
                return Err(ModelError::WriterAddRootExists(root_name.to_string()));
            }
        }
        let version = self.doc.version();
        self.apply_operation(RootOperation::new(root_name, element_name, true, Some(version)).into())?;
        self.root(root_name)
    }

    /// Empty an attached root, drop its markers and attributes, then detach it
    pub fn detach_root(&mut self, root_name: &str) -> ModelResult<()> {
        let root = self
            .doc
            .get_root(root_name)
            .filter(|&root| self.doc.is_attached_root(root) && root != GRAVEYARD)
            .ok_or_else(|| ModelError::WriterDetachRootNoRoot(root_name.to_string()))?;

        let markers: Vec<String> = self.doc.markers().markers_in_root(root).map(|m| m.name.clone()).collect();
        for name in markers {
            self.remove_marker(&name)?;
        }

        let keys: Vec<String> = self
            .doc
            .tree()
            .attributes(root)
            .into_iter()
            .flat_map(|a| a.keys().cloned())
            .collect();
        for key in keys {
            self.remove_attribute(&key, root)?;
        }

        let content = self.create_range_in(root);
        if !content.is_collapsed() {
            self.remove(content)?;
        }

        let element_name = self.doc.tree().name(root).unwrap_or("$root").to_string();
        let version = self.doc.version();
        self.apply_operation(RootOperation::new(root_name, element_name, false, Some(version)).into())
    }

    // ── Markers ───────────────────────────────────────────────────────────

    pub fn add_marker(&mut self, name: &str, range: Range, using_operation: bool, affects_data: bool) -> ModelResult<()> {
        if self.doc.markers().has(name) {
            return Err(ModelError::MarkerExists(name.to_string()));
        }
        if using_operation {
            return self.apply_marker_operation(name, None, Some(range), affects_data);
        }
        self.set_marker_directly(name, range, affects_data);
        Ok(())
    }

    pub fn update_marker(&mut self, name: &str, options: MarkerOptions) -> ModelResult<()> {
        let marker = self
            .doc
            .markers()
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::MarkerNotFound(name.to_string()))?;

        if options == MarkerOptions::default() {
            return Err(ModelError::WriterUpdateMarkerWrongOptions);
        }

        let affects_data = options.affects_data.unwrap_or(marker.affects_data);
        let range = options.range.unwrap_or_else(|| marker.range.clone());

        match options.using_operation {
            Some(true) if !marker.managed_using_operations => {
                self.apply_marker_operation(name, None, Some(range), affects_data)
            }
            Some(false) if marker.managed_using_operations => {
                self.apply_marker_operation(name, Some(marker.range.clone()), None, affects_data)?;
                self.set_marker_directly(name, range, affects_data);
                Ok(())
            }
            _ if marker.managed_using_operations => {
                self.apply_marker_operation(name, Some(marker.range.clone()), Some(range), affects_data)
            }
            _ => {
                self.set_marker_directly(name, range, affects_data);
                Ok(())
            }
        }
    }

    pub fn remove_marker(&mut self, name: &str) -> ModelResult<()> {
        let marker = self
            .doc
            .markers()
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::MarkerNotFound(name.to_string()))?;

        if marker.managed_using_operations {
            return self.apply_marker_operation(name, Some(marker.range), None, marker.affects_data);
        }
        self.remove_marker_directly(&marker);
        Ok(())
    }

    fn apply_marker_operation(
        &mut self,
        name: &str,
        old_range: Option<Range>,
        new_range: Option<Range>,
        affects_data: bool,
    ) -> ModelResult<()> {
        let version = self.doc.version();
        self.apply_operation(MarkerOperation::new(name, old_range, new_range, affects_data, Some(version)).into())
    }

    fn set_marker_directly(&mut self, name: &str, range: Range, affects_data: bool) {
        let old_range = self.doc.markers().get(name).map(|m| m.range.clone());
        self.doc.markers_mut().set(name, range.clone(), false, affects_data);
        self.doc
            .differ_mut()
            .buffer_marker_change(name, old_range, Some(range), affects_data);
    }

    fn remove_marker_directly(&mut self, marker: &Marker) {
        self.doc.markers_mut().remove(&marker.name);
        self.doc
            .differ_mut()
            .buffer_marker_change(&marker.name, Some(marker.range.clone()), None, marker.affects_data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ModelNode;
    use serde_json::json;

    fn doc_with(nodes: Vec<ModelNode>) -> Document {
        let mut doc = Document::new();
        let root = doc.get_root("main").unwrap();
        doc.apply_operation(InsertOperation::new(Position::new(root, vec![0]), nodes, Some(0)).into())
            .unwrap();
        doc
    }

    fn paragraphs() -> Document {
        doc_with(vec![
            ModelNode::element("p").with_child(ModelNode::text("Foo")),
            ModelNode::element("p").with_child(ModelNode::text("bar")),
        ])
    }

    fn main(doc: &Document) -> NodeId {
        doc.get_root("main").unwrap()
    }

    #[test]
    fn test_insert_text_and_element() {
        let mut doc = Document::new();
        let batch = doc
            .change_in_batch(Batch::default(), |writer| {
                let root = writer.root("main")?;
                let p = writer.insert_element("paragraph", &Position::new(root, vec![0]))?;
                writer.insert_text("Hi", &writer.create_position_at(p, 0))?;
                Ok(p)
            })
            .unwrap()
            .1;

        assert_eq!(doc.stringify_root("main").unwrap(), "<paragraph>Hi</paragraph>");
        assert_eq!(batch.operations().len(), 2);
        assert_eq!(doc.version(), 2);
    }

    #[test]
    fn test_building_detached_content_is_not_recorded() {
        let mut doc = Document::new();
        let (_, batch) = doc
            .change_in_batch(Batch::default(), |writer| {
                let p = writer.create_element("paragraph", Attributes::new());
                writer.insert_text("abc", &writer.create_position_at(p, 0))?;
                writer.append(p, writer.root("main")?)
            })
            .unwrap();

        assert_eq!(doc.stringify_root("main").unwrap(), "<paragraph>abc</paragraph>");
        assert_eq!(batch.operations().len(), 1);
        assert_eq!(batch.operations()[0].class_name(), "InsertOperation");
    }

    #[test]
    fn test_insert_fragment_inserts_children() {
        let mut doc = Document::new();
        doc.change(|writer| {
            let fragment = writer.create_document_fragment();
            let a = writer.create_element("a", Attributes::new());
            let b = writer.create_element("b", Attributes::new());
            writer.append(a, fragment)?;
            writer.append(b, fragment)?;
            let root = writer.root("main")?;
            writer.insert(fragment, &Position::new(root, vec![0]))
        })
        .unwrap();
        assert_eq!(doc.stringify_root("main").unwrap(), "<a></a><b></b>");
    }

    #[test]
    fn test_insert_attached_node_moves_it() {
        let mut doc = paragraphs();
        let (_, batch) = doc
            .change_in_batch(Batch::default(), |writer| {
                let root = writer.root("main")?;
                let first = writer.document().tree().child(root, 0).unwrap();
                writer.insert(first, &Position::new(root, vec![2]))
            })
            .unwrap();
        assert_eq!(doc.stringify_root("main").unwrap(), "<p>bar</p><p>Foo</p>");
        assert_eq!(batch.operations()[0].op_type(), "move");
    }

    #[test]
    fn test_insert_document_node_into_detached_tree_fails() {
        let mut doc = paragraphs();
        let err = doc
            .change(|writer| {
                let root = writer.root("main")?;
                let first = writer.document().tree().child(root, 0).unwrap();
                let div = writer.create_element("div", Attributes::new());
                writer.append(first, div)
            })
            .unwrap_err();
        assert_eq!(err, ModelError::WriterInsertForbiddenMove);
    }

    #[test]
    fn test_set_attribute_on_range_groups_by_value() {
        let mut doc = doc_with(vec![
            ModelNode::text("ab"),
            ModelNode::text("cd").with_attribute("bold", true),
            ModelNode::text("ef"),
        ]);
        let root = main(&doc);
        let (_, batch) = doc
            .change_in_batch(Batch::default(), |writer| {
                let range = Range::new(Position::new(root, vec![1]), Position::new(root, vec![5]));
                writer.set_attribute("bold", json!(true), range)
            })
            .unwrap();

        assert_eq!(doc.stringify_root("main").unwrap(), "a<$text bold=true>bcde</$text>f");
        assert_eq!(batch.operations().len(), 2);
        assert!(batch.operations().iter().all(|op| op.op_type() == "addAttribute"));
    }

    #[test]
    fn test_set_attribute_on_nested_range() {
        let mut doc = paragraphs();
        let root = main(&doc);
        doc.change(|writer| {
            let range = Range::new(Position::new(root, vec![0, 1]), Position::new(root, vec![1, 2]));
            writer.set_attribute("x", json!(1), range)
        })
        .unwrap();
        assert_eq!(
            doc.stringify_root("main").unwrap(),
            "<p>F<$text x=1>oo</$text></p><p><$text x=1>ba</$text>r</p>"
        );
    }

    #[test]
    fn test_attributes_on_items_and_roots() {
        let mut doc = paragraphs();
        let root = main(&doc);
        let (_, batch) = doc
            .change_in_batch(Batch::default(), |writer| {
                let p = writer.document().tree().child(root, 0).unwrap();
                let mut attributes = Attributes::new();
                attributes.insert("align".into(), json!("left"));
                attributes.insert("indent".into(), json!(2));
                writer.set_attributes(&attributes, p)?;
                writer.set_attribute("lang", json!("en"), root)?;
                writer.set_attribute("lang", json!("en"), root)?;
                writer.remove_attribute("indent", p)
            })
            .unwrap();

        assert_eq!(
            doc.stringify_root("main").unwrap(),
            r#"<p align="left">Foo</p><p>bar</p>"#
        );
        assert_eq!(doc.tree().attribute(root, "lang"), Some(&json!("en")));
        let types: Vec<_> = batch.operations().iter().map(Operation::op_type).collect();
        assert_eq!(types, vec!["addAttribute", "addAttribute", "addRootAttribute", "removeAttribute"]);
    }

    #[test]
    fn test_clear_attributes() {
        let mut doc = doc_with(vec![ModelNode::text("ab").with_attribute("bold", true).with_attribute("x", 1)]);
        let root = main(&doc);
        doc.change(|writer| writer.clear_attributes(writer.create_range_in(root))).unwrap();
        assert_eq!(doc.stringify_root("main").unwrap(), "ab");
    }

    #[test]
    fn test_remove_goes_to_graveyard() {
        let mut doc = paragraphs();
        let root = main(&doc);
        doc.change(|writer| {
            let range = Range::new(Position::new(root, vec![0, 1]), Position::new(root, vec![1, 1]));
            writer.remove(range)
        })
        .unwrap();

        assert_eq!(doc.stringify_root("main").unwrap(), "<p>F</p><p>ar</p>");
        assert_eq!(doc.stringify_root("$graveyard").unwrap(), "oob");
        assert_eq!(doc.version(), 3);
    }

    #[test]
    fn test_remove_in_detached_tree_uses_detach() {
        let mut doc = Document::new();
        let (_, batch) = doc
            .change_in_batch(Batch::default(), |writer| {
                let p = writer.create_element("p", Attributes::new());
                writer.insert_text("abc", &writer.create_position_at(p, 0))?;
                let range = Range::new(writer.create_position_at(p, 0), writer.create_position_at(p, 2));
                writer.remove(range)?;
                Ok(writer.document().tree().stringify(p))
            })
            .unwrap();
        assert_eq!(doc.version(), 0);
        assert!(batch.operations().is_empty());
        assert_eq!(doc.stringify_root("$graveyard").unwrap(), "");
    }

    #[test]
    fn test_move_range_rules() {
        let mut doc = paragraphs();
        let root = main(&doc);

        let err = doc
            .change(|writer| {
                let range = Range::new(Position::new(root, vec![0, 0]), Position::new(root, vec![1]));
                writer.move_range(&range, &Position::new(root, vec![2]))
            })
            .unwrap_err();
        assert_eq!(err, ModelError::RangeNotFlat);

        let err = doc
            .change(|writer| {
                let div = writer.create_element("div", Attributes::new());
                let range = Range::new(Position::new(root, vec![0]), Position::new(root, vec![1]));
                writer.move_range(&range, &writer.create_position_at(div, 0))
            })
            .unwrap_err();
        assert_eq!(err.code(), "writer-move-different-document");
    }

    #[test]
    fn test_merge() {
        let mut doc = paragraphs();
        let root = main(&doc);
        let (_, batch) = doc
            .change_in_batch(Batch::default(), |writer| writer.merge(&Position::new(root, vec![1])))
            .unwrap();
        assert_eq!(doc.stringify_root("main").unwrap(), "<p>Foobar</p>");
        assert_eq!(batch.operations()[0].class_name(), "MergeOperation");

        let err = doc.change(|writer| writer.merge(&Position::new(root, vec![0]))).unwrap_err();
        assert_eq!(err, ModelError::WriterMergeNoElementBefore);
    }

    #[test]
    fn test_merge_detached() {
        let mut doc = Document::new();
        let out = doc
            .change(|writer| {
                let div = writer.create_element("div", Attributes::new());
                for text in ["ab", "cd"] {
                    let p = writer.create_element("p", Attributes::new());
                    writer.insert_text(text, &writer.create_position_at(p, 0))?;
                    writer.append(p, div)?;
                }
                writer.merge(&writer.create_position_at(div, 1))?;
                Ok(writer.document().tree().stringify(div))
            })
            .unwrap();
        assert_eq!(out, "<div><p>abcd</p></div>");
    }

    #[test]
    fn test_rename() {
        let mut doc = paragraphs();
        let root = main(&doc);
        doc.change(|writer| {
            let p = writer.document().tree().child(root, 1).unwrap();
            writer.rename(p, "heading")
        })
        .unwrap();
        assert_eq!(doc.stringify_root("main").unwrap(), "<p>Foo</p><heading>bar</heading>");
    }

    #[test]
    fn test_split_single_level() {
        let mut doc = paragraphs();
        let root = main(&doc);
        let result = doc.change(|writer| writer.split(&Position::new(root, vec![0, 1]), None)).unwrap();

        assert_eq!(doc.stringify_root("main").unwrap(), "<p>F</p><p>oo</p><p>bar</p>");
        assert_eq!(result.position.path, vec![1]);
        assert_eq!(result.range.start.path, vec![0, 1]);
        assert_eq!(result.range.end.path, vec![1, 0]);
    }

    #[test]
    fn test_split_up_to_limit() {
        let mut doc = doc_with(vec![ModelNode::element("quote")
            .with_child(ModelNode::element("p").with_child(ModelNode::text("abcd")))]);
        let root = main(&doc);
        let result = doc
            .change(|writer| writer.split(&Position::new(root, vec![0, 0, 2]), Some(root)))
            .unwrap();

        assert_eq!(
            doc.stringify_root("main").unwrap(),
            "<quote><p>ab</p></quote><quote><p>cd</p></quote>"
        );
        assert_eq!(result.position.path, vec![1]);
    }

    #[test]
    fn test_split_errors() {
        let mut doc = paragraphs();
        let root = main(&doc);
        let err = doc.change(|writer| writer.split(&Position::new(root, vec![0]), None)).unwrap_err();
        assert_eq!(err, ModelError::WriterSplitElementNoParent);

        let err = doc
            .change(|writer| {
                let other = writer.document().tree().child(root, 1).unwrap();
                writer.split(&Position::new(root, vec![0, 1]), Some(other))
            })
            .unwrap_err();
        assert_eq!(err, ModelError::WriterSplitInvalidLimitElement);
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let mut doc = paragraphs();
        let root = main(&doc);
        let quote = doc
            .change(|writer| {
                let range = Range::new(Position::new(root, vec![0]), Position::new(root, vec![2]));
                writer.wrap(&range, "quote")
            })
            .unwrap();
        assert_eq!(doc.stringify_root("main").unwrap(), "<quote><p>Foo</p><p>bar</p></quote>");

        doc.change(|writer| writer.unwrap(quote)).unwrap();
        assert_eq!(doc.stringify_root("main").unwrap(), "<p>Foo</p><p>bar</p>");
    }

    #[test]
    fn test_wrap_in_rejects_non_empty_element() {
        let mut doc = paragraphs();
        let root = main(&doc);
        let err = doc
            .change(|writer| {
                let element = writer.create_element("quote", Attributes::new());
                writer.insert_text("x", &writer.create_position_at(element, 0))?;
                let range = Range::new(Position::new(root, vec![0]), Position::new(root, vec![1]));
                writer.wrap_in(&range, element)
            })
            .unwrap_err();
        assert_eq!(err, ModelError::WriterWrapElementNotEmpty);
    }

    #[test]
    fn test_add_and_detach_root() {
        let mut doc = Document::new();
        doc.change(|writer| {
            let sidebar = writer.add_root("sidebar", "$root")?;
            writer.insert_text("x", &writer.create_position_at(sidebar, 0))?;
            writer.set_attribute("order", json!(2), sidebar)
        })
        .unwrap();
        assert_eq!(doc.root_names(false), vec!["main".to_string(), "sidebar".to_string()]);

        let err = doc.change(|writer| writer.add_root("sidebar", "$root").map(|_| ())).unwrap_err();
        assert_eq!(err, ModelError::WriterAddRootExists("sidebar".into()));

        doc.change(|writer| writer.detach_root("sidebar")).unwrap();
        let sidebar = doc.get_root("sidebar").unwrap();
        assert_eq!(doc.root_names(false), vec!["main".to_string()]);
        assert_eq!(doc.stringify_root("sidebar").unwrap(), "");
        assert_eq!(doc.tree().attribute(sidebar, "order"), None);

        let err = doc.change(|writer| writer.detach_root("sidebar")).unwrap_err();
        assert_eq!(err.code(), "writer-detachroot-no-root");
    }

    #[test]
    fn test_markers() {
        let mut doc = paragraphs();
        let root = main(&doc);
        let range = Range::new(Position::new(root, vec![0, 0]), Position::new(root, vec![0, 2]));
        let other = Range::new(Position::new(root, vec![1, 0]), Position::new(root, vec![1, 1]));

        let (_, batch) = doc
            .change_in_batch(Batch::default(), |writer| {
                writer.add_marker("comment:1", range.clone(), true, false)?;
                writer.add_marker("highlight", range.clone(), false, false)
            })
            .unwrap();
        assert_eq!(batch.operations().len(), 1);
        assert!(doc.markers().get("comment:1").unwrap().managed_using_operations);
        assert!(!doc.markers().get("highlight").unwrap().managed_using_operations);

        let err = doc
            .change(|writer| writer.add_marker("highlight", range.clone(), false, false))
            .unwrap_err();
        assert_eq!(err, ModelError::MarkerExists("highlight".into()));

        doc.change(|writer| {
            writer.update_marker(
                "comment:1",
                MarkerOptions {
                    range: Some(other.clone()),
                    ..Default::default()
                },
            )?;
            writer.update_marker(
                "highlight",
                MarkerOptions {
                    using_operation: Some(true),
                    ..Default::default()
                },
            )
        })
        .unwrap();
        assert_eq!(doc.markers().get("comment:1").unwrap().range, other);
        assert!(doc.markers().get("highlight").unwrap().managed_using_operations);

        let err = doc
            .change(|writer| writer.update_marker("highlight", MarkerOptions::default()))
            .unwrap_err();
        assert_eq!(err.code(), "writer-updatemarker-wrong-options");

        doc.change(|writer| {
            writer.remove_marker("comment:1")?;
            writer.remove_marker("highlight")
        })
        .unwrap();
        assert!(doc.markers().is_empty());

        let err = doc.change(|writer| writer.remove_marker("comment:1")).unwrap_err();
        assert_eq!(err.code(), "writer-marker-not-exists");
    }
}
