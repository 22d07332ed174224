use crate::document::Document;
use crate::errors::{ModelError, ModelResult};
use crate::position::{Position, Stickiness};
use crate::primitives::{self, NodeInput};
use crate::tree::{ModelNode, NodeId, GRAVEYARD};

use super::{next_version, Execute, MoveOperation, Operation, OperationKind, Reversible};

/// Insert nodes at a position.
///
/// The operation keeps its own snapshot of the inserted nodes; executing it
/// builds fresh nodes from the snapshot, so the operation can be replayed or
/// serialized after the tree has changed around the inserted content.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOperation {
    pub position: Position,
    pub nodes: Vec<ModelNode>,
    /// Whether inserted text should take attributes from its surroundings
    pub should_receive_attributes: bool,
    pub base_version: Option<u64>,
}

impl InsertOperation {
    pub fn new(position: Position, nodes: Vec<ModelNode>, base_version: Option<u64>) -> Self {
        Self {
            position: position.with_stickiness(Stickiness::ToNone),
            nodes: ModelNode::normalize(nodes),
            should_receive_attributes: false,
            base_version,
        }
    }

    /// Offset size of the inserted content
    pub fn how_many(&self) -> usize {
        self.nodes.iter().map(ModelNode::offset_size).sum()
    }

    /// Insert existing detached nodes whose snapshot is `self.nodes`
    pub(crate) fn execute_with_nodes(&self, doc: &mut Document, nodes: Vec<NodeId>) -> ModelResult<()> {
        primitives::insert(doc.tree_mut(), &self.position, NodeInput::from(nodes)).map(|_| ())
    }
}

impl OperationKind for InsertOperation {
    fn base_version(&self) -> Option<u64> {
        self.base_version
    }

    fn op_type(&self) -> &'static str {
        "insert"
    }

    fn class_name(&self) -> &'static str {
        "InsertOperation"
    }

    fn validate(&self, doc: &Document) -> ModelResult<()> {
        let tree = doc.tree();
        let parent = self
            .position
            .parent(tree)
            .map_err(|_| ModelError::InsertPositionInvalid)?;
        if tree.max_offset(parent) < self.position.offset() {
            return Err(ModelError::InsertPositionInvalid);
        }
        Ok(())
    }
}

impl Execute for InsertOperation {
    fn execute(&self, doc: &mut Document) -> ModelResult<()> {
        let tree = doc.tree_mut();
        let nodes = self
            .nodes
            .iter()
            .map(|node| tree.materialize(node))
            .collect::<ModelResult<Vec<_>>>()?;
        primitives::insert(tree, &self.position, NodeInput::from(nodes)).map(|_| ())
    }
}

impl Reversible for InsertOperation {
    fn get_reversed(&self) -> Operation {
        MoveOperation::new(
            self.position.clone(),
            self.how_many(),
            Position::new(GRAVEYARD, vec![0]),
            next_version(self.base_version),
        )
        .into()
    }
}
