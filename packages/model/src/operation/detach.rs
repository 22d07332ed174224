use crate::document::Document;
use crate::errors::{ModelError, ModelResult};
use crate::position::{Position, Stickiness};
use crate::primitives;
use crate::range::Range;

use super::{Execute, OperationKind};

/// Remove nodes from a tree that does not belong to the document.
///
/// Never versioned and never recorded in history. It deliberately does not
/// implement [`super::Reversible`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetachOperation {
    pub source_position: Position,
    pub how_many: usize,
}

impl DetachOperation {
    pub fn new(source_position: Position, how_many: usize) -> Self {
        Self {
            source_position: source_position.with_stickiness(Stickiness::ToNext),
            how_many,
        }
    }
}

impl OperationKind for DetachOperation {
    fn base_version(&self) -> Option<u64> {
        None
    }

    fn op_type(&self) -> &'static str {
        "detach"
    }

    fn class_name(&self) -> &'static str {
        "DetachOperation"
    }

    fn validate(&self, doc: &Document) -> ModelResult<()> {
        if doc.is_document_tree(self.source_position.root) {
            return Err(ModelError::DetachOnDocumentNode);
        }
        let tree = doc.tree();
        let parent = self.source_position.parent(tree)?;
        let end = self.source_position.offset().checked_add(self.how_many);
        if end.map_or(true, |end| end > tree.max_offset(parent)) {
            return Err(ModelError::MoveNodesDoNotExist);
        }
        Ok(())
    }
}

impl Execute for DetachOperation {
    fn execute(&self, doc: &mut Document) -> ModelResult<()> {
        let range = Range::from_position_and_shift(&self.source_position, self.how_many);
        primitives::remove(doc.tree_mut(), &range).map(|_| ())
    }
}
