use crate::document::Document;
use crate::errors::{ModelError, ModelResult};
use crate::position::{compare_arrays, ArrayRelation, Position, Stickiness};
use crate::primitives;
use crate::range::Range;
use crate::tree::GRAVEYARD;

use super::{next_version, Execute, Operation, OperationKind, Reversible};

/// Move `how_many` offsets starting at `source_position` to `target_position`.
/// Moving into the graveyard is how content gets removed.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOperation {
    pub source_position: Position,
    pub how_many: usize,
    pub target_position: Position,
    pub base_version: Option<u64>,
}

impl MoveOperation {
    pub fn new(source_position: Position, how_many: usize, target_position: Position, base_version: Option<u64>) -> Self {
        Self {
            source_position: source_position.with_stickiness(Stickiness::ToNext),
            how_many,
            target_position: target_position.with_stickiness(Stickiness::ToNone),
            base_version,
        }
    }

    /// Where the moved content starts once the operation is applied
    pub fn moved_range_start(&self) -> Position {
        self.target_position
            .transformed_by_deletion(&self.source_position, self.how_many)
            .unwrap_or_else(|| self.target_position.clone())
    }

    pub fn source_range(&self) -> Range {
        Range::from_position_and_shift(&self.source_position, self.how_many)
    }
}

impl OperationKind for MoveOperation {
    fn base_version(&self) -> Option<u64> {
        self.base_version
    }

    fn op_type(&self) -> &'static str {
        if self.target_position.root == GRAVEYARD {
            "remove"
        } else if self.source_position.root == GRAVEYARD {
            "reinsert"
        } else {
            "move"
        }
    }

    fn class_name(&self) -> &'static str {
        "MoveOperation"
    }

    fn validate(&self, doc: &Document) -> ModelResult<()> {
        let tree = doc.tree();
        let source_element = self
            .source_position
            .parent(tree)
            .map_err(|_| ModelError::MoveNodesDoNotExist)?;
        let target_element = self.target_position.parent(tree)?;
        let source_offset = self.source_position.offset();
        let target_offset = self.target_position.offset();
        let source_end = source_offset
            .checked_add(self.how_many)
            .filter(|&end| end <= tree.max_offset(source_element))
            .ok_or(ModelError::MoveNodesDoNotExist)?;

        if target_offset > tree.max_offset(target_element) {
            return Err(ModelError::OffsetOutOfBounds {
                offset: target_offset,
                max_offset: tree.max_offset(target_element),
            });
        }
        if source_element == target_element
            && source_offset < target_offset
            && target_offset < source_end
        {
            return Err(ModelError::MoveRangeIntoItself);
        }
        if self.source_position.root == self.target_position.root
            && compare_arrays(self.source_position.parent_path(), self.target_position.parent_path())
                == ArrayRelation::Prefix
        {
            let i = self.source_position.path.len() - 1;
            let target_at = self.target_position.path[i];
            if target_at >= source_offset && target_at < source_end {
                return Err(ModelError::MoveNodeIntoItself);
            }
        }
        Ok(())
    }
}

impl Execute for MoveOperation {
    fn execute(&self, doc: &mut Document) -> ModelResult<()> {
        primitives::move_range(doc.tree_mut(), &self.source_range(), &self.target_position).map(|_| ())
    }
}

impl Reversible for MoveOperation {
    fn get_reversed(&self) -> Operation {
        let new_target = self
            .source_position
            .transformed_by_insertion(&self.target_position, self.how_many);
        MoveOperation::new(
            self.moved_range_start(),
            self.how_many,
            new_target,
            next_version(self.base_version),
        )
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ModelNode;

    fn doc_with(children: Vec<ModelNode>) -> Document {
        let mut doc = Document::new();
        let root = doc.get_root("main").unwrap();
        let insert = super::super::InsertOperation::new(Position::new(root, vec![0]), children, Some(0));
        doc.apply_operation(insert.into()).unwrap();
        doc
    }

    #[test]
    fn test_op_type_follows_roots() {
        let root = crate::tree::NodeId::from_raw(1);
        let gy = Position::new(GRAVEYARD, vec![0]);
        let here = Position::new(root, vec![0]);
        assert_eq!(MoveOperation::new(here.clone(), 1, gy.clone(), None).op_type(), "remove");
        assert_eq!(MoveOperation::new(gy, 1, here.clone(), None).op_type(), "reinsert");
        assert_eq!(MoveOperation::new(here.clone(), 1, here, None).op_type(), "move");
    }

    #[test]
    fn test_validate_nodes_do_not_exist() {
        let doc = doc_with(vec![ModelNode::text("ab")]);
        let root = doc.get_root("main").unwrap();
        let op = MoveOperation::new(Position::new(root, vec![1]), 2, Position::new(root, vec![0]), Some(1));
        assert_eq!(op.validate(&doc).unwrap_err().code(), "move-operation-nodes-do-not-exist");
    }

    #[test]
    fn test_validate_range_into_itself() {
        let doc = doc_with(vec![ModelNode::text("abcd")]);
        let root = doc.get_root("main").unwrap();
        let op = MoveOperation::new(Position::new(root, vec![0]), 3, Position::new(root, vec![2]), Some(1));
        assert_eq!(op.validate(&doc).unwrap_err(), ModelError::MoveRangeIntoItself);
    }

    #[test]
    fn test_huge_how_many_is_rejected() {
        let mut doc = doc_with(vec![ModelNode::text("abcd")]);
        let root = doc.get_root("main").unwrap();
        let op = MoveOperation::new(Position::new(root, vec![1]), usize::MAX, Position::new(GRAVEYARD, vec![0]), Some(1));

        assert_eq!(doc.apply_operation(op.into()).unwrap_err(), ModelError::MoveNodesDoNotExist);
        assert_eq!(doc.stringify_root("main").unwrap(), "abcd");
        assert_eq!(doc.version(), 1);
    }

    #[test]
    fn test_validate_node_into_itself() {
        let doc = doc_with(vec![ModelNode::element("p").with_child(ModelNode::text("x"))]);
        let root = doc.get_root("main").unwrap();
        let op = MoveOperation::new(Position::new(root, vec![0]), 1, Position::new(root, vec![0, 1]), Some(1));
        assert_eq!(op.validate(&doc).unwrap_err(), ModelError::MoveNodeIntoItself);
    }

    #[test]
    fn test_move_and_reverse_restore_order() {
        let mut doc = doc_with(vec![ModelNode::element("a"), ModelNode::element("b"), ModelNode::element("c")]);
        let root = doc.get_root("main").unwrap();
        let op = MoveOperation::new(Position::new(root, vec![0]), 1, Position::new(root, vec![3]), Some(1));
        let reversed = op.get_reversed();

        doc.apply_operation(op.into()).unwrap();
        assert_eq!(doc.stringify_root("main").unwrap(), "<b></b><c></c><a></a>");

        doc.apply_operation(reversed).unwrap();
        assert_eq!(doc.stringify_root("main").unwrap(), "<a></a><b></b><c></c>");
        assert_eq!(doc.version(), 3);
    }
}
