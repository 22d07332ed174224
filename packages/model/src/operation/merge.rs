use crate::document::Document;
use crate::errors::{ModelError, ModelResult};
use crate::position::{Position, Stickiness};
use crate::primitives;
use crate::range::Range;

use super::{next_version, Execute, Operation, OperationKind, Reversible, SplitOperation};

/// Merge an element into the one before it.
///
/// All `how_many` offsets of content starting at `source_position` (the start
/// of the merged element) are moved to `target_position` (the end of the
/// preceding element), then the emptied element is moved to
/// `graveyard_position`.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOperation {
    pub source_position: Position,
    pub how_many: usize,
    pub target_position: Position,
    pub graveyard_position: Position,
    pub base_version: Option<u64>,
}

impl MergeOperation {
    pub fn new(
        source_position: Position,
        how_many: usize,
        target_position: Position,
        graveyard_position: Position,
        base_version: Option<u64>,
    ) -> Self {
        Self {
            source_position: source_position.with_stickiness(Stickiness::ToPrevious),
            how_many,
            target_position: target_position.with_stickiness(Stickiness::ToNext),
            graveyard_position,
            base_version,
        }
    }

    /// Position before the merged element
    pub fn deletion_position(&self) -> Position {
        Position::new(self.source_position.root, self.source_position.parent_path().to_vec())
    }

    /// Whole content of the merged element
    pub fn moved_range(&self) -> Range {
        Range::new(self.source_position.clone(), self.source_position.with_offset(usize::MAX))
    }
}

impl OperationKind for MergeOperation {
    fn base_version(&self) -> Option<u64> {
        self.base_version
    }

    fn op_type(&self) -> &'static str {
        "merge"
    }

    fn class_name(&self) -> &'static str {
        "MergeOperation"
    }

    fn validate(&self, doc: &Document) -> ModelResult<()> {
        let tree = doc.tree();
        let source_element = self
            .source_position
            .parent(tree)
            .ok()
            .filter(|&element| tree.parent(element).is_some())
            .ok_or(ModelError::MergeSourcePositionInvalid)?;
        let target_element = self
            .target_position
            .parent(tree)
            .ok()
            .filter(|&element| tree.parent(element).is_some())
            .ok_or(ModelError::MergeTargetPositionInvalid)?;

        if self.target_position.offset() > tree.max_offset(target_element)
            || tree.ancestors(target_element, true).contains(&source_element)
        {
            return Err(ModelError::MergeTargetPositionInvalid);
        }

        let graveyard_element = self
            .graveyard_position
            .parent(tree)
            .map_err(|_| ModelError::MergeGraveyardPositionInvalid)?;
        if self.graveyard_position.offset() > tree.max_offset(graveyard_element)
            || tree.ancestors(graveyard_element, true).contains(&source_element)
        {
            return Err(ModelError::MergeGraveyardPositionInvalid);
        }
        let expected = tree.max_offset(source_element);
        if self.how_many != expected {
            return Err(ModelError::MergeHowManyInvalid {
                how_many: self.how_many,
                expected,
            });
        }
        Ok(())
    }
}

impl Execute for MergeOperation {
    fn execute(&self, doc: &mut Document) -> ModelResult<()> {
        let tree = doc.tree_mut();
        let merged_element = self.source_position.parent(tree)?;

        let content = Range::create_in(tree, merged_element);
        primitives::move_range(tree, &content, &self.target_position)?;

        let element = Range::create_on(tree, merged_element)?;
        primitives::move_range(tree, &element, &self.graveyard_position).map(|_| ())
    }
}

impl Reversible for MergeOperation {
    fn get_reversed(&self) -> Operation {
        let split_position = self.target_position.transformed_by_merge_operation(self);
        let insertion_position = self.deletion_position().transformed_by_merge_operation(self);
        SplitOperation::new(
            split_position,
            self.how_many,
            insertion_position,
            Some(self.graveyard_position.clone()),
            next_version(self.base_version),
        )
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::InsertOperation;
    use crate::tree::{ModelNode, GRAVEYARD};

    fn two_paragraphs() -> Document {
        let mut doc = Document::new();
        let root = doc.get_root("main").unwrap();
        let insert = InsertOperation::new(
            Position::new(root, vec![0]),
            vec![
                ModelNode::element("p1").with_child(ModelNode::text("Foo")),
                ModelNode::element("p2").with_child(ModelNode::text("bar")),
            ],
            Some(0),
        );
        doc.apply_operation(insert.into()).unwrap();
        doc
    }

    fn merge_op(doc: &Document) -> MergeOperation {
        let root = doc.get_root("main").unwrap();
        MergeOperation::new(
            Position::new(root, vec![1, 0]),
            3,
            Position::new(root, vec![0, 3]),
            Position::new(GRAVEYARD, vec![0]),
            Some(1),
        )
    }

    #[test]
    fn test_merge_moves_content_and_buries_element() {
        let mut doc = two_paragraphs();
        let op = merge_op(&doc);
        doc.apply_operation(op.into()).unwrap();

        assert_eq!(doc.stringify_root("main").unwrap(), "<p1>Foobar</p1>");
        assert_eq!(doc.tree().stringify(GRAVEYARD), "<p2></p2>");
        assert_eq!(doc.version(), 2);
    }

    #[test]
    fn test_reversed_split_restores_boundary() {
        let mut doc = two_paragraphs();
        let op = merge_op(&doc);
        let reversed = op.get_reversed();

        match &reversed {
            Operation::Split(split) => {
                assert_eq!(split.split_position.path, vec![0, 3]);
                assert_eq!(split.insertion_position.path, vec![1]);
                assert_eq!(split.graveyard_position.as_ref().unwrap().path, vec![0]);
                assert_eq!(split.base_version, Some(2));
            }
            other => panic!("unexpected reversal: {other:?}"),
        }

        doc.apply_operation(op.into()).unwrap();
        doc.apply_operation(reversed).unwrap();
        assert_eq!(doc.stringify_root("main").unwrap(), "<p1>Foo</p1><p2>bar</p2>");
        assert_eq!(doc.tree().child_count(GRAVEYARD), 0);
    }

    #[test]
    fn test_validate_how_many() {
        let doc = two_paragraphs();
        let mut op = merge_op(&doc);
        op.how_many = 2;
        assert_eq!(op.validate(&doc).unwrap_err().code(), "merge-operation-how-many-invalid");
    }

    #[test]
    fn test_invalid_graveyard_position_changes_nothing() {
        let mut doc = two_paragraphs();
        let mut op = merge_op(&doc);
        op.graveyard_position = Position::new(GRAVEYARD, vec![5]);
        let buffered = doc.differ().changes().to_vec();

        let err = doc.apply_operation(op.into()).unwrap_err();
        assert_eq!(err, ModelError::MergeGraveyardPositionInvalid);
        assert_eq!(doc.stringify_root("main").unwrap(), "<p1>Foo</p1><p2>bar</p2>");
        assert_eq!(doc.differ().changes(), buffered.as_slice());
        assert_eq!(doc.version(), 1);
    }

    #[test]
    fn test_target_inside_merged_element_is_rejected() {
        let doc = two_paragraphs();
        let root = doc.get_root("main").unwrap();
        let mut op = merge_op(&doc);
        op.target_position = Position::new(root, vec![1, 3]);
        assert_eq!(op.validate(&doc).unwrap_err(), ModelError::MergeTargetPositionInvalid);
    }

    #[test]
    fn test_validate_source_in_root() {
        let doc = two_paragraphs();
        let root = doc.get_root("main").unwrap();
        let mut op = merge_op(&doc);
        op.source_position = Position::new(root, vec![1]);
        assert_eq!(op.validate(&doc).unwrap_err(), ModelError::MergeSourcePositionInvalid);
    }
}
