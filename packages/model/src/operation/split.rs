use crate::document::Document;
use crate::errors::{ModelError, ModelResult};
use crate::position::{Position, Stickiness};
use crate::primitives::{self, NodeInput};
use crate::range::Range;
use crate::tree::GRAVEYARD;

use super::{next_version, Execute, MergeOperation, Operation, OperationKind, Reversible};

/// Split an element at `split_position`.
///
/// A copy of the split element is inserted at `insertion_position` (or, when
/// `graveyard_position` is set, the element found there is reused), then
/// everything after the split position is moved into it.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOperation {
    pub split_position: Position,
    /// Offset span from the split position to the end of the split element
    pub how_many: usize,
    pub insertion_position: Position,
    pub graveyard_position: Option<Position>,
    pub base_version: Option<u64>,
}

impl SplitOperation {
    pub fn new(
        split_position: Position,
        how_many: usize,
        insertion_position: Position,
        graveyard_position: Option<Position>,
        base_version: Option<u64>,
    ) -> Self {
        Self {
            split_position: split_position.with_stickiness(Stickiness::ToNext),
            how_many,
            insertion_position,
            graveyard_position: graveyard_position.map(|p| p.with_stickiness(Stickiness::ToNext)),
            base_version,
        }
    }

    /// Position right after the element containing `split_position`
    pub fn insertion_position_for(split_position: &Position) -> Position {
        let mut path = split_position.parent_path().to_vec();
        if let Some(last) = path.last_mut() {
            *last += 1;
        }
        Position::new(split_position.root, path).with_stickiness(Stickiness::ToPrevious)
    }

    /// Start of the new element's content
    pub fn move_target_position(&self) -> Position {
        let mut path = self.insertion_position.path.clone();
        path.push(0);
        Position::new(self.insertion_position.root, path)
    }

    /// Everything from the split position to the end of the split element
    pub fn moved_range(&self) -> Range {
        Range::new(self.split_position.clone(), self.split_position.with_offset(usize::MAX))
    }
}

impl OperationKind for SplitOperation {
    fn base_version(&self) -> Option<u64> {
        self.base_version
    }

    fn op_type(&self) -> &'static str {
        "split"
    }

    fn class_name(&self) -> &'static str {
        "SplitOperation"
    }

    fn validate(&self, doc: &Document) -> ModelResult<()> {
        let tree = doc.tree();
        let element = self
            .split_position
            .parent(tree)
            .map_err(|_| ModelError::SplitPositionInvalid)?;
        let offset = self.split_position.offset();
        let max_offset = tree.max_offset(element);

        if max_offset < offset {
            return Err(ModelError::SplitPositionInvalid);
        }
        if tree.parent(element).is_none() {
            return Err(ModelError::SplitInRoot);
        }
        if self.how_many != max_offset - offset {
            return Err(ModelError::SplitHowManyInvalid {
                how_many: self.how_many,
                expected: max_offset - offset,
            });
        }

        let insertion_parent = self
            .insertion_position
            .parent(tree)
            .map_err(|_| ModelError::SplitInsertionPositionInvalid)?;
        if self.insertion_position.offset() > tree.max_offset(insertion_parent)
            || tree.ancestors(insertion_parent, true).contains(&element)
        {
            return Err(ModelError::SplitInsertionPositionInvalid);
        }

        if let Some(graveyard_position) = &self.graveyard_position {
            if graveyard_position.node_after(tree).is_none() {
                return Err(ModelError::SplitGraveyardPositionInvalid);
            }
        }
        Ok(())
    }
}

impl Execute for SplitOperation {
    fn execute(&self, doc: &mut Document) -> ModelResult<()> {
        let tree = doc.tree_mut();
        let split_element = self.split_position.parent(tree)?;

        match &self.graveyard_position {
            Some(graveyard_position) => {
                let recycled = Range::from_position_and_shift(graveyard_position, 1);
                primitives::move_range(tree, &recycled, &self.insertion_position)?;
            }
            None => {
                let copy = tree.clone_element(split_element)?;
                primitives::insert(tree, &self.insertion_position, NodeInput::Node(copy))?;
            }
        }

        let source = Range::new(
            Position::at(tree, split_element, self.split_position.offset()),
            Position::at_end(tree, split_element),
        );
        primitives::move_range(tree, &source, &self.move_target_position()).map(|_| ())
    }
}

impl Reversible for SplitOperation {
    fn get_reversed(&self) -> Operation {
        MergeOperation::new(
            self.move_target_position(),
            self.how_many,
            self.split_position.clone(),
            Position::new(GRAVEYARD, vec![0]),
            next_version(self.base_version),
        )
        .into()
    }
}
