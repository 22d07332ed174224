use crate::document::Document;
use crate::errors::{ModelError, ModelResult};
use crate::position::{Position, Stickiness};

use super::{next_version, Execute, Operation, OperationKind, Reversible};

/// Change the name of the element right after `position`
#[derive(Debug, Clone, PartialEq)]
pub struct RenameOperation {
    pub position: Position,
    pub old_name: String,
    pub new_name: String,
    pub base_version: Option<u64>,
}

impl RenameOperation {
    pub fn new(
        position: Position,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
        base_version: Option<u64>,
    ) -> Self {
        Self {
            position: position.with_stickiness(Stickiness::ToNext),
            old_name: old_name.into(),
            new_name: new_name.into(),
            base_version,
        }
    }
}

impl OperationKind for RenameOperation {
    fn base_version(&self) -> Option<u64> {
        self.base_version
    }

    fn op_type(&self) -> &'static str {
        "rename"
    }

    fn class_name(&self) -> &'static str {
        "RenameOperation"
    }

    fn validate(&self, doc: &Document) -> ModelResult<()> {
        let tree = doc.tree();
        let element = self
            .position
            .node_after(tree)
            .filter(|&node| tree.is_element(node))
            .ok_or(ModelError::RenameWrongPosition)?;
        match tree.name(element) {
            Some(name) if name == self.old_name => Ok(()),
            Some(name) => Err(ModelError::RenameWrongName(name.to_string())),
            None => Err(ModelError::RenameWrongPosition),
        }
    }
}

impl Execute for RenameOperation {
    fn execute(&self, doc: &mut Document) -> ModelResult<()> {
        let element = self
            .position
            .node_after(doc.tree())
            .ok_or(ModelError::RenameWrongPosition)?;
        doc.tree_mut().rename(element, &self.new_name)
    }
}

impl Reversible for RenameOperation {
    fn get_reversed(&self) -> Operation {
        RenameOperation::new(
            self.position.clone(),
            self.new_name.clone(),
            self.old_name.clone(),
            next_version(self.base_version),
        )
        .into()
    }
}
