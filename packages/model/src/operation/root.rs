use crate::document::Document;
use crate::errors::ModelResult;

use super::{next_version, Execute, Operation, OperationKind, Reversible};

/// Attach (`is_add`) or detach a document root.
///
/// Roots are never destroyed: a detached root keeps its name and node so
/// positions inside it stay meaningful. Executing the operation for a root
/// the document does not know yet registers it first.
#[derive(Debug, Clone, PartialEq)]
pub struct RootOperation {
    pub root_name: String,
    pub element_name: String,
    pub is_add: bool,
    pub base_version: Option<u64>,
}

impl RootOperation {
    pub fn new(root_name: impl Into<String>, element_name: impl Into<String>, is_add: bool, base_version: Option<u64>) -> Self {
        Self {
            root_name: root_name.into(),
            element_name: element_name.into(),
            is_add,
            base_version,
        }
    }
}

impl OperationKind for RootOperation {
    fn base_version(&self) -> Option<u64> {
        self.base_version
    }

    fn op_type(&self) -> &'static str {
        if self.is_add {
            "addRoot"
        } else {
            "detachRoot"
        }
    }

    fn class_name(&self) -> &'static str {
        "RootOperation"
    }

    fn validate(&self, _doc: &Document) -> ModelResult<()> {
        Ok(())
    }
}

impl Execute for RootOperation {
    fn execute(&self, doc: &mut Document) -> ModelResult<()> {
        let root = doc.ensure_root(&self.element_name, &self.root_name);
        doc.tree_mut().set_root_attached(root, self.is_add);
        Ok(())
    }
}

impl Reversible for RootOperation {
    fn get_reversed(&self) -> Operation {
        RootOperation::new(
            self.root_name.clone(),
            self.element_name.clone(),
            !self.is_add,
            next_version(self.base_version),
        )
        .into()
    }
}
