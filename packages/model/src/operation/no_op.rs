use crate::document::Document;
use crate::errors::ModelResult;

use super::{next_version, Execute, Operation, OperationKind, Reversible};

/// Operation that changes nothing but the document version
#[derive(Debug, Clone, PartialEq)]
pub struct NoOperation {
    pub base_version: Option<u64>,
}

impl NoOperation {
    pub fn new(base_version: Option<u64>) -> Self {
        Self { base_version }
    }
}

impl OperationKind for NoOperation {
    fn base_version(&self) -> Option<u64> {
        self.base_version
    }

    fn op_type(&self) -> &'static str {
        "noop"
    }

    fn class_name(&self) -> &'static str {
        "NoOperation"
    }

    fn validate(&self, _doc: &Document) -> ModelResult<()> {
        Ok(())
    }
}

impl Execute for NoOperation {
    fn execute(&self, _doc: &mut Document) -> ModelResult<()> {
        Ok(())
    }
}

impl Reversible for NoOperation {
    fn get_reversed(&self) -> Operation {
        NoOperation::new(next_version(self.base_version)).into()
    }
}
