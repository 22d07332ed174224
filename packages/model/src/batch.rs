//! # Batches
//!
//! A batch groups the operations of one logical change, which is also one
//! undo step. Only document operations are kept: operations on detached trees
//! are executed but leave no trace in the batch.

use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// Independent flags describing a batch. Any combination is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchType {
    /// Undo can revert this batch
    pub is_undoable: bool,
    /// Created by the local user rather than a remote collaborator
    pub is_local: bool,
    /// The batch itself undoes another batch
    pub is_undo: bool,
    /// Created by typing
    pub is_typing: bool,
}

impl Default for BatchType {
    fn default() -> Self {
        Self {
            is_undoable: true,
            is_local: true,
            is_undo: false,
            is_typing: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub batch_type: BatchType,
    operations: Vec<Operation>,
}

impl Batch {
    pub fn new(batch_type: BatchType) -> Self {
        Self {
            batch_type,
            operations: Vec::new(),
        }
    }

    pub fn is_undoable(&self) -> bool {
        self.batch_type.is_undoable
    }

    pub fn is_local(&self) -> bool {
        self.batch_type.is_local
    }

    pub fn is_undo(&self) -> bool {
        self.batch_type.is_undo
    }

    pub fn is_typing(&self) -> bool {
        self.batch_type.is_typing
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Base version of the first operation, if any
    pub fn base_version(&self) -> Option<u64> {
        self.operations.iter().find_map(Operation::base_version)
    }

    /// Append `op` if it is a document operation. Returns whether it was kept.
    pub fn add_operation(&mut self, op: Operation) -> bool {
        if !op.is_document_operation() {
            return false;
        }
        self.operations.push(op);
        true
    }
}
