//! Error types for the document model

use crate::tree::NodeId;
use thiserror::Error;

/// Every failure the model can report.
///
/// Validation failures are always returned before the tree is touched, so an
/// `Err` from [`crate::Document::apply_operation`] guarantees no side effects.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    // History and document bookkeeping
    #[error("Operation base version {base_version} does not match history version {history_version}")]
    IncorrectVersion { base_version: u64, history_version: u64 },

    #[error("History version cannot move backwards from {current} to {requested}")]
    VersionDecrease { current: u64, requested: u64 },

    #[error("Root already exists: {0}")]
    RootNameExists(String),

    #[error("Root not found: {0}")]
    RootNotFound(String),

    // Tree structure
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    #[error("Node cannot contain children: {0:?}")]
    NotAContainer(NodeId),

    #[error("Node is not an element: {0:?}")]
    NotAnElement(NodeId),

    #[error("Node is not a text node: {0:?}")]
    NotAText(NodeId),

    #[error("Child index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Offset {offset} out of bounds (max offset {max_offset})")]
    OffsetOutOfBounds { offset: usize, max_offset: usize },

    #[error("Position path is incorrect: {0:?}")]
    PositionPathIncorrect(Vec<usize>),

    #[error("Range is not flat")]
    RangeNotFlat,

    // Operation validation
    #[error("Insert position is invalid")]
    InsertPositionInvalid,

    #[error("Moved nodes do not exist")]
    MoveNodesDoNotExist,

    #[error("Trying to move a range of nodes into itself")]
    MoveRangeIntoItself,

    #[error("Trying to move a node into itself")]
    MoveNodeIntoItself,

    #[error("Cannot detach a node that belongs to the document")]
    DetachOnDocumentNode,

    #[error("Rename position does not point before an element")]
    RenameWrongPosition,

    #[error("Element to rename has a different name than expected: {0}")]
    RenameWrongName(String),

    #[error("Split position is invalid")]
    SplitPositionInvalid,

    #[error("Cannot split a root element")]
    SplitInRoot,

    #[error("Split howMany {how_many} does not match the offset span {expected}")]
    SplitHowManyInvalid { how_many: usize, expected: usize },

    #[error("Split graveyard position does not point before an element")]
    SplitGraveyardPositionInvalid,

    #[error("Split insertion position is invalid")]
    SplitInsertionPositionInvalid,

    #[error("Merge source position is invalid")]
    MergeSourcePositionInvalid,

    #[error("Merge target position is invalid")]
    MergeTargetPositionInvalid,

    #[error("Merge graveyard position is invalid")]
    MergeGraveyardPositionInvalid,

    #[error("Merge howMany {how_many} does not match the merged element size {expected}")]
    MergeHowManyInvalid { how_many: usize, expected: usize },

    #[error("Attribute {0} has a different value than the operation's old value")]
    AttributeWrongOldValue(String),

    #[error("Attribute {0} already exists")]
    AttributeExists(String),

    #[error("Root attribute operation target is not a root")]
    RootAttributeNotARoot,

    #[error("Root attribute {0} has a different value than the operation's old value")]
    RootAttributeWrongOldValue(String),

    #[error("Root attribute {0} already exists")]
    RootAttributeExists(String),

    #[error("Operation cannot be reversed: {0}")]
    NotReversible(&'static str),

    // Writer contract
    #[error("Cannot move a node from the document into a different tree")]
    WriterInsertForbiddenMove,

    #[error("Cannot move nodes between different trees")]
    WriterMoveDifferentDocument,

    #[error("Merge position has no element before it")]
    WriterMergeNoElementBefore,

    #[error("Merge position has no element after it")]
    WriterMergeNoElementAfter,

    #[error("Element to split has no parent")]
    WriterSplitElementNoParent,

    #[error("Limit element is not an ancestor of the split position")]
    WriterSplitInvalidLimitElement,

    #[error("Wrapping element must be empty")]
    WriterWrapElementNotEmpty,

    #[error("Wrapping element must not be attached")]
    WriterWrapElementAttached,

    #[error("Element to unwrap has no parent")]
    WriterUnwrapElementNoParent,

    #[error("Root {0} already exists and is attached")]
    WriterAddRootExists(String),

    #[error("Root {0} does not exist or is already detached")]
    WriterDetachRootNoRoot(String),

    #[error("Marker not found: {0}")]
    MarkerNotFound(String),

    #[error("Marker already exists: {0}")]
    MarkerExists(String),

    #[error("Marker update needs a range, a using-operation flag or an affects-data flag")]
    WriterUpdateMarkerWrongOptions,

    // Wire format
    #[error("Unknown operation class: {0}")]
    UnknownOperationClass(String),

    #[error("Operation references a tree that is not a named root")]
    NotSerializable,

    #[error("Malformed operation JSON: {0}")]
    Json(String),
}

impl ModelError {
    /// Stable identifier of the error, independent of its message.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::IncorrectVersion { .. } => "model-document-history-addoperation-incorrect-version",
            ModelError::VersionDecrease { .. } => "model-document-history-version-decrease",
            ModelError::RootNameExists(_) => "model-document-createroot-name-exists",
            ModelError::RootNotFound(_) => "model-document-root-not-found",
            ModelError::NodeNotFound(_) => "model-node-not-found",
            ModelError::NotAContainer(_) => "model-node-not-a-container",
            ModelError::NotAnElement(_) => "model-node-not-an-element",
            ModelError::NotAText(_) => "model-node-not-a-text",
            ModelError::IndexOutOfBounds { .. } => "model-nodelist-index-out-of-bounds",
            ModelError::OffsetOutOfBounds { .. } => "model-nodelist-offset-out-of-bounds",
            ModelError::PositionPathIncorrect(_) => "model-position-path-incorrect",
            ModelError::RangeNotFlat => "operation-utils-range-not-flat",
            ModelError::InsertPositionInvalid => "insert-operation-position-invalid",
            ModelError::MoveNodesDoNotExist => "move-operation-nodes-do-not-exist",
            ModelError::MoveRangeIntoItself => "move-operation-range-into-itself",
            ModelError::MoveNodeIntoItself => "move-operation-node-into-itself",
            ModelError::DetachOnDocumentNode => "detach-operation-on-document-node",
            ModelError::RenameWrongPosition => "rename-operation-wrong-position",
            ModelError::RenameWrongName(_) => "rename-operation-wrong-name",
            ModelError::SplitPositionInvalid => "split-operation-position-invalid",
            ModelError::SplitInRoot => "split-operation-split-in-root",
            ModelError::SplitHowManyInvalid { .. } => "split-operation-how-many-invalid",
            ModelError::SplitGraveyardPositionInvalid => "split-operation-graveyard-position-invalid",
            ModelError::SplitInsertionPositionInvalid => "split-operation-insertion-position-invalid",
            ModelError::MergeSourcePositionInvalid => "merge-operation-source-position-invalid",
            ModelError::MergeTargetPositionInvalid => "merge-operation-target-position-invalid",
            ModelError::MergeGraveyardPositionInvalid => "merge-operation-graveyard-position-invalid",
            ModelError::MergeHowManyInvalid { .. } => "merge-operation-how-many-invalid",
            ModelError::AttributeWrongOldValue(_) => "attribute-operation-wrong-old-value",
            ModelError::AttributeExists(_) => "attribute-operation-attribute-exists",
            ModelError::RootAttributeNotARoot => "rootattribute-operation-not-a-root",
            ModelError::RootAttributeWrongOldValue(_) => "rootattribute-operation-wrong-old-value",
            ModelError::RootAttributeExists(_) => "rootattribute-operation-attribute-exists",
            ModelError::NotReversible(_) => "operation-not-reversible",
            ModelError::WriterInsertForbiddenMove => "model-writer-insert-forbidden-move",
            ModelError::WriterMoveDifferentDocument => "writer-move-different-document",
            ModelError::WriterMergeNoElementBefore => "writer-merge-no-element-before",
            ModelError::WriterMergeNoElementAfter => "writer-merge-no-element-after",
            ModelError::WriterSplitElementNoParent => "writer-split-element-no-parent",
            ModelError::WriterSplitInvalidLimitElement => "writer-split-invalid-limit-element",
            ModelError::WriterWrapElementNotEmpty => "writer-wrap-element-not-empty",
            ModelError::WriterWrapElementAttached => "writer-wrap-element-attached",
            ModelError::WriterUnwrapElementNoParent => "writer-unwrap-element-no-parent",
            ModelError::WriterAddRootExists(_) => "writer-addroot-root-exists",
            ModelError::WriterDetachRootNoRoot(_) => "writer-detachroot-no-root",
            ModelError::MarkerNotFound(_) => "writer-marker-not-exists",
            ModelError::MarkerExists(_) => "writer-addmarker-marker-exists",
            ModelError::WriterUpdateMarkerWrongOptions => "writer-updatemarker-wrong-options",
            ModelError::UnknownOperationClass(_) => "operation-factory-unknown-class",
            ModelError::NotSerializable => "operation-not-serializable",
            ModelError::Json(_) => "operation-json-malformed",
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::Json(e.to_string())
    }
}

/// Result alias used throughout the crate
pub type ModelResult<T> = Result<T, ModelError>;
