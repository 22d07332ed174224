//! # Operations
//!
//! Discrete, serializable changes to the model. Every change to a tree goes
//! through an operation, and every document operation is recorded in the
//! history.
//!
//! ## Design
//!
//! - `validate` runs before `execute` and rejects every operation whose
//!   execution would corrupt the tree, so a failed operation has no effects
//! - `execute` only calls the tree mutation primitives
//! - Operations with a `base_version` are *document operations*; they may only
//!   be applied when the document version equals that base version
//! - Removed content is moved to the graveyard root, never destroyed, which
//!   makes every document operation reversible
//!
//! Reversal pairs:
//!
//! | Operation     | Reversed by                   |
//! |---------------|-------------------------------|
//! | Insert        | Move into the graveyard       |
//! | Move          | Move back                     |
//! | Split         | Merge                         |
//! | Merge         | Split                         |
//! | Rename        | Rename back                   |
//! | Attribute     | Attribute with values swapped |
//! | RootAttribute | RootAttribute, values swapped |
//! | Root          | Root with `is_add` flipped    |
//! | Marker        | Marker with ranges swapped    |
//! | NoOp          | NoOp                          |
//!
//! Detach only ever acts on detached trees and has no reversal.

mod attribute;
pub mod codec;
mod detach;
mod insert;
mod marker;
mod merge;
mod move_op;
mod no_op;
mod rename;
mod root;
mod split;

pub use attribute::{AttributeOperation, RootAttributeOperation};
pub use detach::DetachOperation;
pub use insert::InsertOperation;
pub use marker::MarkerOperation;
pub use merge::MergeOperation;
pub use move_op::MoveOperation;
pub use no_op::NoOperation;
pub use rename::RenameOperation;
pub use root::RootOperation;
pub use split::SplitOperation;

use crate::document::Document;
use crate::errors::{ModelError, ModelResult};

/// Behaviour shared by every operation type
pub trait OperationKind {
    /// Document version the operation expects; `None` for detached trees
    fn base_version(&self) -> Option<u64>;

    /// Type string, e.g. `insert`, `remove`, `addAttribute`
    fn op_type(&self) -> &'static str;

    /// Wire discriminator, e.g. `InsertOperation`
    fn class_name(&self) -> &'static str;

    /// Check that the operation can be executed on `doc` in its current state
    fn validate(&self, doc: &Document) -> ModelResult<()>;

    fn is_document_operation(&self) -> bool {
        self.base_version().is_some()
    }
}

/// Operations that can be undone by applying another operation
pub trait Reversible: OperationKind {
    /// Operation that restores the tree when applied right after this one,
    /// with base version `base_version + 1`
    fn get_reversed(&self) -> Operation;
}

pub(crate) trait Execute {
    fn execute(&self, doc: &mut Document) -> ModelResult<()>;
}

pub(crate) fn next_version(base_version: Option<u64>) -> Option<u64> {
    base_version.map(|v| v + 1)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Insert(InsertOperation),
    Move(MoveOperation),
    Detach(DetachOperation),
    Rename(RenameOperation),
    Split(SplitOperation),
    Merge(MergeOperation),
    Attribute(AttributeOperation),
    RootAttribute(RootAttributeOperation),
    Root(RootOperation),
    Marker(MarkerOperation),
    NoOp(NoOperation),
}

macro_rules! dispatch {
    ($self:expr, $op:ident => $body:expr) => {
        match $self {
            Operation::Insert($op) => $body,
            Operation::Move($op) => $body,
            Operation::Detach($op) => $body,
            Operation::Rename($op) => $body,
            Operation::Split($op) => $body,
            Operation::Merge($op) => $body,
            Operation::Attribute($op) => $body,
            Operation::RootAttribute($op) => $body,
            Operation::Root($op) => $body,
            Operation::Marker($op) => $body,
            Operation::NoOp($op) => $body,
        }
    };
}

impl Operation {
    pub fn base_version(&self) -> Option<u64> {
        dispatch!(self, op => op.base_version())
    }

    pub fn is_document_operation(&self) -> bool {
        self.base_version().is_some()
    }

    pub fn op_type(&self) -> &'static str {
        dispatch!(self, op => op.op_type())
    }

    pub fn class_name(&self) -> &'static str {
        dispatch!(self, op => op.class_name())
    }

    pub fn validate(&self, doc: &Document) -> ModelResult<()> {
        dispatch!(self, op => op.validate(doc))
    }

    pub(crate) fn execute(&self, doc: &mut Document) -> ModelResult<()> {
        dispatch!(self, op => op.execute(doc))
    }

    /// Reversed operation; detach operations cannot be reversed
    pub fn get_reversed(&self) -> ModelResult<Operation> {
        match self {
            Operation::Insert(op) => Ok(op.get_reversed()),
            Operation::Move(op) => Ok(op.get_reversed()),
            Operation::Detach(op) => Err(ModelError::NotReversible(op.class_name())),
            Operation::Rename(op) => Ok(op.get_reversed()),
            Operation::Split(op) => Ok(op.get_reversed()),
            Operation::Merge(op) => Ok(op.get_reversed()),
            Operation::Attribute(op) => Ok(op.get_reversed()),
            Operation::RootAttribute(op) => Ok(op.get_reversed()),
            Operation::Root(op) => Ok(op.get_reversed()),
            Operation::Marker(op) => Ok(op.get_reversed()),
            Operation::NoOp(op) => Ok(op.get_reversed()),
        }
    }

    /// Copy of this operation expecting a different base version
    pub fn with_base_version(&self, base_version: Option<u64>) -> Operation {
        let mut op = self.clone();
        match &mut op {
            Operation::Insert(o) => o.base_version = base_version,
            Operation::Move(o) => o.base_version = base_version,
            Operation::Detach(_) => {}
            Operation::Rename(o) => o.base_version = base_version,
            Operation::Split(o) => o.base_version = base_version,
            Operation::Merge(o) => o.base_version = base_version,
            Operation::Attribute(o) => o.base_version = base_version,
            Operation::RootAttribute(o) => o.base_version = base_version,
            Operation::Root(o) => o.base_version = base_version,
            Operation::Marker(o) => o.base_version = base_version,
            Operation::NoOp(o) => o.base_version = base_version,
        }
        op
    }
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Operation {
                fn from(op: $ty) -> Self {
                    Operation::$variant(op)
                }
            }
        )*
    };
}

impl_from!(
    Insert(InsertOperation),
    Move(MoveOperation),
    Detach(DetachOperation),
    Rename(RenameOperation),
    Split(SplitOperation),
    Merge(MergeOperation),
    Attribute(AttributeOperation),
    RootAttribute(RootAttributeOperation),
    Root(RootOperation),
    Marker(MarkerOperation),
    NoOp(NoOperation),
);
