//! # Quire Model
//!
//! Operation-based document model for rich-text editing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Writer: high level edits inside a change    │
//! │ block (insert, split, merge, wrap, ...)     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ Operations: validated, versioned, reversible│
//! │  - recorded in the block's Batch            │
//! │  - recorded in the document History         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ Tree primitives: insert / remove / move /   │
//! │ set attribute on an arena of nodes          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Operations are the only mutation**: every change can be serialized,
//!    replayed and reversed
//! 2. **Nothing is destroyed**: removed content moves to the graveyard root
//! 3. **Optimistic versioning**: a document operation applies only at the
//!    version it was created for
//! 4. **Offsets, not indexes**: text counts one offset per character
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quire_model::{Document, Position};
//!
//! let mut doc = Document::new();
//! doc.change(|writer| {
//!     let root = writer.root("main")?;
//!     let paragraph = writer.insert_element("paragraph", &Position::new(root, vec![0]))?;
//!     writer.insert_text("Hello", &writer.create_position_at(paragraph, 0))
//! })?;
//!
//! assert_eq!(doc.stringify_root("main").unwrap(), "<paragraph>Hello</paragraph>");
//! ```

pub mod batch;
pub mod differ;
pub mod document;
mod errors;
pub mod history;
pub mod markers;
pub mod node_list;
pub mod operation;
pub mod position;
mod primitives;
pub mod range;
pub mod replayer;
pub mod tree;
pub mod writer;

pub use batch::{Batch, BatchType};
pub use differ::{DiffItem, Differ};
pub use document::{ChangeEvent, Document, DocumentOptions, PostFixer};
pub use errors::{ModelError, ModelResult};
pub use history::History;
pub use markers::{Marker, MarkerCollection};
pub use node_list::NodeList;
pub use operation::codec::{from_json, stringify_operations, to_json};
pub use operation::{Operation, OperationKind, Reversible};
pub use position::{Position, Stickiness};
pub use range::{Range, RangeItem};
pub use replayer::{OperationReplayer, DEFAULT_SEPARATOR};
pub use tree::{Attributes, ModelNode, NodeId, Tree, GRAVEYARD, GRAVEYARD_NAME};
pub use writer::{ItemOrRange, MarkerOptions, SplitResult, Writer};
