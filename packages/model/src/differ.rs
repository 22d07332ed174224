//! # Differ
//!
//! Buffers what changed in the document during one change block. Entries are
//! recorded before each document operation executes, so their paths are
//! expressed in the tree as it was at that moment.
//!
//! Changes inside the graveyard are not recorded: removed content only
//! matters at the place it was removed from.

use serde_json::Value;

use crate::document::Document;
use crate::operation::Operation;
use crate::position::Position;
use crate::range::Range;
use crate::tree::{NodeId, GRAVEYARD};

#[derive(Debug, Clone, PartialEq)]
pub enum DiffItem {
    Insert {
        root: String,
        path: Vec<usize>,
        length: usize,
    },
    Remove {
        root: String,
        path: Vec<usize>,
        length: usize,
    },
    Attribute {
        root: String,
        start: Vec<usize>,
        end: Vec<usize>,
        key: String,
        old_value: Option<Value>,
        new_value: Option<Value>,
    },
    Rename {
        root: String,
        path: Vec<usize>,
        old_name: String,
        new_name: String,
    },
    RootAttribute {
        root: String,
        key: String,
        old_value: Option<Value>,
        new_value: Option<Value>,
    },
    Root {
        root: String,
        is_attached: bool,
    },
    Marker {
        name: String,
        old_range: Option<Range>,
        new_range: Option<Range>,
        affects_data: bool,
    },
}

impl DiffItem {
    pub fn affects_data(&self) -> bool {
        match self {
            DiffItem::Marker { affects_data, .. } => *affects_data,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Differ {
    changes: Vec<DiffItem>,
}

impl Differ {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn has_data_changes(&self) -> bool {
        self.changes.iter().any(DiffItem::affects_data)
    }

    pub fn changes(&self) -> &[DiffItem] {
        &self.changes
    }

    pub fn reset(&mut self) {
        self.changes.clear();
    }

    /// Record the changes `op` is about to make
    pub fn buffer_operation(&mut self, op: &Operation, doc: &Document) {
        match op {
            Operation::Insert(op) => self.mark(doc, &op.position, |root, path| DiffItem::Insert {
                root,
                path,
                length: op.how_many(),
            }),
            Operation::Move(op) => {
                self.mark(doc, &op.source_position, |root, path| DiffItem::Remove {
                    root,
                    path,
                    length: op.how_many,
                });
                self.mark(doc, &op.moved_range_start(), |root, path| DiffItem::Insert {
                    root,
                    path,
                    length: op.how_many,
                });
            }
            Operation::Split(op) => {
                self.mark(doc, &op.split_position, |root, path| DiffItem::Remove {
                    root,
                    path,
                    length: op.how_many,
                });
                self.mark(doc, &op.insertion_position, |root, path| DiffItem::Insert {
                    root,
                    path,
                    length: 1,
                });
            }
            Operation::Merge(op) => {
                self.mark(doc, &op.target_position, |root, path| DiffItem::Insert {
                    root,
                    path,
                    length: op.how_many,
                });
                self.mark(doc, &op.deletion_position(), |root, path| DiffItem::Remove {
                    root,
                    path,
                    length: 1,
                });
            }
            Operation::Attribute(op) => {
                let end = op.range.end.path.clone();
                self.mark(doc, &op.range.start, |root, start| DiffItem::Attribute {
                    root,
                    start,
                    end,
                    key: op.key.clone(),
                    old_value: op.old_value.clone(),
                    new_value: op.new_value.clone(),
                });
            }
            Operation::Rename(op) => self.mark(doc, &op.position, |root, path| DiffItem::Rename {
                root,
                path,
                old_name: op.old_name.clone(),
                new_name: op.new_name.clone(),
            }),
            Operation::RootAttribute(op) => {
                if let Some(root) = named_root(doc, op.root) {
                    self.changes.push(DiffItem::RootAttribute {
                        root,
                        key: op.key.clone(),
                        old_value: op.old_value.clone(),
                        new_value: op.new_value.clone(),
                    });
                }
            }
            Operation::Root(op) => self.changes.push(DiffItem::Root {
                root: op.root_name.clone(),
                is_attached: op.is_add,
            }),
            Operation::Marker(op) => self.buffer_marker_change(
                &op.name,
                op.old_range.clone(),
                op.new_range.clone(),
                op.affects_data,
            ),
            Operation::Detach(_) | Operation::NoOp(_) => {}
        }
    }

    /// Record a marker change made outside of operations
    pub fn buffer_marker_change(
        &mut self,
        name: &str,
        old_range: Option<Range>,
        new_range: Option<Range>,
        affects_data: bool,
    ) {
        self.changes.push(DiffItem::Marker {
            name: name.to_string(),
            old_range,
            new_range,
            affects_data,
        });
    }

    fn mark(&mut self, doc: &Document, position: &Position, item: impl FnOnce(String, Vec<usize>) -> DiffItem) {
        if position.root == GRAVEYARD {
            return;
        }
        if let Some(root) = named_root(doc, position.root) {
            self.changes.push(item(root, position.path.clone()));
        }
    }
}

fn named_root(doc: &Document, root: NodeId) -> Option<String> {
    doc.tree().root_info(root).map(|info| info.root_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{InsertOperation, MarkerOperation, MoveOperation};
    use crate::tree::ModelNode;

    #[test]
    fn test_remove_into_graveyard_records_only_removal() {
        let doc = Document::new();
        let root = doc.get_root("main").unwrap();
        let mut differ = Differ::new();
        let op = MoveOperation::new(Position::new(root, vec![2]), 3, Position::new(GRAVEYARD, vec![0]), Some(0));
        differ.buffer_operation(&op.into(), &doc);

        assert_eq!(
            differ.changes(),
            &[DiffItem::Remove {
                root: "main".into(),
                path: vec![2],
                length: 3
            }]
        );
        assert!(differ.has_data_changes());
    }

    #[test]
    fn test_marker_without_data_is_not_a_data_change() {
        let doc = Document::new();
        let mut differ = Differ::new();
        let op = MarkerOperation::new("m", None, None, false, Some(0));
        differ.buffer_operation(&op.into(), &doc);

        assert!(!differ.is_empty());
        assert!(!differ.has_data_changes());

        differ.reset();
        assert!(differ.is_empty());
    }

    #[test]
    fn test_detached_trees_are_ignored() {
        let mut doc = Document::new();
        let element = doc.tree_mut().create_element("p", Default::default());
        let mut differ = Differ::new();
        let op = InsertOperation::new(Position::new(element, vec![0]), vec![ModelNode::text("x")], None);
        differ.buffer_operation(&op.into(), &doc);
        assert!(differ.is_empty());
    }
}
