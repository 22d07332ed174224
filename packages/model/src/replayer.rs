//! Replays a stringified operation log against a document, one change block
//! per operation.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::document::Document;
use crate::errors::ModelResult;
use crate::operation::codec;

/// Separator used between operations in a log when none is configured
pub const DEFAULT_SEPARATOR: &str = "-------";

pub struct OperationReplayer<'a> {
    doc: &'a mut Document,
    separator: String,
    operations: Vec<Value>,
    next: usize,
}

impl std::fmt::Debug for OperationReplayer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationReplayer")
            .field("separator", &self.separator)
            .field("operations", &self.operations)
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

impl<'a> OperationReplayer<'a> {
    pub fn new(doc: &'a mut Document, separator: impl Into<String>, stringified_operations: &str) -> ModelResult<Self> {
        let mut replayer = Self {
            doc,
            separator: separator.into(),
            operations: Vec::new(),
            next: 0,
        };
        replayer.set_stringified_operations(stringified_operations)?;
        Ok(replayer)
    }

    pub fn document(&self) -> &Document {
        self.doc
    }

    /// Operations not replayed yet, as JSON
    pub fn operations_to_replay(&self) -> &[Value] {
        &self.operations[self.next..]
    }

    /// Replace the remaining operations with the ones in `log`. Blank
    /// chunks between separators are skipped.
    pub fn set_stringified_operations(&mut self, log: &str) -> ModelResult<()> {
        self.operations = log
            .split(self.separator.as_str())
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .map(serde_json::from_str)
            .collect::<Result<Vec<Value>, _>>()?;
        self.next = 0;
        Ok(())
    }

    /// Apply the next operation in its own change block. Returns `true` when
    /// there was nothing left to apply.
    pub fn apply_next_operation(&mut self) -> ModelResult<bool> {
        let Some(json) = self.operations.get(self.next) else {
            return Ok(true);
        };
        self.next += 1;

        let op = codec::from_json(json, self.doc)?;
        debug!(
            class = op.class_name(),
            base_version = ?op.base_version(),
            remaining = self.operations.len() - self.next,
            "replaying operation"
        );
        self.doc.change(|writer| writer.apply_operation(op))?;
        Ok(false)
    }

    /// Apply up to `count` operations and return how many were applied
    pub fn apply_operations(&mut self, count: usize) -> ModelResult<usize> {
        for applied in 0..count {
            if self.apply_next_operation()? {
                return Ok(applied);
            }
        }
        Ok(count)
    }

    pub fn apply_all_operations(&mut self) -> ModelResult<usize> {
        let mut applied = 0;
        while !self.apply_next_operation()? {
            applied += 1;
        }
        Ok(applied)
    }

    /// Apply all operations, sleeping `interval` between two of them
    pub fn play(&mut self, interval: Duration) -> ModelResult<usize> {
        let mut applied = 0;
        while !self.apply_next_operation()? {
            applied += 1;
            if !self.operations_to_replay().is_empty() {
                std::thread::sleep(interval);
            }
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{InsertOperation, Operation};
    use crate::position::Position;
    use crate::tree::ModelNode;

    fn log_for(texts: &[&str]) -> String {
        let mut doc = Document::new();
        let root = doc.get_root("main").unwrap();
        let ops: Vec<Operation> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                InsertOperation::new(
                    Position::new(root, vec![i]),
                    vec![ModelNode::text(*text)],
                    Some(i as u64),
                )
                .into()
            })
            .collect();
        codec::stringify_operations(&ops, &doc, DEFAULT_SEPARATOR).unwrap()
    }

    #[test]
    fn test_empty_log_is_finished() {
        let mut doc = Document::new();
        let mut replayer = OperationReplayer::new(&mut doc, DEFAULT_SEPARATOR, "").unwrap();
        assert!(replayer.operations_to_replay().is_empty());
        assert!(replayer.apply_next_operation().unwrap());
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_apply_step_by_step() {
        let mut doc = Document::new();
        let mut replayer = OperationReplayer::new(&mut doc, DEFAULT_SEPARATOR, &log_for(&["a", "b", "c"])).unwrap();
        assert_eq!(replayer.operations_to_replay().len(), 3);

        assert!(!replayer.apply_next_operation().unwrap());
        assert_eq!(replayer.apply_operations(5).unwrap(), 2);
        assert!(replayer.apply_next_operation().unwrap());
        assert_eq!(replayer.document().stringify_root("main").unwrap(), "abc");
        assert_eq!(doc.version(), 3);
    }

    #[test]
    fn test_reset_with_new_log() {
        let mut doc = Document::new();
        let mut replayer = OperationReplayer::new(&mut doc, DEFAULT_SEPARATOR, &log_for(&["a"])).unwrap();
        replayer
            .set_stringified_operations(&format!("{}\n", log_for(&["x", "y"])))
            .unwrap();
        assert_eq!(replayer.apply_all_operations().unwrap(), 2);
        assert_eq!(doc.stringify_root("main").unwrap(), "xy");
    }

    #[test]
    fn test_play_without_delay() {
        let mut doc = Document::new();
        let mut replayer = OperationReplayer::new(&mut doc, DEFAULT_SEPARATOR, &log_for(&["a", "b"])).unwrap();
        assert_eq!(replayer.play(Duration::ZERO).unwrap(), 2);
        assert_eq!(doc.stringify_root("main").unwrap(), "ab");
    }

    #[test]
    fn test_malformed_log() {
        let mut doc = Document::new();
        let err = OperationReplayer::new(&mut doc, DEFAULT_SEPARATOR, "{ not json").unwrap_err();
        assert_eq!(err.code(), "operation-json-malformed");
    }
}
