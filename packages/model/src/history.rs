//! # History
//!
//! Append-only ledger of applied document operations.
//!
//! ## Design
//!
//! - Operations are stored in application order and indexed by base version
//! - `version` is the base version the next operation must carry
//! - Jumping the version forward by more than one (roots synchronized out of
//!   band) records a gap; the skipped versions have no operations
//! - Undo pairs record which operation undid which, keyed by base version

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::errors::{ModelError, ModelResult};
use crate::operation::Operation;

#[derive(Debug, Clone, Default)]
pub struct History {
    operations: Vec<Operation>,

    /// Base version -> index in `operations`
    base_version_to_index: HashMap<u64, usize>,

    version: u64,

    /// Version before a jump -> version after it
    gaps: BTreeMap<u64, u64>,

    /// Undoing base version -> undone base version
    undo_pairs: HashMap<u64, u64>,

    undone: HashSet<u64>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Move the version forward. Skipping versions records a gap.
    pub fn set_version(&mut self, version: u64) -> ModelResult<()> {
        if version < self.version {
            return Err(ModelError::VersionDecrease {
                current: self.version,
                requested: version,
            });
        }
        if version > self.version + 1 {
            self.gaps.insert(self.version, version);
        }
        self.version = version;
        Ok(())
    }

    /// Recorded gaps as `(version before, version after)`
    pub fn gaps(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.gaps.iter().map(|(&from, &to)| (from, to))
    }

    /// Append a document operation; its base version must equal `version()`
    pub fn add_operation(&mut self, op: Operation) -> ModelResult<()> {
        let base_version = op.base_version();
        if base_version != Some(self.version) {
            return Err(ModelError::IncorrectVersion {
                base_version: base_version.unwrap_or_default(),
                history_version: self.version,
            });
        }
        self.base_version_to_index.insert(self.version, self.operations.len());
        self.operations.push(op);
        self.version += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Operations with base versions in `[from, to)`
    pub fn get_operations(&self, from: u64, to: u64) -> &[Operation] {
        let start = self.first_index_at_or_after(from);
        let end = self.first_index_at_or_after(to);
        if start >= end {
            return &[];
        }
        &self.operations[start..end]
    }

    /// Index of the first stored operation whose base version is `>= version`.
    /// Versions inside a gap snap to the gap's far edge.
    fn first_index_at_or_after(&self, version: u64) -> usize {
        if let Some(&index) = self.base_version_to_index.get(&version) {
            return index;
        }
        let first_base_version = self.operations.first().and_then(Operation::base_version);
        match first_base_version {
            None => return 0,
            Some(first) if version <= first => return 0,
            _ => {}
        }
        let gap_end = self
            .gaps
            .range(..=version)
            .next_back()
            .filter(|(_, &to)| version < to)
            .map(|(_, &to)| to);
        match gap_end {
            Some(to) => self.first_index_at_or_after(to),
            None => self.operations.len(),
        }
    }

    pub fn get_operation(&self, base_version: u64) -> Option<&Operation> {
        self.base_version_to_index
            .get(&base_version)
            .and_then(|&index| self.operations.get(index))
    }

    pub fn last_operation(&self) -> Option<&Operation> {
        self.operations.last()
    }

    /// Record that `undoing` reverted `undone`
    pub fn set_operation_as_undone(&mut self, undone: &Operation, undoing: &Operation) {
        if let (Some(undone), Some(undoing)) = (undone.base_version(), undoing.base_version()) {
            self.undo_pairs.insert(undoing, undone);
            self.undone.insert(undone);
        }
    }

    pub fn is_undoing_operation(&self, op: &Operation) -> bool {
        op.base_version()
            .is_some_and(|version| self.undo_pairs.contains_key(&version))
    }

    pub fn is_undone_operation(&self, op: &Operation) -> bool {
        op.base_version().is_some_and(|version| self.undone.contains(&version))
    }

    /// Operation that `undoing` reverted
    pub fn get_undone_operation(&self, undoing: &Operation) -> Option<&Operation> {
        let undone = self.undo_pairs.get(&undoing.base_version()?)?;
        self.get_operation(*undone)
    }

    /// Forget everything and return to version 0
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
