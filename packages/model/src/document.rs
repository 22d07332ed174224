//! # Document
//!
//! Owns the node tree, the named roots, the history and the change
//! machinery.
//!
//! ## Design
//!
//! All mutation happens inside a *change block*: [`Document::change`] hands a
//! [`Writer`] to a callback, and the block boundary defines one batch, one
//! post-fixer pass and one change notification.
//!
//! `apply_operation` runs the pipeline for a single operation:
//!
//! 1. validate against the current tree (no side effects on failure)
//! 2. document operations must carry `base_version == version()`
//! 3. buffer the change in the differ
//! 4. execute through the tree primitives
//! 5. record document operations in the history, bumping the version
//!
//! Changes enqueued while a block runs are executed after it, each in its
//! own block. A failing block is not rolled back: the operations already
//! applied stay applied and recorded, post-fixers are skipped and the queue
//! of pending changes is dropped.

use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::batch::{Batch, BatchType};
use crate::differ::{DiffItem, Differ};
use crate::errors::{ModelError, ModelResult};
use crate::history::History;
use crate::markers::MarkerCollection;
use crate::operation::{InsertOperation, Operation};
use crate::tree::{NodeId, Tree, GRAVEYARD, GRAVEYARD_NAME};
use crate::writer::Writer;

/// Main root created together with the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentOptions {
    pub root_name: String,
    pub root_element: String,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            root_name: "main".to_string(),
            root_element: "$root".to_string(),
        }
    }
}

/// Emitted once per change block that changed something
#[derive(Debug)]
pub struct ChangeEvent<'a> {
    pub batch: &'a Batch,
    pub changes: &'a [DiffItem],
    pub has_data_changes: bool,
}

/// Repairs the model after a change block.
///
/// Returns `true` when it changed something, which restarts the pass from
/// the first post-fixer.
pub trait PostFixer {
    fn fix(&mut self, writer: &mut Writer<'_>) -> ModelResult<bool>;
}

impl<F> PostFixer for F
where
    F: FnMut(&mut Writer<'_>) -> ModelResult<bool>,
{
    fn fix(&mut self, writer: &mut Writer<'_>) -> ModelResult<bool> {
        self(writer)
    }
}

pub(crate) type PendingChange = Box<dyn FnOnce(&mut Writer<'_>) -> ModelResult<()>>;

type ChangeObserver = Box<dyn FnMut(&ChangeEvent<'_>)>;

pub struct Document {
    tree: Tree,
    /// Named roots in creation order, attached or not
    roots: IndexMap<String, NodeId>,
    history: History,
    differ: Differ,
    markers: MarkerCollection,
    post_fixers: Vec<Box<dyn PostFixer>>,
    observers: Vec<ChangeObserver>,
    pending: VecDeque<(Batch, PendingChange)>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("roots", &self.roots)
            .field("version", &self.version())
            .field("markers", &self.markers.len())
            .finish()
    }
}

impl Document {
    /// Document with an attached `main` root of element `$root`
    pub fn new() -> Self {
        Self::with_options(DocumentOptions::default())
    }

    pub fn with_options(options: DocumentOptions) -> Self {
        let mut doc = Self {
            tree: Tree::new(),
            roots: IndexMap::new(),
            history: History::new(),
            differ: Differ::new(),
            markers: MarkerCollection::new(),
            post_fixers: Vec::new(),
            observers: Vec::new(),
            pending: VecDeque::new(),
        };
        let root = doc.ensure_root(&options.root_element, &options.root_name);
        doc.tree.set_root_attached(root, true);
        doc
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn differ(&self) -> &Differ {
        &self.differ
    }

    pub(crate) fn differ_mut(&mut self) -> &mut Differ {
        &mut self.differ
    }

    pub fn markers(&self) -> &MarkerCollection {
        &self.markers
    }

    pub(crate) fn markers_mut(&mut self) -> &mut MarkerCollection {
        &mut self.markers
    }

    pub fn version(&self) -> u64 {
        self.history.version()
    }

    /// Jump the version forward, e.g. after syncing roots out of band
    pub fn set_version(&mut self, version: u64) -> ModelResult<()> {
        self.history.set_version(version)
    }

    // ── Roots ─────────────────────────────────────────────────────────────

    /// Root by name, attached or not. `$graveyard` resolves to the graveyard.
    pub fn get_root(&self, name: &str) -> Option<NodeId> {
        if name == GRAVEYARD_NAME {
            return Some(GRAVEYARD);
        }
        self.roots.get(name).copied()
    }

    pub fn graveyard(&self) -> NodeId {
        GRAVEYARD
    }

    /// Create and attach a new root
    pub fn create_root(&mut self, element_name: &str, root_name: &str) -> ModelResult<NodeId> {
        if self.get_root(root_name).is_some() {
            return Err(ModelError::RootNameExists(root_name.to_string()));
        }
        let root = self.ensure_root(element_name, root_name);
        self.tree.set_root_attached(root, true);
        Ok(root)
    }

    /// Existing root named `root_name`, or a new detached one
    pub(crate) fn ensure_root(&mut self, element_name: &str, root_name: &str) -> NodeId {
        if let Some(root) = self.get_root(root_name) {
            return root;
        }
        let root = self.tree.create_root(element_name, root_name);
        self.roots.insert(root_name.to_string(), root);
        root
    }

    /// Root names in creation order, without the graveyard
    pub fn root_names(&self, include_detached: bool) -> Vec<String> {
        self.roots
            .iter()
            .filter(|(_, &root)| include_detached || self.is_attached_root(root))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn is_attached_root(&self, root: NodeId) -> bool {
        self.tree.root_info(root).is_some_and(|info| info.is_attached)
    }

    /// Whether `node` lives in one of the document's roots (or the graveyard)
    pub fn is_document_tree(&self, node: NodeId) -> bool {
        self.tree.root_info(self.tree.root_of(node)).is_some()
    }

    pub fn stringify_root(&self, name: &str) -> Option<String> {
        self.get_root(name).map(|root| self.tree.stringify(root))
    }

    // ── Operations ────────────────────────────────────────────────────────

    /// Validate, execute and record one operation
    pub fn apply_operation(&mut self, op: Operation) -> ModelResult<()> {
        self.apply_with(op, |op, doc| op.execute(doc))
    }

    /// Insert already-built detached nodes; `op.nodes` must be their snapshot
    pub(crate) fn apply_insert_with_nodes(&mut self, op: InsertOperation, nodes: Vec<NodeId>) -> ModelResult<()> {
        self.apply_with(Operation::Insert(op), move |op, doc| match op {
            Operation::Insert(insert) => insert.execute_with_nodes(doc, nodes),
            other => other.execute(doc),
        })
    }

    fn apply_with(
        &mut self,
        op: Operation,
        execute: impl FnOnce(&Operation, &mut Document) -> ModelResult<()>,
    ) -> ModelResult<()> {
        let base_version = op.base_version();
        if let Some(base_version) = base_version {
            if base_version != self.version() {
                return Err(ModelError::IncorrectVersion {
                    base_version,
                    history_version: self.version(),
                });
            }
        }

        op.validate(self)?;

        if base_version.is_some() {
            let mut differ = std::mem::take(&mut self.differ);
            differ.buffer_operation(&op, self);
            self.differ = differ;
        }

        execute(&op, self)?;

        debug!(
            class = op.class_name(),
            op_type = op.op_type(),
            base_version = ?base_version,
            "applied operation"
        );

        if op.is_document_operation() {
            self.history.add_operation(op)?;
        }
        Ok(())
    }

    // ── Change blocks ─────────────────────────────────────────────────────

    /// Run `callback` in a new default batch
    pub fn change<R>(&mut self, callback: impl FnOnce(&mut Writer<'_>) -> ModelResult<R>) -> ModelResult<R> {
        self.change_in_batch(Batch::default(), callback).map(|(result, _)| result)
    }

    /// Run `callback` adding operations to `batch`, then run the changes it
    /// enqueued. Returns the callback's result and the finished batch.
    pub fn change_in_batch<R>(
        &mut self,
        batch: Batch,
        callback: impl FnOnce(&mut Writer<'_>) -> ModelResult<R>,
    ) -> ModelResult<(R, Batch)> {
        let mut batch = batch;
        let result = self.run_block(&mut batch, callback);
        let result = match result {
            Ok(value) => value,
            Err(err) => {
                self.pending.clear();
                return Err(err);
            }
        };
        self.run_pending()?;
        Ok((result, batch))
    }

    /// Queue a change block. Outside of a block it runs right away.
    pub fn enqueue_change(
        &mut self,
        batch_type: BatchType,
        callback: impl FnOnce(&mut Writer<'_>) -> ModelResult<()> + 'static,
    ) -> ModelResult<()> {
        self.pending.push_back((Batch::new(batch_type), Box::new(callback)));
        self.run_pending()
    }

    pub(crate) fn push_pending(&mut self, batch: Batch, callback: PendingChange) {
        self.pending.push_back((batch, callback));
    }

    fn run_pending(&mut self) -> ModelResult<()> {
        while let Some((mut batch, callback)) = self.pending.pop_front() {
            if let Err(err) = self.run_block(&mut batch, callback) {
                self.pending.clear();
                return Err(err);
            }
        }
        Ok(())
    }

    fn run_block<R>(
        &mut self,
        batch: &mut Batch,
        callback: impl FnOnce(&mut Writer<'_>) -> ModelResult<R>,
    ) -> ModelResult<R> {
        let version_before = self.version();
        let result = callback(&mut Writer::new(self, batch));

        let result = match result {
            Ok(value) => self.run_post_fixers(batch).map(|_| value),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            warn!(code = err.code(), error = %err, "change block failed");
        }

        if self.version() != version_before || !self.differ.is_empty() {
            self.notify(batch);
        }
        self.differ.reset();
        result
    }

    /// Run post-fixers until none of them changes anything
    fn run_post_fixers(&mut self, batch: &mut Batch) -> ModelResult<()> {
        let mut fixers = std::mem::take(&mut self.post_fixers);
        let mut result = Ok(());
        let mut pass = 0;
        'passes: loop {
            pass += 1;
            trace!(pass, "running post-fixers");
            for fixer in fixers.iter_mut() {
                match fixer.fix(&mut Writer::new(self, batch)) {
                    Ok(true) => continue 'passes,
                    Ok(false) => {}
                    Err(err) => {
                        result = Err(err);
                        break 'passes;
                    }
                }
            }
            break;
        }
        // fixers registered while running go after the existing ones
        fixers.append(&mut self.post_fixers);
        self.post_fixers = fixers;
        result
    }

    fn notify(&mut self, batch: &Batch) {
        let event = ChangeEvent {
            batch,
            changes: self.differ.changes(),
            has_data_changes: self.differ.has_data_changes(),
        };
        trace!(
            changes = event.changes.len(),
            has_data_changes = event.has_data_changes,
            version = self.history.version(),
            "change"
        );
        for observer in self.observers.iter_mut() {
            observer(&event);
        }
    }

    pub fn register_post_fixer(&mut self, fixer: impl PostFixer + 'static) {
        self.post_fixers.push(Box::new(fixer));
    }

    pub fn on_change(&mut self, observer: impl FnMut(&ChangeEvent<'_>) + 'static) {
        self.observers.push(Box::new(observer));
    }
}
