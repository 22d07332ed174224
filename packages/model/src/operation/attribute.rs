use serde_json::Value;

use crate::document::Document;
use crate::errors::{ModelError, ModelResult};
use crate::primitives;
use crate::range::Range;
use crate::tree::NodeId;

use super::{next_version, Execute, Operation, OperationKind, Reversible};

/// Set, change or remove an attribute on the shallow content of a flat range.
/// A `None` value means "attribute not set".
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeOperation {
    pub range: Range,
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub base_version: Option<u64>,
}

impl AttributeOperation {
    pub fn new(
        range: Range,
        key: impl Into<String>,
        old_value: Option<Value>,
        new_value: Option<Value>,
        base_version: Option<u64>,
    ) -> Self {
        Self {
            range,
            key: key.into(),
            old_value,
            new_value,
            base_version,
        }
    }
}

fn attribute_op_type(old_value: &Option<Value>, new_value: &Option<Value>) -> &'static str {
    match (old_value, new_value) {
        (None, _) => "addAttribute",
        (_, None) => "removeAttribute",
        _ => "changeAttribute",
    }
}

impl OperationKind for AttributeOperation {
    fn base_version(&self) -> Option<u64> {
        self.base_version
    }

    fn op_type(&self) -> &'static str {
        attribute_op_type(&self.old_value, &self.new_value)
    }

    fn class_name(&self) -> &'static str {
        "AttributeOperation"
    }

    fn validate(&self, doc: &Document) -> ModelResult<()> {
        if !self.range.is_flat() {
            return Err(ModelError::RangeNotFlat);
        }
        let tree = doc.tree();
        for item in self.range.shallow_items(tree)? {
            let current = tree.attribute(item.node(), &self.key);
            if self.old_value.is_some() && current != self.old_value.as_ref() {
                return Err(ModelError::AttributeWrongOldValue(self.key.clone()));
            }
            if self.old_value.is_none() && self.new_value.is_some() && current.is_some() {
                return Err(ModelError::AttributeExists(self.key.clone()));
            }
        }
        Ok(())
    }
}

impl Execute for AttributeOperation {
    fn execute(&self, doc: &mut Document) -> ModelResult<()> {
        if self.old_value == self.new_value {
            return Ok(());
        }
        primitives::set_attribute(doc.tree_mut(), &self.range, &self.key, self.new_value.as_ref())
    }
}

impl Reversible for AttributeOperation {
    fn get_reversed(&self) -> Operation {
        AttributeOperation::new(
            self.range.clone(),
            self.key.clone(),
            self.new_value.clone(),
            self.old_value.clone(),
            next_version(self.base_version),
        )
        .into()
    }
}

/// Attribute change on an element without a parent (usually a root),
/// which no range can reach
#[derive(Debug, Clone, PartialEq)]
pub struct RootAttributeOperation {
    pub root: NodeId,
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub base_version: Option<u64>,
}

impl RootAttributeOperation {
    pub fn new(
        root: NodeId,
        key: impl Into<String>,
        old_value: Option<Value>,
        new_value: Option<Value>,
        base_version: Option<u64>,
    ) -> Self {
        Self {
            root,
            key: key.into(),
            old_value,
            new_value,
            base_version,
        }
    }
}

impl OperationKind for RootAttributeOperation {
    fn base_version(&self) -> Option<u64> {
        self.base_version
    }

    fn op_type(&self) -> &'static str {
        match (&self.old_value, &self.new_value) {
            (None, _) => "addRootAttribute",
            (_, None) => "removeRootAttribute",
            _ => "changeRootAttribute",
        }
    }

    fn class_name(&self) -> &'static str {
        "RootAttributeOperation"
    }

    fn validate(&self, doc: &Document) -> ModelResult<()> {
        let tree = doc.tree();
        if !tree.is_element(self.root) || tree.parent(self.root).is_some() {
            return Err(ModelError::RootAttributeNotARoot);
        }
        let current = tree.attribute(self.root, &self.key);
        if self.old_value.is_some() && current != self.old_value.as_ref() {
            return Err(ModelError::RootAttributeWrongOldValue(self.key.clone()));
        }
        if self.old_value.is_none() && self.new_value.is_some() && current.is_some() {
            return Err(ModelError::RootAttributeExists(self.key.clone()));
        }
        Ok(())
    }
}

impl Execute for RootAttributeOperation {
    fn execute(&self, doc: &mut Document) -> ModelResult<()> {
        let tree = doc.tree_mut();
        match &self.new_value {
            Some(value) => tree.set_attribute(self.root, &self.key, value.clone()),
            None => tree.remove_attribute(self.root, &self.key),
        }
    }
}

impl Reversible for RootAttributeOperation {
    fn get_reversed(&self) -> Operation {
        RootAttributeOperation::new(
            self.root,
            self.key.clone(),
            self.new_value.clone(),
            self.old_value.clone(),
            next_version(self.base_version),
        )
        .into()
    }
}
