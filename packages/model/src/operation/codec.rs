//! # Operation Wire Format
//!
//! JSON form of operations, used for storage and replay. Each operation is an
//! object tagged with `__className`; positions refer to roots by name:
//!
//! ```json
//! {
//!   "__className": "MoveOperation",
//!   "baseVersion": 3,
//!   "sourcePosition": { "root": "main", "path": [0, 2], "stickiness": "toNext" },
//!   "howMany": 1,
//!   "targetPosition": { "root": "$graveyard", "path": [0], "stickiness": "toNone" }
//! }
//! ```
//!
//! Only operations on named roots can be serialized. Decoding needs the
//! document to resolve root names, and registers unknown roots named by a
//! root operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::errors::{ModelError, ModelResult};
use crate::position::{Position, Stickiness};
use crate::range::Range;
use crate::tree::{ModelNode, NodeId};

use super::{
    AttributeOperation, DetachOperation, InsertOperation, MarkerOperation, MergeOperation, MoveOperation,
    NoOperation, Operation, RenameOperation, RootAttributeOperation, RootOperation, SplitOperation,
};

const CLASS_NAMES: &[&str] = &[
    "InsertOperation",
    "MoveOperation",
    "DetachOperation",
    "RenameOperation",
    "SplitOperation",
    "MergeOperation",
    "AttributeOperation",
    "RootAttributeOperation",
    "RootOperation",
    "MarkerOperation",
    "NoOperation",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionJson {
    root: String,
    path: Vec<usize>,
    #[serde(default)]
    stickiness: Stickiness,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RangeJson {
    start: PositionJson,
    end: PositionJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "__className")]
enum OperationJson {
    #[serde(rename = "InsertOperation", rename_all = "camelCase")]
    Insert {
        base_version: Option<u64>,
        position: PositionJson,
        nodes: Vec<ModelNode>,
        #[serde(default)]
        should_receive_attributes: bool,
    },
    #[serde(rename = "MoveOperation", rename_all = "camelCase")]
    Move {
        base_version: Option<u64>,
        source_position: PositionJson,
        how_many: usize,
        target_position: PositionJson,
    },
    #[serde(rename = "DetachOperation", rename_all = "camelCase")]
    Detach {
        #[serde(default)]
        base_version: Option<u64>,
        source_position: PositionJson,
        how_many: usize,
    },
    #[serde(rename = "RenameOperation", rename_all = "camelCase")]
    Rename {
        base_version: Option<u64>,
        position: PositionJson,
        old_name: String,
        new_name: String,
    },
    #[serde(rename = "SplitOperation", rename_all = "camelCase")]
    Split {
        base_version: Option<u64>,
        split_position: PositionJson,
        how_many: usize,
        insertion_position: PositionJson,
        #[serde(default)]
        graveyard_position: Option<PositionJson>,
    },
    #[serde(rename = "MergeOperation", rename_all = "camelCase")]
    Merge {
        base_version: Option<u64>,
        source_position: PositionJson,
        how_many: usize,
        target_position: PositionJson,
        graveyard_position: PositionJson,
    },
    #[serde(rename = "AttributeOperation", rename_all = "camelCase")]
    Attribute {
        base_version: Option<u64>,
        range: RangeJson,
        key: String,
        #[serde(default)]
        old_value: Option<Value>,
        #[serde(default)]
        new_value: Option<Value>,
    },
    #[serde(rename = "RootAttributeOperation", rename_all = "camelCase")]
    RootAttribute {
        base_version: Option<u64>,
        root: String,
        key: String,
        #[serde(default)]
        old_value: Option<Value>,
        #[serde(default)]
        new_value: Option<Value>,
    },
    #[serde(rename = "RootOperation", rename_all = "camelCase")]
    Root {
        base_version: Option<u64>,
        root_name: String,
        element_name: String,
        is_add: bool,
    },
    #[serde(rename = "MarkerOperation", rename_all = "camelCase")]
    Marker {
        base_version: Option<u64>,
        name: String,
        #[serde(default)]
        old_range: Option<RangeJson>,
        #[serde(default)]
        new_range: Option<RangeJson>,
        #[serde(default)]
        affects_data: bool,
    },
    #[serde(rename = "NoOperation", rename_all = "camelCase")]
    NoOp { base_version: Option<u64> },
}

fn root_name(doc: &Document, root: NodeId) -> ModelResult<String> {
    let tree = doc.tree();
    match tree.root_info(root) {
        Some(info) if tree.parent(root).is_none() => Ok(info.root_name.clone()),
        _ => Err(ModelError::NotSerializable),
    }
}

fn encode_position(doc: &Document, position: &Position) -> ModelResult<PositionJson> {
    Ok(PositionJson {
        root: root_name(doc, position.root)?,
        path: position.path.clone(),
        stickiness: position.stickiness,
    })
}

fn encode_range(doc: &Document, range: &Range) -> ModelResult<RangeJson> {
    Ok(RangeJson {
        start: encode_position(doc, &range.start)?,
        end: encode_position(doc, &range.end)?,
    })
}

fn resolve_root(doc: &Document, name: &str) -> ModelResult<NodeId> {
    doc.get_root(name).ok_or_else(|| ModelError::RootNotFound(name.to_string()))
}

fn decode_position(doc: &Document, json: PositionJson) -> ModelResult<Position> {
    Ok(Position::new(resolve_root(doc, &json.root)?, json.path).with_stickiness(json.stickiness))
}

fn decode_range(doc: &Document, json: RangeJson) -> ModelResult<Range> {
    Ok(Range {
        start: decode_position(doc, json.start)?,
        end: decode_position(doc, json.end)?,
    })
}

/// Encode an operation. Fails with `NotSerializable` for operations on
/// trees that are not named roots.
pub fn to_json(op: &Operation, doc: &Document) -> ModelResult<Value> {
    let json = match op {
        Operation::Insert(op) => OperationJson::Insert {
            base_version: op.base_version,
            position: encode_position(doc, &op.position)?,
            nodes: op.nodes.clone(),
            should_receive_attributes: op.should_receive_attributes,
        },
        Operation::Move(op) => OperationJson::Move {
            base_version: op.base_version,
            source_position: encode_position(doc, &op.source_position)?,
            how_many: op.how_many,
            target_position: encode_position(doc, &op.target_position)?,
        },
        Operation::Detach(op) => OperationJson::Detach {
            base_version: None,
            source_position: encode_position(doc, &op.source_position)?,
            how_many: op.how_many,
        },
        Operation::Rename(op) => OperationJson::Rename {
            base_version: op.base_version,
            position: encode_position(doc, &op.position)?,
            old_name: op.old_name.clone(),
            new_name: op.new_name.clone(),
        },
        Operation::Split(op) => OperationJson::Split {
            base_version: op.base_version,
            split_position: encode_position(doc, &op.split_position)?,
            how_many: op.how_many,
            insertion_position: encode_position(doc, &op.insertion_position)?,
            graveyard_position: op
                .graveyard_position
                .as_ref()
                .map(|p| encode_position(doc, p))
                .transpose()?,
        },
        Operation::Merge(op) => OperationJson::Merge {
            base_version: op.base_version,
            source_position: encode_position(doc, &op.source_position)?,
            how_many: op.how_many,
            target_position: encode_position(doc, &op.target_position)?,
            graveyard_position: encode_position(doc, &op.graveyard_position)?,
        },
        Operation::Attribute(op) => OperationJson::Attribute {
            base_version: op.base_version,
            range: encode_range(doc, &op.range)?,
            key: op.key.clone(),
            old_value: op.old_value.clone(),
            new_value: op.new_value.clone(),
        },
        Operation::RootAttribute(op) => OperationJson::RootAttribute {
            base_version: op.base_version,
            root: root_name(doc, op.root)?,
            key: op.key.clone(),
            old_value: op.old_value.clone(),
            new_value: op.new_value.clone(),
        },
        Operation::Root(op) => OperationJson::Root {
            base_version: op.base_version,
            root_name: op.root_name.clone(),
            element_name: op.element_name.clone(),
            is_add: op.is_add,
        },
        Operation::Marker(op) => OperationJson::Marker {
            base_version: op.base_version,
            name: op.name.clone(),
            old_range: op.old_range.as_ref().map(|r| encode_range(doc, r)).transpose()?,
            new_range: op.new_range.as_ref().map(|r| encode_range(doc, r)).transpose()?,
            affects_data: op.affects_data,
        },
        Operation::NoOp(op) => OperationJson::NoOp {
            base_version: op.base_version,
        },
    };
    Ok(serde_json::to_value(json)?)
}

/// Decode an operation, resolving root names against `doc`
pub fn from_json(value: &Value, doc: &mut Document) -> ModelResult<Operation> {
    let class_name = value
        .get("__className")
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::Json("missing __className".to_string()))?;
    if !CLASS_NAMES.contains(&class_name) {
        return Err(ModelError::UnknownOperationClass(class_name.to_string()));
    }

    let json: OperationJson = serde_json::from_value(value.clone())?;
    let op = match json {
        OperationJson::Insert {
            base_version,
            position,
            nodes,
            should_receive_attributes,
        } => {
            let mut op = InsertOperation::new(decode_position(doc, position)?, nodes, base_version);
            op.should_receive_attributes = should_receive_attributes;
            op.into()
        }
        OperationJson::Move {
            base_version,
            source_position,
            how_many,
            target_position,
        } => MoveOperation::new(
            decode_position(doc, source_position)?,
            how_many,
            decode_position(doc, target_position)?,
            base_version,
        )
        .into(),
        OperationJson::Detach {
            source_position,
            how_many,
            ..
        } => DetachOperation::new(decode_position(doc, source_position)?, how_many).into(),
        OperationJson::Rename {
            base_version,
            position,
            old_name,
            new_name,
        } => RenameOperation::new(decode_position(doc, position)?, old_name, new_name, base_version).into(),
        OperationJson::Split {
            base_version,
            split_position,
            how_many,
            insertion_position,
            graveyard_position,
        } => SplitOperation::new(
            decode_position(doc, split_position)?,
            how_many,
            decode_position(doc, insertion_position)?,
            graveyard_position.map(|p| decode_position(doc, p)).transpose()?,
            base_version,
        )
        .into(),
        OperationJson::Merge {
            base_version,
            source_position,
            how_many,
            target_position,
            graveyard_position,
        } => MergeOperation::new(
            decode_position(doc, source_position)?,
            how_many,
            decode_position(doc, target_position)?,
            decode_position(doc, graveyard_position)?,
            base_version,
        )
        .into(),
        OperationJson::Attribute {
            base_version,
            range,
            key,
            old_value,
            new_value,
        } => AttributeOperation::new(decode_range(doc, range)?, key, old_value, new_value, base_version).into(),
        OperationJson::RootAttribute {
            base_version,
            root,
            key,
            old_value,
            new_value,
        } => RootAttributeOperation::new(resolve_root(doc, &root)?, key, old_value, new_value, base_version).into(),
        OperationJson::Root {
            base_version,
            root_name,
            element_name,
            is_add,
        } => {
            doc.ensure_root(&element_name, &root_name);
            RootOperation::new(root_name, element_name, is_add, base_version).into()
        }
        OperationJson::Marker {
            base_version,
            name,
            old_range,
            new_range,
            affects_data,
        } => MarkerOperation::new(
            name,
            old_range.map(|r| decode_range(doc, r)).transpose()?,
            new_range.map(|r| decode_range(doc, r)).transpose()?,
            affects_data,
            base_version,
        )
        .into(),
        OperationJson::NoOp { base_version } => NoOperation::new(base_version).into(),
    };
    Ok(op)
}

/// Join operations into one string, each as compact JSON
pub fn stringify_operations(ops: &[Operation], doc: &Document, separator: &str) -> ModelResult<String> {
    let encoded = ops
        .iter()
        .map(|op| to_json(op, doc).map(|value| value.to_string()))
        .collect::<ModelResult<Vec<_>>>()?;
    Ok(encoded.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationKind;
    use crate::tree::GRAVEYARD;
    use serde_json::json;

    #[test]
    fn test_move_json_shape() {
        let doc = Document::new();
        let root = doc.get_root("main").unwrap();
        let op: Operation =
            MoveOperation::new(Position::new(root, vec![0, 2]), 1, Position::new(GRAVEYARD, vec![0]), Some(3)).into();

        assert_eq!(
            to_json(&op, &doc).unwrap(),
            json!({
                "__className": "MoveOperation",
                "baseVersion": 3,
                "sourcePosition": { "root": "main", "path": [0, 2], "stickiness": "toNext" },
                "howMany": 1,
                "targetPosition": { "root": "$graveyard", "path": [0], "stickiness": "toNone" }
            })
        );
    }

    #[test]
    fn test_decode_insert() {
        let mut doc = Document::new();
        let value = json!({
            "__className": "InsertOperation",
            "baseVersion": 0,
            "position": { "root": "main", "path": [0] },
            "nodes": [{ "name": "paragraph", "children": [{ "data": "Foo", "attributes": { "bold": true } }] }]
        });
        let op = from_json(&value, &mut doc).unwrap();

        match &op {
            Operation::Insert(insert) => {
                assert_eq!(insert.position.root, doc.get_root("main").unwrap());
                assert_eq!(insert.how_many(), 1);
                assert!(!insert.should_receive_attributes);
            }
            other => panic!("unexpected operation: {other:?}"),
        }
        assert_eq!(to_json(&op, &doc).unwrap()["nodes"], value["nodes"]);
    }

    #[test]
    fn test_attribute_null_values() {
        let mut doc = Document::new();
        let value = json!({
            "__className": "AttributeOperation",
            "baseVersion": 0,
            "range": {
                "start": { "root": "main", "path": [0] },
                "end": { "root": "main", "path": [0] }
            },
            "key": "bold",
            "oldValue": null,
            "newValue": true
        });
        match from_json(&value, &mut doc).unwrap() {
            Operation::Attribute(op) => {
                assert_eq!(op.old_value, None);
                assert_eq!(op.new_value, Some(json!(true)));
                assert_eq!(op.op_type(), "addAttribute");
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_class_and_root() {
        let mut doc = Document::new();
        let err = from_json(&json!({ "__className": "FooOperation" }), &mut doc).unwrap_err();
        assert_eq!(err, ModelError::UnknownOperationClass("FooOperation".into()));

        let noop = from_json(
            &json!({ "__className": "NoOperation", "baseVersion": 0, "extra": 1 }),
            &mut doc,
        );
        assert!(noop.is_ok());

        let err = from_json(
            &json!({
                "__className": "RenameOperation",
                "baseVersion": 0,
                "position": { "root": "nope", "path": [0] },
                "oldName": "a",
                "newName": "b"
            }),
            &mut doc,
        )
        .unwrap_err();
        assert_eq!(err, ModelError::RootNotFound("nope".into()));
    }

    #[test]
    fn test_root_operation_registers_root() {
        let mut doc = Document::new();
        let value = json!({
            "__className": "RootOperation",
            "baseVersion": 0,
            "rootName": "extra",
            "elementName": "$root",
            "isAdd": true
        });
        from_json(&value, &mut doc).unwrap();
        assert!(doc.get_root("extra").is_some());
        assert_eq!(doc.root_names(false), vec!["main".to_string()]);
    }

    #[test]
    fn test_detached_tree_is_not_serializable() {
        let mut doc = Document::new();
        let element = doc.tree_mut().create_element("p", Default::default());
        let op: Operation = DetachOperation::new(Position::new(element, vec![0]), 1).into();
        assert_eq!(to_json(&op, &doc).unwrap_err(), ModelError::NotSerializable);
    }
}
