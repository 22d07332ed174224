//! End-to-end editing scenarios across the document, writer, history and replayer.

use quire_model::operation::{InsertOperation, MergeOperation};
use quire_model::{
    stringify_operations, Batch, BatchType, Document, ModelNode, Operation, OperationReplayer, Position, GRAVEYARD,
};
use serde_json::json;

fn paragraphs(doc: &mut Document, texts: &[&str]) {
    doc.change(|writer| {
        let root = writer.root("main")?;
        for (i, text) in texts.iter().enumerate() {
            let paragraph = writer.insert_element("paragraph", &Position::new(root, vec![i]))?;
            writer.insert_text(text, &writer.create_position_at(paragraph, 0))?;
        }
        Ok(())
    })
    .unwrap();
}

#[test]
fn merge_joins_paragraphs_and_keeps_the_husk() {
    let mut doc = Document::new();
    paragraphs(&mut doc, &["Foo", "bar"]);
    assert_eq!(doc.version(), 4);

    doc.change(|writer| {
        let root = writer.root("main")?;
        writer.merge(&Position::new(root, vec![1]))
    })
    .unwrap();

    assert_eq!(doc.stringify_root("main").unwrap(), "<paragraph>Foobar</paragraph>");
    assert_eq!(doc.stringify_root("$graveyard").unwrap(), "<paragraph></paragraph>");
    assert_eq!(doc.version(), 5);
    assert_eq!(doc.history().last_operation().map(Operation::op_type), Some("merge"));
}

#[test]
fn raw_insert_then_merge() {
    let mut doc = Document::new();
    let root = doc.get_root("main").unwrap();

    let insert = InsertOperation::new(
        Position::new(root, vec![0]),
        vec![
            ModelNode::element("p1").with_child(ModelNode::text("Foo")),
            ModelNode::element("p2").with_child(ModelNode::text("bar")),
        ],
        Some(0),
    );
    let merge = MergeOperation::new(
        Position::new(root, vec![1, 0]),
        3,
        Position::new(root, vec![0, 3]),
        Position::new(GRAVEYARD, vec![0]),
        Some(1),
    );
    doc.change(|writer| {
        writer.apply_operation(insert.into())?;
        writer.apply_operation(merge.into())
    })
    .unwrap();

    assert_eq!(doc.stringify_root("main").unwrap(), "<p1>Foobar</p1>");
    assert_eq!(doc.version(), 2);
}

#[test]
fn reversing_history_restores_the_tree() {
    let mut doc = Document::new();
    paragraphs(&mut doc, &["Foo"]);
    let before_edits = doc.stringify_root("main").unwrap();
    let first_edit = doc.version();

    doc.change(|writer| {
        let root = writer.root("main")?;
        let paragraph = writer.document().tree().child(root, 0).unwrap();
        let range = writer.create_range(writer.create_position_at(paragraph, 1), writer.create_position_at(paragraph, 3));
        writer.set_attribute("bold", json!(true), range)?;
        writer.rename(paragraph, "heading")
    })
    .unwrap();
    assert_eq!(doc.stringify_root("main").unwrap(), "<heading>F<$text bold=true>oo</$text></heading>");

    let applied: Vec<Operation> = doc.history().get_operations(first_edit, doc.version()).to_vec();
    for op in applied.iter().rev() {
        let reversed = op.get_reversed().unwrap().with_base_version(Some(doc.version()));
        doc.change(|writer| writer.apply_operation(reversed)).unwrap();
    }

    assert_eq!(doc.stringify_root("main").unwrap(), before_edits);
    assert_eq!(doc.version(), first_edit + 2 * applied.len() as u64);
}

#[test]
fn skipped_versions_are_recorded_as_gaps() {
    let mut doc = Document::new();
    paragraphs(&mut doc, &["a"]);
    doc.set_version(10).unwrap();
    paragraphs(&mut doc, &["b"]);

    assert_eq!(doc.history().gaps().collect::<Vec<_>>(), vec![(2, 10)]);
    assert_eq!(doc.history().len(), 4);
    let ops = doc.history().get_operations(0, 12);
    assert_eq!(ops.len(), 4);
    assert_eq!(ops[2].base_version(), Some(10));
    assert!(doc.history().get_operations(2, 10).is_empty());
    assert!(doc.set_version(3).is_err());
}

#[test]
fn batch_keeps_only_document_operations() {
    let mut doc = Document::new();
    let (_, batch) = doc
        .change_in_batch(Batch::new(BatchType::default()), |writer| {
            let root = writer.root("main")?;
            let quote = writer.create_element("blockQuote", Default::default());
            let paragraph = writer.insert_element("paragraph", &writer.create_position_at(quote, 0))?;
            writer.insert_text("detached", &writer.create_position_at(paragraph, 0))?;
            writer.insert(quote, &writer.create_position_at(root, 0))
        })
        .unwrap();

    assert_eq!(batch.operations().len(), 1);
    assert_eq!(batch.base_version(), Some(0));
    assert_eq!(doc.version(), 1);
    assert_eq!(
        doc.stringify_root("main").unwrap(),
        "<blockQuote><paragraph>detached</paragraph></blockQuote>"
    );
}

#[test]
fn empty_log_is_finished_right_away() {
    let mut doc = Document::new();
    let mut replayer = OperationReplayer::new(&mut doc, "-------", "").unwrap();
    assert!(replayer.operations_to_replay().is_empty());
    assert!(replayer.apply_next_operation().unwrap());
    assert_eq!(replayer.apply_all_operations().unwrap(), 0);
}

#[test]
fn replay_reproduces_a_recorded_session() {
    let mut source = Document::new();
    paragraphs(&mut source, &["Foo", "bar"]);
    source
        .change(|writer| {
            let root = writer.root("main")?;
            writer.merge(&Position::new(root, vec![1]))
        })
        .unwrap();
    let log = stringify_operations(source.history().operations(), &source, "-------").unwrap();

    let mut target = Document::new();
    let mut replayer = OperationReplayer::new(&mut target, "-------", &log).unwrap();
    assert_eq!(replayer.operations_to_replay().len(), 5);
    assert_eq!(replayer.apply_operations(2).unwrap(), 2);
    assert_eq!(replayer.document().stringify_root("main").unwrap(), "<paragraph>Foo</paragraph>");
    assert_eq!(replayer.apply_all_operations().unwrap(), 3);

    assert_eq!(target.stringify_root("main"), source.stringify_root("main"));
    assert_eq!(target.version(), 5);
}

#[test]
fn replay_with_wrong_base_version_fails() {
    let log = r#"
{"__className":"InsertOperation","baseVersion":0,"position":{"root":"main","path":[0]},"nodes":[{"data":"Foo"}]}
-------
{"__className":"InsertOperation","baseVersion":3,"position":{"root":"main","path":[3]},"nodes":[{"data":"bar"}]}
"#;
    let mut doc = Document::new();
    let mut replayer = OperationReplayer::new(&mut doc, "-------", log).unwrap();

    assert!(!replayer.apply_next_operation().unwrap());
    let err = replayer.apply_next_operation().unwrap_err();
    assert_eq!(err.code(), "model-document-history-addoperation-incorrect-version");
    assert_eq!(doc.stringify_root("main").unwrap(), "Foo");
    assert_eq!(doc.version(), 1);
}
