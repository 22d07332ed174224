use crate::document::Document;
use crate::errors::ModelResult;
use crate::range::Range;

use super::{next_version, Execute, Operation, OperationKind, Reversible};

/// Create, move or remove a named marker. `None` ranges mean "no marker".
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOperation {
    pub name: String,
    pub old_range: Option<Range>,
    pub new_range: Option<Range>,
    pub affects_data: bool,
    pub base_version: Option<u64>,
}

impl MarkerOperation {
    pub fn new(
        name: impl Into<String>,
        old_range: Option<Range>,
        new_range: Option<Range>,
        affects_data: bool,
        base_version: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            old_range,
            new_range,
            affects_data,
            base_version,
        }
    }
}

impl OperationKind for MarkerOperation {
    fn base_version(&self) -> Option<u64> {
        self.base_version
    }

    fn op_type(&self) -> &'static str {
        "marker"
    }

    fn class_name(&self) -> &'static str {
        "MarkerOperation"
    }

    fn validate(&self, _doc: &Document) -> ModelResult<()> {
        Ok(())
    }
}

impl Execute for MarkerOperation {
    fn execute(&self, doc: &mut Document) -> ModelResult<()> {
        match &self.new_range {
            Some(range) => doc
                .markers_mut()
                .set(&self.name, range.clone(), true, self.affects_data),
            None => {
                doc.markers_mut().remove(&self.name);
            }
        }
        Ok(())
    }
}

impl Reversible for MarkerOperation {
    fn get_reversed(&self) -> Operation {
        MarkerOperation::new(
            self.name.clone(),
            self.new_range.clone(),
            self.old_range.clone(),
            self.affects_data,
            next_version(self.base_version),
        )
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn test_marker_set_and_reverse() {
        let mut doc = Document::new();
        let root = doc.get_root("main").unwrap();
        let range = Range::collapsed(Position::new(root, vec![0]));
        let op = MarkerOperation::new("comment:1", None, Some(range.clone()), false, Some(0));
        let reversed = op.get_reversed();

        doc.apply_operation(op.into()).unwrap();
        let marker = doc.markers().get("comment:1").unwrap();
        assert_eq!(marker.range, range);
        assert!(marker.managed_using_operations);

        doc.apply_operation(reversed).unwrap();
        assert!(!doc.markers().has("comment:1"));
    }
}
