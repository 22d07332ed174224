//! Named ranges attached to the document

use indexmap::IndexMap;

use crate::range::Range;
use crate::tree::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub name: String,
    pub range: Range,
    /// Changes to this marker go through marker operations
    pub managed_using_operations: bool,
    /// Changes to this marker count as data changes
    pub affects_data: bool,
}

/// Registry of markers, in insertion order
#[derive(Debug, Clone, Default)]
pub struct MarkerCollection {
    markers: IndexMap<String, Marker>,
}

impl MarkerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update a marker
    pub fn set(&mut self, name: &str, range: Range, managed_using_operations: bool, affects_data: bool) {
        self.markers.insert(
            name.to_string(),
            Marker {
                name: name.to_string(),
                range,
                managed_using_operations,
                affects_data,
            },
        );
    }

    pub fn remove(&mut self, name: &str) -> Option<Marker> {
        self.markers.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Marker> {
        self.markers.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.markers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    /// Markers whose range lies in `root`
    pub fn markers_in_root(&self, root: NodeId) -> impl Iterator<Item = &Marker> {
        self.markers.values().filter(move |m| m.range.root() == root)
    }

    /// Markers named `prefix` or `prefix:<anything>`
    pub fn markers_group<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Marker> + 'a {
        self.markers.values().filter(move |m| {
            m.name == prefix
                || m.name
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with(':'))
        })
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }
}
