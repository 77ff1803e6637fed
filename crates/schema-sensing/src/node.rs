//! The recursive schema aggregate.
//!
//! A [`SchemaNode`] describes one path of the document tree across every
//! sample routed to it. Container evidence lives in [`Shape`] and scalar
//! evidence in [`ScalarSummary`]; each of them is set at most once and
//! only the scalar summary ever changes representation afterwards
//! (enumerated → range or charset, never back).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::kind::{Literal, ValueKind};

/// Observed shape of one path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    /// Visits to this path.
    pub count: u64,

    /// Visits per value kind.
    pub types: BTreeMap<ValueKind, u64>,

    /// Object or array evidence, fixed by the first container seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,

    /// Scalar evidence, created by the first scalar seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalars: Option<ScalarSummary>,
}

impl SchemaNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one visit of the given kind.
    pub(crate) fn record(&mut self, kind: ValueKind) {
        self.count += 1;
        *self.types.entry(kind).or_insert(0) += 1;
    }

    /// Visits that carried the given kind.
    pub fn kind_count(&self, kind: ValueKind) -> u64 {
        self.types.get(&kind).copied().unwrap_or(0)
    }

    pub fn has_kind(&self, kind: ValueKind) -> bool {
        self.kind_count(kind) > 0
    }

    /// True when the histogram holds both object and array evidence.
    pub fn is_contradictory(&self) -> bool {
        self.has_kind(ValueKind::Object) && self.has_kind(ValueKind::Array)
    }

    pub fn as_object(&self) -> Option<&ObjectShape> {
        match &self.shape {
            Some(Shape::Object(obj)) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayShape> {
        match &self.shape {
            Some(Shape::Array(arr)) => Some(arr),
            _ => None,
        }
    }

    /// Child for `name`, if this node is an object that has seen it.
    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.as_object().and_then(|o| o.children.get(name))
    }

    /// Follow a path of field names from this node.
    pub fn descend<'a, I>(&self, path: I) -> Option<&SchemaNode>
    where
        I: IntoIterator<Item = &'a str>,
    {
        path.into_iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Object shape, created on first use. Returns `None` when the node
    /// is already an array.
    pub(crate) fn object_mut(&mut self) -> Option<&mut ObjectShape> {
        match self
            .shape
            .get_or_insert_with(|| Shape::Object(ObjectShape::default()))
        {
            Shape::Object(obj) => Some(obj),
            Shape::Array(_) => None,
        }
    }

    /// Array shape, created on first use. Returns `None` when the node is
    /// already an object.
    pub(crate) fn array_mut(&mut self) -> Option<&mut ArrayShape> {
        match self
            .shape
            .get_or_insert_with(|| Shape::Array(ArrayShape::default()))
        {
            Shape::Array(arr) => Some(arr),
            Shape::Object(_) => None,
        }
    }

    pub(crate) fn scalars_mut(&mut self) -> &mut ScalarSummary {
        self.scalars.get_or_insert_with(ScalarSummary::default)
    }
}

/// Container payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Object(ObjectShape),
    Array(ArrayShape),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectShape {
    /// Field name → child, ordered by name.
    pub children: BTreeMap<String, SchemaNode>,
}

impl ObjectShape {
    /// Get-or-create the child for a field. A new child starts with no
    /// visits, so its count lags the parent's until it is merged into.
    pub fn child_mut(&mut self, name: &str) -> &mut SchemaNode {
        self.children.entry(name.to_string()).or_default()
    }
}

/// Homogenized array payload: every element of every instance folds into
/// one leaf, or into the alternate leaf when a split rule matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayShape {
    /// Elements seen across all instances.
    pub leaf_count: u64,

    pub leaf: Box<SchemaNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate: Option<Box<SchemaNode>>,
}

impl ArrayShape {
    pub(crate) fn alternate_mut(&mut self) -> &mut SchemaNode {
        self.alternate.get_or_insert_with(Box::default)
    }
}

/// Scalar payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarSummary {
    /// Distinct literals with their counts.
    Enumerated(ValueCounts),
    /// Integer bounds once too many distinct integers were seen.
    Range { min: i128, max: i128 },
    /// Characters of every string once too many distinct strings were seen.
    Charset(BTreeSet<char>),
}

impl Default for ScalarSummary {
    fn default() -> Self {
        ScalarSummary::Enumerated(ValueCounts::default())
    }
}

impl ScalarSummary {
    pub fn is_enumerated(&self) -> bool {
        matches!(self, ScalarSummary::Enumerated(_))
    }

    pub fn values(&self) -> Option<&ValueCounts> {
        match self {
            ScalarSummary::Enumerated(values) => Some(values),
            _ => None,
        }
    }

    /// Fold in a string. Demotes to a charset when a new distinct literal
    /// would take the enumeration past `threshold`.
    pub(crate) fn absorb_text(&mut self, text: &str, threshold: usize) {
        let demoted = match self {
            ScalarSummary::Charset(chars) => {
                chars.extend(text.chars());
                None
            }
            // Strings at an integer range only show up in the histogram.
            ScalarSummary::Range { .. } => None,
            ScalarSummary::Enumerated(values) => {
                let literal = Literal::Text(text.to_string());
                if values.would_exceed(&literal, threshold) {
                    let mut chars: BTreeSet<char> = values
                        .iter()
                        .filter_map(|vc| vc.value.as_text())
                        .flat_map(str::chars)
                        .collect();
                    chars.extend(text.chars());
                    Some(ScalarSummary::Charset(chars))
                } else {
                    values.bump(literal);
                    None
                }
            }
        };
        if let Some(next) = demoted {
            *self = next;
        }
    }

    /// Fold in an integer. Demotes to a range when a new distinct literal
    /// would take the enumeration past `threshold`.
    pub(crate) fn absorb_integer(&mut self, value: i128, threshold: usize) {
        let demoted = match self {
            ScalarSummary::Range { min, max } => {
                *min = (*min).min(value);
                *max = (*max).max(value);
                None
            }
            ScalarSummary::Charset(_) => None,
            ScalarSummary::Enumerated(values) => {
                let literal = Literal::Integer(value);
                if values.would_exceed(&literal, threshold) {
                    let (min, max) = values
                        .iter()
                        .filter_map(|vc| vc.value.as_integer())
                        .fold((value, value), |(lo, hi), i| {
                            (lo.min(i), hi.max(i))
                        });
                    Some(ScalarSummary::Range { min, max })
                } else {
                    values.bump(literal);
                    None
                }
            }
        };
        if let Some(next) = demoted {
            *self = next;
        }
    }

    /// Fold in a low-cardinality literal (boolean, null, real). These never
    /// trigger a demotion; a summarized node keeps them in its histogram
    /// only.
    pub(crate) fn absorb_literal(&mut self, literal: Literal) {
        if let ScalarSummary::Enumerated(values) = self {
            values.bump(literal);
        }
    }
}

/// Distinct literals in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueCounts(Vec<ValueCount>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: Literal,
    pub count: u64,
}

impl ValueCounts {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValueCount> {
        self.0.iter()
    }

    pub fn get(&self, value: &Literal) -> Option<u64> {
        self.0.iter().find(|vc| &vc.value == value).map(|vc| vc.count)
    }

    pub fn contains(&self, value: &Literal) -> bool {
        self.get(value).is_some()
    }

    /// Whether recording `value` would add a distinct literal beyond
    /// `threshold`.
    pub fn would_exceed(&self, value: &Literal, threshold: usize) -> bool {
        self.0.len() >= threshold && !self.contains(value)
    }

    pub(crate) fn bump(&mut self, value: Literal) {
        match self.0.iter_mut().find(|vc| vc.value == value) {
            Some(vc) => vc.count += 1,
            None => self.0.push(ValueCount { value, count: 1 }),
        }
    }
}

impl<'a> IntoIterator for &'a ValueCounts {
    type Item = &'a ValueCount;
    type IntoIter = std::slice::Iter<'a, ValueCount>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_mut_creates_lazily() {
        let mut obj = ObjectShape::default();
        assert!(obj.children.is_empty());

        obj.child_mut("a").count = 3;
        assert_eq!(obj.child_mut("a").count, 3);
        assert_eq!(obj.children.len(), 1);
    }

    #[test]
    fn test_shape_is_fixed_once_set() {
        let mut node = SchemaNode::new();
        assert!(node.object_mut().is_some());
        assert!(node.array_mut().is_none());
        assert!(node.as_object().is_some());
    }

    #[test]
    fn test_text_demotes_to_charset() {
        let mut s = ScalarSummary::default();
        for word in ["ab", "cd", "ef"] {
            s.absorb_text(word, 3);
        }
        assert!(s.is_enumerated());

        // repeat of a known literal never demotes
        s.absorb_text("ab", 3);
        assert_eq!(s.values().unwrap().get(&Literal::Text("ab".into())), Some(2));

        s.absorb_text("xy", 3);
        let expected: BTreeSet<char> = "abcdefxy".chars().collect();
        assert_eq!(s, ScalarSummary::Charset(expected));

        s.absorb_text("z", 3);
        match &s {
            ScalarSummary::Charset(chars) => assert!(chars.contains(&'z')),
            other => panic!("expected charset, got {other:?}"),
        }
    }

    #[test]
    fn test_integer_demotes_to_range() {
        let mut s = ScalarSummary::default();
        for i in [5, -2, 9] {
            s.absorb_integer(i, 3);
        }
        s.absorb_integer(7, 3);
        assert_eq!(s, ScalarSummary::Range { min: -2, max: 9 });

        s.absorb_integer(100, 3);
        s.absorb_integer(-50, 3);
        assert_eq!(s, ScalarSummary::Range { min: -50, max: 100 });
    }

    #[test]
    fn test_range_ignores_other_literals() {
        let mut s = ScalarSummary::Range { min: 0, max: 1 };
        s.absorb_text("x", 10);
        s.absorb_literal(Literal::Null);
        assert_eq!(s, ScalarSummary::Range { min: 0, max: 1 });
    }

    #[test]
    fn test_low_cardinality_kinds_never_demote() {
        let mut s = ScalarSummary::default();
        for i in 0..20 {
            s.absorb_literal(Literal::Real(i as f64 + 0.5));
        }
        assert!(s.is_enumerated());
        assert_eq!(s.values().unwrap().len(), 20);
    }

    #[test]
    fn test_mixed_enumeration_demotes_from_own_kind() {
        let mut s = ScalarSummary::default();
        s.absorb_literal(Literal::Null);
        s.absorb_text("q", 2);
        s.absorb_integer(4, 2);
        assert_eq!(s, ScalarSummary::Range { min: 4, max: 4 });
    }
}
