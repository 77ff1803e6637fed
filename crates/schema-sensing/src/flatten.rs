//! Depth-first flattening of a schema tree into display lines.
//!
//! The output is a pure function of the tree: the same node always
//! yields the same lines, children in field-name order.

use std::collections::BTreeMap;

use crate::aggregate::{ELEMENT_SEGMENT, display_path};
use crate::errors::{SensorError, SensorResult};
use crate::kind::{Literal, ValueKind};
use crate::node::{ScalarSummary, SchemaNode, Shape, ValueCount};

/// Where a node sits relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot<'a> {
    /// Partition root.
    Root,
    /// Value of a named object field.
    Field(&'a str),
    /// Element of an array.
    Element,
}

impl<'a> Slot<'a> {
    fn field(&self) -> Option<&'a str> {
        match self {
            Slot::Field(name) => Some(name),
            _ => None,
        }
    }
}

/// One display line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub depth: usize,
    pub field: Option<String>,
    /// Visits to the node this line describes.
    pub count: u64,
    /// Visits to its structural parent, the presence denominator.
    pub parent_count: u64,
    pub types: BTreeMap<ValueKind, u64>,
    pub kind: LineKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    ObjectOpen,
    ObjectClose,
    ArrayOpen { leaf_count: u64 },
    ArrayClose,
    /// Separates the alternate element shape from the primary one.
    Or,
    Scalar(ScalarLine),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarLine {
    pub display: ScalarDisplay,
    pub detail: ScalarDetail,
}

/// Headline of a scalar line.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarDisplay {
    /// The only literal ever observed.
    Literal(Literal),
    /// Disjunction of observed kinds; empty for a never-visited leaf.
    Kinds(Vec<ValueKind>),
}

/// Statistics behind a scalar line.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarDetail {
    Values(Vec<ValueCount>),
    Range { min: i128, max: i128 },
    Charset(String),
    /// Nothing beyond the kind histogram.
    Histogram,
}

/// Presence of a line's node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Always,
    Optional,
    /// More visits than the parent; the aggregate broke an invariant.
    CountError,
}

impl Line {
    pub fn presence(&self) -> Presence {
        use std::cmp::Ordering;
        match self.count.cmp(&self.parent_count) {
            Ordering::Equal => Presence::Always,
            Ordering::Less => Presence::Optional,
            Ordering::Greater => Presence::CountError,
        }
    }

    /// Bracket and separator lines carry no statistics of their own.
    pub fn is_delimiter(&self) -> bool {
        match self.kind {
            LineKind::ObjectClose | LineKind::ArrayClose | LineKind::Or => true,
            LineKind::ObjectOpen => self.depth == 0,
            LineKind::ArrayOpen { .. } | LineKind::Scalar(_) => false,
        }
    }
}

/// Flatten `node` into display lines.
///
/// Fails on a node that saw both objects and arrays, and on an array at
/// a partition root.
pub fn flatten(node: &SchemaNode, parent_count: u64, slot: Slot<'_>) -> SensorResult<Vec<Line>> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    flatten_into(node, parent_count, slot, 0, &mut path, &mut out)?;
    Ok(out)
}

/// Flatten a partition root against its own sample count.
pub fn flatten_root(root: &SchemaNode) -> SensorResult<Vec<Line>> {
    flatten(root, root.count, Slot::Root)
}

fn flatten_into(
    node: &SchemaNode,
    parent_count: u64,
    slot: Slot<'_>,
    depth: usize,
    path: &mut Vec<String>,
    out: &mut Vec<Line>,
) -> SensorResult<()> {
    if node.is_contradictory() {
        return Err(SensorError::StructuralContradiction {
            path: display_path(path),
        });
    }

    let line = |kind: LineKind| Line {
        depth,
        field: slot.field().map(str::to_string),
        count: node.count,
        parent_count,
        types: node.types.clone(),
        kind,
    };

    match &node.shape {
        Some(Shape::Object(obj)) => {
            out.push(line(LineKind::ObjectOpen));
            for (name, child) in &obj.children {
                path.push(name.clone());
                let res = flatten_into(
                    child,
                    node.count,
                    Slot::Field(name),
                    depth + 1,
                    path,
                    out,
                );
                path.pop();
                res?;
            }
            out.push(line(LineKind::ObjectClose));
        }
        Some(Shape::Array(arr)) => {
            if slot == Slot::Root {
                return Err(SensorError::BareArray {
                    path: display_path(path),
                });
            }
            out.push(line(LineKind::ArrayOpen {
                leaf_count: arr.leaf_count,
            }));
            path.push(ELEMENT_SEGMENT.to_string());
            let res = flatten_elements(arr, depth + 1, path, out);
            path.pop();
            res?;
            out.push(line(LineKind::ArrayClose));
        }
        None => out.push(line(LineKind::Scalar(scalar_line(node)))),
    }
    Ok(())
}

fn flatten_elements(
    arr: &crate::node::ArrayShape,
    depth: usize,
    path: &mut Vec<String>,
    out: &mut Vec<Line>,
) -> SensorResult<()> {
    if let Some(alt) = &arr.alternate {
        flatten_into(alt, arr.leaf_count, Slot::Element, depth, path, out)?;
        out.push(Line {
            depth,
            field: None,
            count: arr.leaf_count,
            parent_count: arr.leaf_count,
            types: BTreeMap::new(),
            kind: LineKind::Or,
        });
    }
    flatten_into(&arr.leaf, arr.leaf_count, Slot::Element, depth, path, out)
}

fn scalar_line(node: &SchemaNode) -> ScalarLine {
    let kinds = || node.types.keys().copied().collect::<Vec<_>>();
    match &node.scalars {
        Some(ScalarSummary::Enumerated(values)) => {
            let display = match values.iter().next() {
                Some(only) if values.len() == 1 => ScalarDisplay::Literal(only.value.clone()),
                _ => ScalarDisplay::Kinds(kinds()),
            };
            ScalarLine {
                display,
                detail: ScalarDetail::Values(values.iter().cloned().collect()),
            }
        }
        Some(ScalarSummary::Range { min, max }) => ScalarLine {
            display: ScalarDisplay::Kinds(kinds()),
            detail: ScalarDetail::Range {
                min: *min,
                max: *max,
            },
        },
        Some(ScalarSummary::Charset(chars)) => ScalarLine {
            display: ScalarDisplay::Kinds(kinds()),
            detail: ScalarDetail::Charset(chars.iter().collect()),
        },
        None => ScalarLine {
            display: ScalarDisplay::Kinds(kinds()),
            detail: ScalarDetail::Histogram,
        },
    }
}
