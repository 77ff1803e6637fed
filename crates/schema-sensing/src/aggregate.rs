//! Online merge of decoded values into a schema tree.

use serde_json::Value;
use tracing::{trace, warn};

use wirelog_config::{AlternateLeafRule, SensingConfig};

use crate::errors::{SensorError, SensorResult};
use crate::kind::{Literal, Observed, ValueKind};
use crate::node::SchemaNode;

/// Path segment used for array elements.
pub const ELEMENT_SEGMENT: &str = "[]";

/// Folds decoded JSON values into [`SchemaNode`] trees.
#[derive(Debug, Clone)]
pub struct Aggregator {
    threshold: usize,
    splits: Vec<LeafSplit>,
}

/// An alternate-leaf rule resolved to path segments.
#[derive(Debug, Clone)]
struct LeafSplit {
    path: Vec<String>,
    field: String,
    equals: Value,
}

impl LeafSplit {
    fn from_rule(rule: &AlternateLeafRule) -> Self {
        Self {
            path: rule.segments().map(str::to_string).collect(),
            field: rule.field.clone(),
            equals: rule.equals.clone(),
        }
    }

    fn applies_to(&self, path: &[String]) -> bool {
        self.path.as_slice() == path
    }

    fn matches(&self, element: &Value) -> bool {
        element
            .as_object()
            .and_then(|obj| obj.get(&self.field))
            .is_some_and(|v| v == &self.equals)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(&SensingConfig::default())
    }
}

impl Aggregator {
    pub fn new(config: &SensingConfig) -> Self {
        Self {
            threshold: config.cardinality_threshold,
            splits: config
                .alternate_leaves
                .iter()
                .map(LeafSplit::from_rule)
                .collect(),
        }
    }

    /// Aggregator with the given threshold and no alternate-leaf rules.
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            threshold,
            splits: Vec::new(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Merge one value into `node`, recursively.
    ///
    /// Fails only when a value falls outside the closed kind set; the
    /// tree may then hold a partial merge of that value.
    pub fn merge(&self, node: &mut SchemaNode, value: &Value) -> SensorResult<()> {
        let mut path = Vec::new();
        self.merge_at(node, value, &mut path)
    }

    fn merge_at(
        &self,
        node: &mut SchemaNode,
        value: &Value,
        path: &mut Vec<String>,
    ) -> SensorResult<()> {
        let observed =
            Observed::classify(value).ok_or_else(|| SensorError::UnknownKind {
                path: display_path(path),
                detail: value.to_string(),
            })?;
        let kind = observed.kind();
        if node.kind_count(kind) == 0 && mixes_scalar_and_container(node, kind) {
            warn!(path = %display_path(path), %kind, "scalar and container observed at one path");
        }
        node.record(kind);

        match observed {
            Observed::Object(map) => {
                let Some(obj) = node.object_mut() else {
                    warn!(path = %display_path(path), "object observed at array path");
                    return Ok(());
                };
                for (name, child) in map {
                    path.push(name.clone());
                    let res = self.merge_at(obj.child_mut(name), child, path);
                    path.pop();
                    res?;
                }
            }
            Observed::Array(items) => {
                let split = self.splits.iter().find(|s| s.applies_to(path));
                let Some(arr) = node.array_mut() else {
                    warn!(path = %display_path(path), "array observed at object path");
                    return Ok(());
                };
                path.push(ELEMENT_SEGMENT.to_string());
                for item in items {
                    arr.leaf_count += 1;
                    let target: &mut SchemaNode = match split {
                        Some(s) if s.matches(item) => {
                            trace!(path = %display_path(path), "element routed to alternate leaf");
                            arr.alternate_mut()
                        }
                        _ => &mut arr.leaf,
                    };
                    if let Err(e) = self.merge_at(target, item, path) {
                        path.pop();
                        return Err(e);
                    }
                }
                path.pop();
            }
            Observed::Text(s) => node.scalars_mut().absorb_text(s, self.threshold),
            Observed::Integer(i) => {
                node.scalars_mut().absorb_integer(i, self.threshold)
            }
            Observed::Real(r) => node.scalars_mut().absorb_literal(Literal::Real(r)),
            Observed::Boolean(b) => {
                node.scalars_mut().absorb_literal(Literal::Boolean(b))
            }
            Observed::Null => node.scalars_mut().absorb_literal(Literal::Null),
        }
        Ok(())
    }
}

fn mixes_scalar_and_container(node: &SchemaNode, kind: ValueKind) -> bool {
    let scalar = |k: &ValueKind| !k.is_container() && *k != ValueKind::Null;
    if kind.is_container() {
        node.types.keys().any(scalar)
    } else {
        scalar(&kind) && node.shape.is_some()
    }
}

/// Dotted rendering of a path for diagnostics; the root is `$`.
pub fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        format!("$.{}", path.join("."))
    }
}
