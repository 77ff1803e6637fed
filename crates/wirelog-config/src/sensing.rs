//! Schema sensing configuration.
//!
//! Controls how captured gateway records are bucketed and how the
//! aggregator summarizes the values it observes.

use serde::{Deserialize, Serialize};

/// Distinct literals a scalar field keeps before it is summarized.
pub const DEFAULT_CARDINALITY_THRESHOLD: usize = 10;

/// Schema sensing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensingConfig {
    /// Distinct literals kept per scalar field before demoting to a
    /// range (integers) or charset (strings).
    #[serde(default = "default_cardinality_threshold")]
    pub cardinality_threshold: usize,

    /// Bucket refinement rules.
    #[serde(default)]
    pub partition: PartitionConfig,

    /// Arrays whose elements are split into two parallel shapes.
    #[serde(default = "default_alternate_leaves")]
    pub alternate_leaves: Vec<AlternateLeafRule>,
}

impl Default for SensingConfig {
    fn default() -> Self {
        Self {
            cardinality_threshold: default_cardinality_threshold(),
            partition: PartitionConfig::default(),
            alternate_leaves: default_alternate_leaves(),
        }
    }
}

/// How event tags are refined into sub-buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Evaluated in order; the first matching rule wins.
    #[serde(default = "default_refinements")]
    pub refinements: Vec<Refinement>,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            refinements: default_refinements(),
        }
    }
}

/// A sub-bucket rule for a tag family whose payload shape depends on a
/// nested field.
///
/// The refined bucket is named `"<TAG> (<suffix>)"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum Refinement {
    /// `d.<field>` is literally `true`.
    FlagSet {
        tag_prefix: String,
        field: String,
        suffix: String,
    },
    /// `d` is an object without `<field>`.
    FieldMissing {
        tag_prefix: String,
        field: String,
        suffix: String,
    },
}

impl Refinement {
    pub fn tag_prefix(&self) -> &str {
        match self {
            Refinement::FlagSet { tag_prefix, .. }
            | Refinement::FieldMissing { tag_prefix, .. } => tag_prefix,
        }
    }

    pub fn suffix(&self) -> &str {
        match self {
            Refinement::FlagSet { suffix, .. }
            | Refinement::FieldMissing { suffix, .. } => suffix,
        }
    }
}

/// Splits the elements of one array into a primary and an alternate shape.
///
/// `path` is the dotted field path of the array from the record root,
/// e.g. `d.guilds`. Elements that are objects whose `field` equals
/// `equals` fold into the alternate leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternateLeafRule {
    pub path: String,
    pub field: String,
    #[serde(default = "default_equals")]
    pub equals: serde_json::Value,
}

impl AlternateLeafRule {
    /// Path segments of the array field.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.').filter(|s| !s.is_empty())
    }
}

fn default_cardinality_threshold() -> usize {
    DEFAULT_CARDINALITY_THRESHOLD
}

fn default_equals() -> serde_json::Value {
    serde_json::Value::Bool(true)
}

fn default_refinements() -> Vec<Refinement> {
    vec![
        Refinement::FlagSet {
            tag_prefix: "CHANNEL_".into(),
            field: "is_private".into(),
            suffix: "private".into(),
        },
        Refinement::FlagSet {
            tag_prefix: "GUILD_DELETE".into(),
            field: "unavailable".into(),
            suffix: "unavailable".into(),
        },
        Refinement::FieldMissing {
            tag_prefix: "MESSAGE_UPDATE".into(),
            field: "author".into(),
            suffix: "partial".into(),
        },
    ]
}

fn default_alternate_leaves() -> Vec<AlternateLeafRule> {
    vec![AlternateLeafRule {
        path: "d.guilds".into(),
        field: "unavailable".into(),
        equals: default_equals(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SensingConfig::default();
        assert_eq!(cfg.cardinality_threshold, 10);
        assert_eq!(cfg.partition.refinements.len(), 3);
        assert_eq!(cfg.alternate_leaves.len(), 1);
        assert_eq!(cfg.partition.refinements[0].suffix(), "private");
    }

    #[test]
    fn test_rule_segments() {
        let rule = AlternateLeafRule {
            path: "d..guilds.".into(),
            field: "unavailable".into(),
            equals: serde_json::Value::Bool(true),
        };
        let segs: Vec<_> = rule.segments().collect();
        assert_eq!(segs, vec!["d", "guilds"]);
    }
}
