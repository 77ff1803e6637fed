//! Bucketing of gateway records.
//!
//! Only inbound records are partitioned. Dispatch events go to a bucket
//! named after their event tag (`t`), refined for tag families whose
//! payload shape hinges on a nested field; everything else goes to a
//! bucket named after its opcode.

use serde_json::Value;

use wirelog_config::{PartitionConfig, Refinement};

use crate::row::Direction;

/// Gateway opcode names, indexed by opcode.
const OPCODE_NAMES: [&str; 12] = [
    "DISPATCH",
    "HEARTBEAT",
    "IDENTIFY",
    "STATUS_UPDATE",
    "VOICE_STATE_UPDATE",
    "VOICE_SERVER_PING",
    "RESUME",
    "RECONNECT",
    "REQUEST_GUILD_MEMBERS",
    "INVALID_SESSION",
    "HELLO",
    "HEARTBEAT_ACK",
];

/// Bucket label for an opcode.
pub fn opcode_label(op: i64) -> String {
    match usize::try_from(op).ok().and_then(|i| OPCODE_NAMES.get(i)) {
        Some(name) => format!("op {op} ({name})"),
        None => format!("op {op}"),
    }
}

#[derive(Debug, Clone)]
pub struct Partitioner {
    refinements: Vec<Refinement>,
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::new(&PartitionConfig::default())
    }
}

impl Partitioner {
    pub fn new(config: &PartitionConfig) -> Self {
        Self {
            refinements: config.refinements.clone(),
        }
    }

    /// Bucket name for a decoded record, or `None` if it is dropped.
    pub fn partition(&self, direction: Direction, record: &Value) -> Option<String> {
        if direction != Direction::Inbound {
            return None;
        }

        match record.get("t").and_then(Value::as_str) {
            Some(tag) => Some(self.refine(tag, record.get("d"))),
            None => record.get("op").and_then(Value::as_i64).map(opcode_label),
        }
    }

    fn refine(&self, tag: &str, payload: Option<&Value>) -> String {
        self.refinements
            .iter()
            .find(|r| tag.starts_with(r.tag_prefix()) && refinement_applies(r, payload))
            .map(|r| format!("{tag} ({})", r.suffix()))
            .unwrap_or_else(|| tag.to_string())
    }
}

fn refinement_applies(rule: &Refinement, payload: Option<&Value>) -> bool {
    let Some(obj) = payload.and_then(Value::as_object) else {
        return false;
    };
    match rule {
        Refinement::FlagSet { field, .. } => obj.get(field) == Some(&Value::Bool(true)),
        Refinement::FieldMissing { field, .. } => !obj.contains_key(field),
    }
}
