use serde::{Deserialize, Serialize};

/// Which way a captured message travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Received from the gateway (stored as `dir = 0`).
    Inbound,
    /// Sent by the client.
    Outbound,
}

impl Direction {
    /// Decode the storage flag: `0` is inbound, anything else outbound.
    pub fn from_flag(flag: i64) -> Self {
        if flag == 0 {
            Direction::Inbound
        } else {
            Direction::Outbound
        }
    }
}

/// One captured message as handed over by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Storage identifier, only used when reporting errors.
    pub id: i64,
    pub direction: Direction,
    /// Raw payload bytes as stored; expected to be UTF-8 JSON text.
    pub raw: Vec<u8>,
}

impl RawRow {
    pub fn new(id: i64, direction: Direction, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            direction,
            raw: raw.into(),
        }
    }

    pub fn inbound(id: i64, raw: impl Into<Vec<u8>>) -> Self {
        Self::new(id, Direction::Inbound, raw)
    }
}
