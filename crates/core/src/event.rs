//! Raw execution events reported by the VM, one per executed instruction.

use crate::codec::{hex_bytes, hex_quantity};
use crate::Opcode;
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One instruction actually executed by the VM.
///
/// Events are immutable once recorded; their order in a trace is the execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// Program counter within the currently executing code.
    pub pc: u64,
    /// The executed opcode.
    pub op: Opcode,
    /// Gas remaining before the instruction.
    pub gas: u64,
    /// Gas cost of the instruction.
    pub cost: u64,
    /// Returned bytes, empty for instructions that return nothing.
    #[serde(default, with = "hex_bytes")]
    pub ret: Vec<u8>,
    /// Value transferred into the scope this instruction starts, if known.
    #[serde(default, with = "hex_quantity")]
    pub value: Option<BigUint>,
}

impl ExecutionEvent {
    /// Creates an event with no returned bytes and no transferred value.
    pub fn new(pc: u64, op: Opcode, gas: u64, cost: u64) -> Self {
        Self {
            pc,
            op,
            gas,
            cost,
            ret: Vec::new(),
            value: None,
        }
    }

    /// Attaches returned bytes.
    pub fn with_ret(mut self, ret: impl Into<Vec<u8>>) -> Self {
        self.ret = ret.into();
        self
    }

    /// Attaches a transferred value.
    pub fn with_value(mut self, value: impl Into<BigUint>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// A 20-byte account address.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Parses a `0x`-prefixed (or bare) 40 character hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut out = [0u8; 20];
        hex::decode_to_slice(s.trim().trim_start_matches("0x"), &mut out)?;
        Ok(Address(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_defaults() {
        let event: ExecutionEvent =
            serde_json::from_str(r#"{"pc": 3, "op": "PUSH1", "gas": 100, "cost": 3}"#).unwrap();
        assert_eq!(event, ExecutionEvent::new(3, Opcode::PUSH(1), 100, 3));
    }

    #[test]
    fn test_event_json_payloads() {
        let event: ExecutionEvent = serde_json::from_str(
            r#"{"pc": 0, "op": 96, "gas": 9, "cost": 1, "ret": "0xdead", "value": "1000"}"#,
        )
        .unwrap();
        assert_eq!(event.op, Opcode::PUSH(1));
        assert_eq!(event.ret, vec![0xde, 0xad]);
        assert_eq!(event.value, Some(BigUint::from(1000u32)));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["ret"], "0xdead");
        assert_eq!(json["value"], "0x3e8");
    }

    #[test]
    fn test_address_hex() {
        assert_eq!(
            Address::ZERO.to_string(),
            "0x0000000000000000000000000000000000000000"
        );
        let addr = Address::from_hex("0x00000000000000000000000000000000000000ff").unwrap();
        assert_eq!(addr.0[19], 0xff);
        assert!(Address::from_hex("0x1234").is_err());
    }
}
