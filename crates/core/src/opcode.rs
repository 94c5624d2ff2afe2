/// Module defining the EVM opcode enumeration and related functionality.
///
/// This module provides the `Opcode` enum, which represents every instruction the traced VM can
/// report in a step notification. It supports parsing opcodes from bytes and mnemonics,
/// converting them back to their byte representation, and (de)serializing them as mnemonics so
/// that recorded traces stay human-readable.
use scopetrace_utils::errors::OpcodeParseError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Declares the fixed-byte opcodes together with their byte values.
///
/// Variable-length families (`PUSH(n)`, `DUP(n)`, `SWAP(n)`, `LOG(n)`) and the `UNKNOWN`
/// catch-all are added by hand below.
macro_rules! fixed_opcodes {
    ($($name:ident = $byte:literal,)*) => {
        /// Enumeration of EVM opcodes.
        ///
        /// Single-byte opcodes are plain variants; `PUSH(n)` (1 to 32 immediate bytes), `DUP(n)`,
        /// `SWAP(n)` and `LOG(n)` carry their family index, and `UNKNOWN(u8)` holds any byte that
        /// is not assigned an instruction.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($name,)*
            /// 0x60–0x7f (PUSH1 to PUSH32)
            PUSH(u8),
            /// 0x80–0x8f (DUP1 to DUP16)
            DUP(u8),
            /// 0x90–0x9f (SWAP1 to SWAP16)
            SWAP(u8),
            /// 0xa0–0xa4 (LOG0 to LOG4)
            LOG(u8),
            /// Catch-all for unassigned bytes
            UNKNOWN(u8),
        }

        impl Opcode {
            fn from_fixed_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(Opcode::$name),)*
                    _ => None,
                }
            }

            fn fixed_byte(&self) -> Option<u8> {
                match self {
                    $(Opcode::$name => Some($byte),)*
                    _ => None,
                }
            }

            fn fixed_name(&self) -> Option<&'static str> {
                match self {
                    $(Opcode::$name => Some(stringify!($name)),)*
                    _ => None,
                }
            }

            fn from_fixed_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($name) => Some(Opcode::$name),)*
                    _ => None,
                }
            }
        }
    };
}

fixed_opcodes! {
    // 0x range - stop & arithmetic
    STOP = 0x00,
    ADD = 0x01,
    MUL = 0x02,
    SUB = 0x03,
    DIV = 0x04,
    SDIV = 0x05,
    MOD = 0x06,
    SMOD = 0x07,
    ADDMOD = 0x08,
    MULMOD = 0x09,
    EXP = 0x0a,
    SIGNEXTEND = 0x0b,
    // 10x range - comparison & bitwise logic
    LT = 0x10,
    GT = 0x11,
    SLT = 0x12,
    SGT = 0x13,
    EQ = 0x14,
    ISZERO = 0x15,
    AND = 0x16,
    OR = 0x17,
    XOR = 0x18,
    NOT = 0x19,
    BYTE = 0x1a,
    SHL = 0x1b,
    SHR = 0x1c,
    SAR = 0x1d,
    // 20x range - hashing
    KECCAK256 = 0x20,
    // 30x range - environment
    ADDRESS = 0x30,
    BALANCE = 0x31,
    ORIGIN = 0x32,
    CALLER = 0x33,
    CALLVALUE = 0x34,
    CALLDATALOAD = 0x35,
    CALLDATASIZE = 0x36,
    CALLDATACOPY = 0x37,
    CODESIZE = 0x38,
    CODECOPY = 0x39,
    GASPRICE = 0x3a,
    EXTCODESIZE = 0x3b,
    EXTCODECOPY = 0x3c,
    RETURNDATASIZE = 0x3d,
    RETURNDATACOPY = 0x3e,
    EXTCODEHASH = 0x3f,
    // 40x range - block information
    BLOCKHASH = 0x40,
    COINBASE = 0x41,
    TIMESTAMP = 0x42,
    NUMBER = 0x43,
    DIFFICULTY = 0x44,
    GASLIMIT = 0x45,
    CHAINID = 0x46,
    SELFBALANCE = 0x47,
    BASEFEE = 0x48,
    BLOBHASH = 0x49,
    BLOBBASEFEE = 0x4a,
    // 50x range - stack, memory, storage & flow
    POP = 0x50,
    MLOAD = 0x51,
    MSTORE = 0x52,
    MSTORE8 = 0x53,
    SLOAD = 0x54,
    SSTORE = 0x55,
    JUMP = 0x56,
    JUMPI = 0x57,
    PC = 0x58,
    MSIZE = 0x59,
    GAS = 0x5a,
    JUMPDEST = 0x5b,
    TLOAD = 0x5c,
    TSTORE = 0x5d,
    MCOPY = 0x5e,
    PUSH0 = 0x5f,
    // f0x range - system
    CREATE = 0xf0,
    CALL = 0xf1,
    CALLCODE = 0xf2,
    RETURN = 0xf3,
    DELEGATECALL = 0xf4,
    CREATE2 = 0xf5,
    STATICCALL = 0xfa,
    REVERT = 0xfd,
    INVALID = 0xfe,
    SELFDESTRUCT = 0xff,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::PUSH(n) => write!(f, "PUSH{n}"),
            Opcode::DUP(n) => write!(f, "DUP{n}"),
            Opcode::SWAP(n) => write!(f, "SWAP{n}"),
            Opcode::LOG(n) => write!(f, "LOG{n}"),
            Opcode::UNKNOWN(byte) => write!(f, "UNKNOWN{byte:02x}"),
            fixed => f.write_str(fixed.fixed_name().unwrap_or("UNKNOWN")),
        }
    }
}

impl Opcode {
    /// Parses a raw byte into an `Opcode` and its immediate data size.
    ///
    /// # Arguments
    /// * `byte` - The raw byte representing the opcode.
    ///
    /// # Returns
    /// A tuple containing the `Opcode` variant and the number of immediate bytes to follow
    /// (e.g., 1 for `PUSH1`, 32 for `PUSH32`, 0 for others).
    ///
    /// # Examples
    /// ```
    /// use scopetrace_core::Opcode;
    ///
    /// let (opcode, imm_size) = Opcode::parse(0x60);
    /// assert_eq!(opcode, Opcode::PUSH(1));
    /// assert_eq!(imm_size, 1);
    /// ```
    pub fn parse(byte: u8) -> (Self, usize) {
        match byte {
            0x60..=0x7f => {
                let n = byte - 0x5f;
                (Opcode::PUSH(n), n as usize)
            }
            0x80..=0x8f => (Opcode::DUP(byte - 0x7f), 0),
            0x90..=0x9f => (Opcode::SWAP(byte - 0x8f), 0),
            0xa0..=0xa4 => (Opcode::LOG(byte - 0xa0), 0),
            other => (
                Self::from_fixed_byte(other).unwrap_or(Opcode::UNKNOWN(other)),
                0,
            ),
        }
    }

    /// Converts the opcode to its byte representation.
    ///
    /// # Returns
    /// The byte value of the opcode (e.g., 0x60 for `PUSH1`, 0x00 for `STOP`).
    pub fn to_byte(&self) -> u8 {
        match self {
            Opcode::PUSH(n) => 0x5f + n,
            Opcode::DUP(n) => 0x7f + n,
            Opcode::SWAP(n) => 0x8f + n,
            Opcode::LOG(n) => 0xa0 + n,
            Opcode::UNKNOWN(byte) => *byte,
            fixed => fixed.fixed_byte().unwrap_or(0xfe),
        }
    }

    /// Returns `true` for `PUSH1`..`PUSH32`. `PUSH0` carries no immediate and is not included.
    pub fn is_push(&self) -> bool {
        matches!(self, Opcode::PUSH(_))
    }

    /// Number of immediate bytes that follow the opcode in bytecode.
    pub fn immediate_len(&self) -> usize {
        match self {
            Opcode::PUSH(n) => *n as usize,
            _ => 0,
        }
    }
}

fn family(name: &str, prefix: &str, range: std::ops::RangeInclusive<u8>) -> Option<u8> {
    let n = name.strip_prefix(prefix)?.parse::<u8>().ok()?;
    range.contains(&n).then_some(n)
}

impl FromStr for Opcode {
    type Err = OpcodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();

        match name.as_str() {
            "SHA3" => return Ok(Opcode::KECCAK256),
            "PREVRANDAO" => return Ok(Opcode::DIFFICULTY),
            "SUICIDE" => return Ok(Opcode::SELFDESTRUCT),
            _ => {}
        }

        if let Some(op) = Self::from_fixed_name(&name) {
            return Ok(op);
        }
        if let Some(n) = family(&name, "PUSH", 1..=32) {
            return Ok(Opcode::PUSH(n));
        }
        if let Some(n) = family(&name, "DUP", 1..=16) {
            return Ok(Opcode::DUP(n));
        }
        if let Some(n) = family(&name, "SWAP", 1..=16) {
            return Ok(Opcode::SWAP(n));
        }
        if let Some(n) = family(&name, "LOG", 0..=4) {
            return Ok(Opcode::LOG(n));
        }
        if let Some(hex_byte) = name.strip_prefix("UNKNOWN") {
            if let Ok(byte) = u8::from_str_radix(hex_byte, 16) {
                if let (op @ Opcode::UNKNOWN(_), _) = Self::parse(byte) {
                    return Ok(op);
                }
            }
        }

        Err(OpcodeParseError(s.to_string()))
    }
}

impl Serialize for Opcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct OpcodeVisitor;

impl Visitor<'_> for OpcodeVisitor {
    type Value = Opcode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an opcode mnemonic or an opcode byte")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        let byte = u8::try_from(v).map_err(|_| E::custom(format!("opcode byte {v} out of range")))?;
        Ok(Opcode::parse(byte).0)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        let v = u64::try_from(v).map_err(|_| E::custom(format!("negative opcode byte {v}")))?;
        self.visit_u64(v)
    }
}

impl<'de> Deserialize<'de> for Opcode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OpcodeVisitor)
    }
}
