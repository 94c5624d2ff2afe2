//! Serde helpers for the hex encodings used in recorded traces and assembled output.

/// `Vec<u8>` as a `0x`-prefixed hex string. Deserialization accepts the prefix or not.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Writes `0x` followed by lowercase hex.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    /// Reads hex with or without the `0x` prefix.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let clean = raw.trim().trim_start_matches("0x");
        hex::decode(clean).map_err(serde::de::Error::custom)
    }
}

/// `Option<BigUint>` as a `0x`-prefixed hex quantity or `null`.
///
/// Deserialization also accepts decimal strings and plain JSON integers.
pub mod hex_quantity {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quantity {
        Number(u64),
        Text(String),
    }

    /// Writes `0x`-prefixed hex, or `null` when absent.
    pub fn serialize<S: Serializer>(
        value: &Option<BigUint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&format!("0x{v:x}")),
            None => serializer.serialize_none(),
        }
    }

    /// Reads `null`, a JSON integer, or a hex/decimal string.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BigUint>, D::Error> {
        match Option::<Quantity>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Quantity::Number(n)) => Ok(Some(BigUint::from(n))),
            Some(Quantity::Text(s)) => parse_quantity(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    /// Parses a `0x`-prefixed hex or plain decimal quantity.
    pub fn parse_quantity(s: &str) -> Result<BigUint, String> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x") {
            Some("") => Some(BigUint::default()),
            Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16),
            None => BigUint::parse_bytes(s.as_bytes(), 10),
        };
        parsed.ok_or_else(|| format!("invalid quantity '{s}'"))
    }
}
