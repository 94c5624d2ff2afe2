//! Tracing and transaction-log configuration

use scopetrace_utils::errors::TraceInputError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Controls how a single transaction is recorded before segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Initial capacity of the event buffer
    pub capacity_hint: usize,

    /// Whether returned bytes are kept on recorded events
    pub capture_return_data: bool,

    /// Cancel recording once this many steps were seen (`None` = unlimited)
    pub max_steps: Option<usize>,

    /// Cancel recording once the execution runs longer than this (`None` = unlimited)
    #[serde(with = "duration_ms")]
    pub timeout: Option<Duration>,

    /// Transaction log settings
    pub store: StoreConfig,
}

/// Where the transaction log writes its per-transaction documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON-lines document file
    pub path: PathBuf,
    /// Logical collection name stored on every document
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("txlog.jsonl"),
            collection: "fantom".to_string(),
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl TraceConfig {
    /// Unbounded recording, suitable for replaying small fixtures
    pub fn development() -> Self {
        Self {
            capacity_hint: 1024,
            capture_return_data: true,
            max_steps: None,
            timeout: None,
            store: StoreConfig::default(),
        }
    }

    /// Recording with the limits used when tracing live transactions
    pub fn standard() -> Self {
        Self {
            capacity_hint: 16 * 1024,
            capture_return_data: true,
            max_steps: Some(10_000_000),
            timeout: Some(Duration::from_secs(5)),
            store: StoreConfig::default(),
        }
    }

    /// Loads a configuration from a JSON file; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceInputError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TraceInputError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_u64(d.as_millis() as u64),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
