/// Module for the `txlog` subcommand, which replays a scripted transaction into a [`TxLog`] and
/// stores the resulting document.
///
/// The script is a JSON object holding the transaction fields and an ordered list of steps:
///
/// ```json
/// {
///   "block": 7, "tx": "0x…", "from": "0x…", "to": "0x…", "gas_used": 21000,
///   "steps": [
///     {"kind": "call", "call_type": "CALL", "from": "0x…", "to": "0x…", "value": "0x1"},
///     {"kind": "enter", "call_num": 1},
///     {"kind": "log", "address": "0x…", "topics": ["0x…"], "data": "0x…"},
///     {"kind": "exit"}
///   ]
/// }
/// ```
use async_trait::async_trait;
use clap::Args;
use num_bigint::BigUint;
use scopetrace_core::codec::{hex_bytes, hex_quantity};
use scopetrace_core::config::StoreConfig;
use scopetrace_core::txlog::{CallRecord, JsonLinesStore, Topic, TxLog, TxMeta};
use scopetrace_core::Address;
use scopetrace_utils::errors::TraceInputError;
use serde::Deserialize;
use std::error::Error;
use std::path::PathBuf;

/// Arguments for the `txlog` subcommand.
#[derive(Args)]
pub struct TxlogArgs {
    /// Transaction script as inline JSON or a file path prefixed with @
    pub input: String,
    /// JSON-lines file the document is appended to
    #[arg(long)]
    out: Option<PathBuf>,
    /// Collection name stored on the document
    #[arg(long)]
    collection: Option<String>,
}

/// A scripted transaction.
#[derive(Debug, Deserialize)]
pub struct TxScript {
    /// Block number.
    #[serde(default)]
    pub block: u64,
    /// Transaction hash as 32 hex bytes; zero when absent.
    #[serde(default)]
    pub tx: Option<String>,
    /// Sender.
    #[serde(default)]
    pub from: Option<Address>,
    /// Recipient, absent for contract creation.
    #[serde(default)]
    pub to: Option<Address>,
    /// Transferred value.
    #[serde(default, with = "hex_quantity")]
    pub value: Option<BigUint>,
    /// Gas price.
    #[serde(default, with = "hex_quantity")]
    pub gas_price: Option<BigUint>,
    /// Gas used.
    #[serde(default)]
    pub gas_used: u64,
    /// Observations in execution order.
    #[serde(default)]
    pub steps: Vec<TxStep>,
}

/// One observation made while the transaction runs.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxStep {
    /// A nested scope opens.
    Enter {
        /// Identifier of the scope.
        call_num: u64,
    },
    /// The innermost scope closes.
    Exit,
    /// A call frame at the current depth.
    Call {
        /// CALL, DELEGATECALL, CREATE, ...
        call_type: String,
        /// Caller.
        from: Address,
        /// Callee.
        to: Address,
        /// Transferred value.
        #[serde(default, with = "hex_quantity")]
        value: Option<BigUint>,
        /// Gas provided.
        #[serde(default)]
        gas: u64,
        /// Call input.
        #[serde(default, with = "hex_bytes")]
        input: Vec<u8>,
        /// Call output.
        #[serde(default, with = "hex_bytes")]
        output: Vec<u8>,
    },
    /// An emitted event.
    Log {
        /// Emitting contract.
        address: Address,
        /// Topics as 32-byte hex strings.
        #[serde(default)]
        topics: Vec<String>,
        /// Event data.
        #[serde(default, with = "hex_bytes")]
        data: Vec<u8>,
    },
    /// A native value transfer.
    Transfer {
        /// Sender.
        from: Address,
        /// Recipient.
        to: Address,
        /// Amount, zero when absent.
        #[serde(default, with = "hex_quantity")]
        value: Option<BigUint>,
    },
}

fn parse_topic(raw: &str, field: &'static str) -> Result<Topic, TraceInputError> {
    let mut topic = [0u8; 32];
    hex::decode_to_slice(raw.trim_start_matches("0x"), &mut topic)
        .map_err(|source| TraceInputError::Hex { field, source })?;
    Ok(topic)
}

impl TxScript {
    /// Transaction-level fields of the script.
    pub fn meta(&self) -> Result<TxMeta, TraceInputError> {
        let tx = match &self.tx {
            Some(raw) => parse_topic(raw, "tx")?,
            None => [0u8; 32],
        };
        Ok(TxMeta {
            block: self.block,
            tx,
            from: self.from.unwrap_or_default(),
            to: self.to,
            value: self.value.clone().unwrap_or_default(),
            gas_price: self.gas_price.clone().unwrap_or_default(),
            gas_used: self.gas_used,
        })
    }

    /// Feeds every step into `log`, starting a fresh transaction.
    pub fn replay(&self, log: &mut TxLog) -> Result<(), TraceInputError> {
        log.begin_tx();
        for step in &self.steps {
            match step {
                TxStep::Enter { call_num } => log.enter_scope(*call_num),
                TxStep::Exit => log.exit_scope(),
                TxStep::Call {
                    call_type,
                    from,
                    to,
                    value,
                    gas,
                    input,
                    output,
                } => {
                    let mut call = CallRecord::new(call_type.as_str(), *from, *to);
                    call.depth = log.depth();
                    call.value = value.clone().unwrap_or_default();
                    call.gas = *gas;
                    call.input = input.clone();
                    call.output = output.clone();
                    log.add_call(&call);
                }
                TxStep::Log {
                    address,
                    topics,
                    data,
                } => {
                    let topics = topics
                        .iter()
                        .map(|t| parse_topic(t, "topics"))
                        .collect::<Result<Vec<_>, _>>()?;
                    let depth = log.depth();
                    if let Some(token) = log.record_log(*address, &topics, data, depth) {
                        tracing::debug!("{:?} {} event from {address}", token.standard, token.function);
                    }
                }
                TxStep::Transfer { from, to, value } => {
                    log.record_value_transfer(*from, *to, &value.clone().unwrap_or_default());
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl super::Command for TxlogArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let script: TxScript = serde_json::from_str(&super::read_input(&self.input)?)
            .map_err(TraceInputError::from)?;
        let meta = script.meta()?;

        let mut log = TxLog::new();
        script.replay(&mut log)?;

        let defaults = StoreConfig::default();
        let mut store = JsonLinesStore::new(
            self.out.unwrap_or(defaults.path),
            self.collection.unwrap_or(defaults.collection),
        );
        let doc = log.commit(&meta, &mut store);
        tracing::info!(
            "logged tx {} (max depth {}) to {}",
            doc.tx,
            log.max_depth(),
            store.path().display()
        );
        println!("{}", serde_json::to_string_pretty(&doc)?);
        Ok(())
    }
}
