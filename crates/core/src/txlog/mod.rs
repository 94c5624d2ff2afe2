/// Module accumulating per-transaction call, event and transfer traces as CSV text.
///
/// A [`TxLog`] is reset at the start of every transaction with [`TxLog::begin_tx`], fed calls,
/// emitted events and value transfers while the transaction runs, and finally turned into one
/// aggregate [`TxDocument`] that is handed to a [`DocumentStore`]. Token activity is recognised
/// heuristically: an event whose first topic is the keccak256 of a known ERC20/ERC721 signature
/// and whose topic count matches the standard is labelled accordingly, and token transfers are
/// mirrored into the transfer trace.
///
/// # Usage
/// ```
/// use scopetrace_core::event::Address;
/// use scopetrace_core::txlog::{CallRecord, MemoryStore, TxLog, TxMeta};
///
/// let mut log = TxLog::new();
/// log.begin_tx();
/// log.add_call(&CallRecord::new("CALL", Address::ZERO, Address::ZERO));
/// let mut store = MemoryStore::default();
/// let doc = log.commit(&TxMeta::default(), &mut store);
/// assert!(doc.functrace.ends_with("0x,0x,[],[]"));
/// assert_eq!(store.documents().len(), 1);
/// ```
mod store;

pub use store::{DocumentStore, JsonLinesStore, MemoryStore};

use crate::event::Address;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tiny_keccak::{Hasher, Keccak};

/// A 32-byte log topic or hash.
pub type Topic = [u8; 32];

/// Header line of the call trace.
pub const CALL_HEADER: &str =
    "index,calltype,depth,from,to,val,gas,input,output,callstack,traceaddr";
/// Header line of the event trace.
pub const EVENT_HEADER: &str = "address,topics,data,standard,function";
/// Header line of the transfer trace.
pub const TRANSFER_HEADER: &str = "from,to,tokenAddr,value,calldepth,callnum,traceindex";

/// Token standard recognised from an event's topic layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStandard {
    /// Three topics: signature, two indexed addresses.
    Erc20,
    /// Four topics: signature, two indexed addresses, indexed token id.
    Erc721,
}

impl TokenStandard {
    fn label(self) -> &'static str {
        match self {
            TokenStandard::Erc20 => "ERC20",
            TokenStandard::Erc721 => "ERC721",
        }
    }
}

/// A recognised token event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEvent {
    /// Which standard matched.
    pub standard: TokenStandard,
    /// Event name, e.g. `Transfer`.
    pub function: &'static str,
}

struct Signatures {
    transfer: Topic,
    approval: Topic,
    approval_for_all: Topic,
}

fn signatures() -> &'static Signatures {
    static SIGNATURES: OnceLock<Signatures> = OnceLock::new();
    SIGNATURES.get_or_init(|| Signatures {
        transfer: event_signature("Transfer(address,address,uint256)"),
        approval: event_signature("Approval(address,address,uint256)"),
        approval_for_all: event_signature("ApprovalForAll(address,address,bool)"),
    })
}

/// keccak256 of an event signature, i.e. its topic0.
pub fn event_signature(signature: &str) -> Topic {
    let mut keccak = Keccak::v256();
    keccak.update(signature.as_bytes());
    let mut hash = [0u8; 32];
    keccak.finalize(&mut hash);
    hash
}

/// Classifies an event by topic count and signature.
pub fn classify_event(topics: &[Topic]) -> Option<TokenEvent> {
    let sigs = signatures();
    let first = topics.first()?;
    let (standard, function) = match topics.len() {
        3 if *first == sigs.transfer => (TokenStandard::Erc20, "Transfer"),
        3 if *first == sigs.approval => (TokenStandard::Erc20, "Approval"),
        4 if *first == sigs.transfer => (TokenStandard::Erc721, "Transfer"),
        4 if *first == sigs.approval => (TokenStandard::Erc721, "Approval"),
        4 if *first == sigs.approval_for_all => (TokenStandard::Erc721, "ApprovalForAll"),
        _ => return None,
    };
    Some(TokenEvent { standard, function })
}

/// One call frame as written to the call trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// CALL, DELEGATECALL, CREATE, ...
    pub call_type: String,
    /// Call depth, 0 for the transaction itself.
    pub depth: usize,
    /// Caller.
    pub from: Address,
    /// Callee.
    pub to: Address,
    /// Transferred value.
    pub value: BigUint,
    /// Gas provided.
    pub gas: u64,
    /// Call input.
    pub input: Vec<u8>,
    /// Call output.
    pub output: Vec<u8>,
}

impl CallRecord {
    /// A depth-0 call with no value, gas, input or output.
    pub fn new(call_type: impl Into<String>, from: Address, to: Address) -> Self {
        Self {
            call_type: call_type.into(),
            depth: 0,
            from,
            to,
            value: BigUint::default(),
            gas: 0,
            input: Vec::new(),
            output: Vec::new(),
        }
    }
}

/// Transaction-level fields stored next to the traces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxMeta {
    /// Block number.
    pub block: u64,
    /// Transaction hash.
    pub tx: Topic,
    /// Sender.
    pub from: Address,
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Transferred value.
    pub value: BigUint,
    /// Gas price.
    pub gas_price: BigUint,
    /// Gas used.
    pub gas_used: u64,
}

/// The aggregate document persisted for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct TxDocument {
    /// Block number, decimal.
    pub block: String,
    /// Transaction hash, `0x`-prefixed.
    pub tx: String,
    /// Sender address.
    pub from: String,
    /// Recipient address, empty for contract creation.
    pub to: String,
    /// Transferred value, decimal.
    pub value: String,
    /// Gas price, decimal.
    pub gasprice: String,
    /// Gas used, decimal.
    pub gasused: String,
    /// Call trace CSV.
    pub functrace: String,
    /// Event trace CSV.
    pub eventtrace: String,
    /// Transfer trace CSV.
    pub transferlogs: String,
}

/// Per-transaction trace buffers.
#[derive(Debug)]
pub struct TxLog {
    functrace: String,
    eventtrace: String,
    transfertrace: String,
    /// Call number of each open scope, outermost first.
    call_stack: Vec<u64>,
    /// Position of each open scope among its siblings, outermost first.
    trace_address: Vec<u64>,
    /// Children opened so far at each level; one more entry than `trace_address`.
    children: Vec<u64>,
    trace_index: usize,
    calls: usize,
    max_depth: usize,
}

impl Default for TxLog {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_topic(topic: &Topic) -> String {
    format!("0x{}", hex::encode(topic))
}

/// Renders a stack as `[a b c]`.
fn fmt_stack(stack: &[u64]) -> String {
    let items: Vec<String> = stack.iter().map(u64::to_string).collect();
    format!("[{}]", items.join(" "))
}

impl TxLog {
    /// Creates empty buffers, each holding only its header.
    pub fn new() -> Self {
        let mut log = Self {
            functrace: String::new(),
            eventtrace: String::new(),
            transfertrace: String::new(),
            call_stack: Vec::new(),
            trace_address: Vec::new(),
            children: vec![0],
            trace_index: 0,
            calls: 0,
            max_depth: 0,
        };
        log.begin_tx();
        log
    }

    /// Resets every buffer and stack for a new transaction.
    pub fn begin_tx(&mut self) {
        for (buf, header) in [
            (&mut self.functrace, CALL_HEADER),
            (&mut self.eventtrace, EVENT_HEADER),
            (&mut self.transfertrace, TRANSFER_HEADER),
        ] {
            buf.clear();
            buf.push_str(header);
            buf.push('\n');
        }
        self.call_stack.clear();
        self.trace_address.clear();
        self.children.clear();
        self.children.push(0);
        self.trace_index = 0;
        self.calls = 0;
        self.max_depth = 0;
    }

    /// Current scope depth.
    pub fn depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Deepest scope seen in this transaction.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Call numbers of the open scopes, outermost first.
    pub fn call_stack(&self) -> &[u64] {
        &self.call_stack
    }

    /// Sibling positions of the open scopes, outermost first.
    pub fn trace_address(&self) -> &[u64] {
        &self.trace_address
    }

    /// Opens a nested scope identified by `call_num`.
    pub fn enter_scope(&mut self, call_num: u64) {
        let level = self.call_stack.len();
        let position = self.children[level];
        self.children[level] += 1;
        self.call_stack.push(call_num);
        self.trace_address.push(position);
        self.children.push(0);
        self.trace_index += 1;
        self.max_depth = self.max_depth.max(self.call_stack.len());
    }

    /// Closes the innermost scope. Does nothing at depth 0.
    pub fn exit_scope(&mut self) {
        if self.call_stack.pop().is_some() {
            self.trace_address.pop();
            self.children.pop();
        } else {
            tracing::warn!("exit_scope called at depth 0");
        }
    }

    fn stack_prefix(stack: &[u64], depth: usize) -> &[u64] {
        &stack[..depth.min(stack.len())]
    }

    /// Appends one call line.
    pub fn add_call(&mut self, call: &CallRecord) {
        let index = self.calls;
        self.calls += 1;
        let (stack, addr) = if call.depth == 0 {
            ("[]".to_string(), "[]".to_string())
        } else {
            (
                fmt_stack(Self::stack_prefix(&self.call_stack, call.depth)),
                fmt_stack(Self::stack_prefix(&self.trace_address, call.depth)),
            )
        };
        self.functrace.push_str(&format!(
            "{index},{},{},{},{},{},{},0x{},0x{},{stack},{addr}\n",
            call.call_type,
            call.depth,
            call.from,
            call.to,
            call.value,
            call.gas,
            hex::encode(&call.input),
            hex::encode(&call.output),
        ));
    }

    /// Appends one event line labelled with its token standard and function, if any.
    pub fn add_event(
        &mut self,
        address: Address,
        topics: &[Topic],
        data: &[u8],
        token: Option<TokenEvent>,
    ) {
        let topics: Vec<String> = topics.iter().map(hex_topic).collect();
        let (standard, function) = token.map_or(("", ""), |t| (t.standard.label(), t.function));
        self.eventtrace.push_str(&format!(
            "{address},[{}],0x{},{standard},{function}\n",
            topics.join(" "),
            hex::encode(data),
        ));
    }

    /// Appends one transfer line. `value` is the raw big-endian amount.
    pub fn add_transfer(&mut self, from: &str, to: &str, token: &str, value: &[u8], depth: usize) {
        let stack = if depth == 0 {
            "[]".to_string()
        } else {
            fmt_stack(Self::stack_prefix(&self.call_stack, depth))
        };
        self.transfertrace.push_str(&format!(
            "{from},{to},{token},0x{},{depth},{},{stack}\n",
            hex::encode(value),
            self.trace_index,
        ));
    }

    /// Records an emitted event, recognising ERC20/ERC721 activity.
    ///
    /// Token `Transfer` events are additionally written to the transfer trace, with the sender
    /// and recipient taken from topics 1 and 2 and the amount from the event data.
    pub fn record_log(
        &mut self,
        address: Address,
        topics: &[Topic],
        data: &[u8],
        depth: usize,
    ) -> Option<TokenEvent> {
        let token = classify_event(topics);
        if let Some(TokenEvent {
            function: "Transfer",
            ..
        }) = token
        {
            let from = hex_topic(&topics[1]);
            let to = hex_topic(&topics[2]);
            self.add_transfer(&from, &to, &address.to_string(), data, depth);
        }
        self.add_event(address, topics, data, token);
        token
    }

    /// Records a plain value transfer between accounts.
    pub fn record_value_transfer(&mut self, from: Address, to: Address, value: &BigUint) {
        let depth = self.depth();
        self.add_transfer(
            &from.to_string(),
            &to.to_string(),
            &Address::ZERO.to_string(),
            &value.to_bytes_be(),
            depth,
        );
    }

    /// Builds the document for the current transaction.
    pub fn finish(&self, meta: &TxMeta) -> TxDocument {
        let trim = |s: &str| s.trim_end_matches('\n').to_string();
        TxDocument {
            block: meta.block.to_string(),
            tx: hex_topic(&meta.tx),
            from: meta.from.to_string(),
            to: meta.to.map(|a| a.to_string()).unwrap_or_default(),
            value: meta.value.to_string(),
            gasprice: meta.gas_price.to_string(),
            gasused: meta.gas_used.to_string(),
            functrace: trim(&self.functrace),
            eventtrace: trim(&self.eventtrace),
            transferlogs: trim(&self.transfertrace),
        }
    }

    /// Builds the document and inserts it into `store`. A failed insert is logged, not returned.
    pub fn commit(&self, meta: &TxMeta, store: &mut dyn DocumentStore) -> TxDocument {
        let doc = self.finish(meta);
        if let Err(e) = store.insert(&doc) {
            tracing::warn!("{e}. Unable to log transaction tx: {}", doc.tx);
        }
        doc
    }
}
