use num_bigint::BigUint;
use scopetrace_core::config::TraceConfig;
use scopetrace_core::txlog::{
    event_signature, CallRecord, DocumentStore, JsonLinesStore, MemoryStore, Topic, TxLog, TxMeta,
    EVENT_HEADER,
};
use scopetrace_core::Address;
use std::io::Write;

fn addr(last: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = last;
    Address(bytes)
}

fn word(value: u8) -> Topic {
    let mut topic = [0u8; 32];
    topic[31] = value;
    topic
}

/// Replays a transaction that calls a token contract which mints an NFT and forwards ether.
fn run_transaction(log: &mut TxLog) {
    log.begin_tx();
    log.add_call(&CallRecord::new("CALL", addr(1), addr(2)));
    log.enter_scope(1);
    log.add_call(&CallRecord {
        depth: log.depth(),
        value: BigUint::from(5u32),
        ..CallRecord::new("CALL", addr(2), addr(3))
    });
    log.enter_scope(2);
    log.record_log(
        addr(3),
        &[
            event_signature("Transfer(address,address,uint256)"),
            word(0),
            word(1),
            word(77),
        ],
        &[],
        log.depth(),
    );
    log.record_value_transfer(addr(3), addr(4), &BigUint::from(1_000u32));
    log.exit_scope();
    log.exit_scope();
}

#[test]
fn test_transaction_document() {
    let mut log = TxLog::new();
    run_transaction(&mut log);
    let mut store = MemoryStore::default();
    let doc = log.commit(
        &TxMeta {
            block: 100,
            from: addr(1),
            to: Some(addr(2)),
            ..TxMeta::default()
        },
        &mut store,
    );

    assert_eq!(store.documents(), &[doc.clone()]);
    assert_eq!(log.max_depth(), 2);

    let calls: Vec<&str> = doc.functrace.lines().skip(1).collect();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].starts_with("1,CALL,1,"));
    assert!(calls[1].ends_with(",[1],[0]"));

    let events: Vec<&str> = doc.eventtrace.lines().collect();
    assert_eq!(events[0], EVENT_HEADER);
    assert!(events[1].ends_with(",ERC721,Transfer"));

    // The NFT transfer and the ether transfer.
    let transfers: Vec<&str> = doc.transferlogs.lines().skip(1).collect();
    assert_eq!(transfers.len(), 2);
    assert!(transfers[0].ends_with(",2,2,[1 2]"));
    assert!(transfers[1].ends_with(",0x03e8,2,2,[1 2]"));
}

#[test]
fn test_log_reused_across_transactions() {
    let mut log = TxLog::new();
    let mut store = MemoryStore::default();
    for block in 0..3 {
        run_transaction(&mut log);
        log.commit(&TxMeta { block, ..TxMeta::default() }, &mut store);
    }
    let docs = store.documents();
    assert_eq!(docs.len(), 3);
    assert!(docs.iter().all(|d| d.functrace == docs[0].functrace));
    assert_eq!(docs[2].block, "2");
}

#[test]
fn test_store_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("opera.jsonl");
    let mut config_file = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
    write!(
        config_file,
        r#"{{"store": {{"path": {}, "collection": "opera"}}}}"#,
        serde_json::to_string(&out).unwrap()
    )
    .unwrap();

    let config = TraceConfig::from_file(config_file.path()).unwrap();
    let mut store = JsonLinesStore::from_config(&config.store);
    assert_eq!(store.path(), out.as_path());

    let mut log = TxLog::new();
    run_transaction(&mut log);
    let doc = log.finish(&TxMeta::default());
    store.insert(&doc).unwrap();

    let line = std::fs::read_to_string(&out).unwrap();
    let stored: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(stored["collection"], "opera");
    assert_eq!(stored["functrace"], doc.functrace);
}
