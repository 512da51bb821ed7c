use std::sync::{Arc, Mutex};
use std::thread;

use alloy::primitives::Address;
use serde_json::json;
use tiny_http::{Response, Server, StatusCode};

use swiss_knife_calldata_adapters::{
    http_resolver, CalldataAdapterConfig, FourByteSignatureLookup, SourcifyAbiSource,
    SourcifySignatureLookup,
};
use swiss_knife_calldata_core::{
    AbiSourcePort, CalldataDecoder, DecodeSource, PortError, SignatureLookupPort,
};

const TRANSFER: &str = "0xa9059cbb000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa960450000000000000000000000000000000000000000000000000de0b6b3a7640000";

const TOKEN: &str = "0x00000000000000000000000000000000000000Aa";

fn config(base_url: &str) -> CalldataAdapterConfig {
    CalldataAdapterConfig {
        signature_lookup_url: format!("{base_url}/signature-database/v1/lookup"),
        fallback_lookup_url: format!("{base_url}/api/v1/signatures/"),
        sourcify_base_url: format!("{base_url}/server"),
        http_timeout_ms: 5_000,
        ..CalldataAdapterConfig::default()
    }
}

fn calls_matching(calls: &Arc<Mutex<Vec<String>>>, needle: &str) -> usize {
    calls
        .lock()
        .expect("calls lock")
        .iter()
        .filter(|p| p.contains(needle))
        .count()
}

#[tokio::test]
async fn sourcify_ranks_and_caches_signatures() {
    let calls = Arc::new(Mutex::new(Vec::<String>::new()));
    let (base_url, _join) = spawn_mock_server(Arc::clone(&calls));
    let lookup = SourcifySignatureLookup::new(&config(&base_url)).expect("client");

    let first = lookup.lookup("0xA9059CBB").await.expect("lookup");
    assert_eq!(
        first,
        vec![
            "transfer(address,uint256)".to_owned(),
            "many_msg_babbage(bytes1)".to_owned()
        ]
    );
    assert!(lookup.is_cached("0xa9059cbb"));

    let second = lookup.lookup("a9059cbb").await.expect("cached lookup");
    assert_eq!(first, second);
    assert_eq!(calls_matching(&calls, "function=0xa9059cbb"), 1);
}

#[tokio::test]
async fn resolver_falls_back_to_fourbyte() {
    let calls = Arc::new(Mutex::new(Vec::<String>::new()));
    let (base_url, _join) = spawn_mock_server(Arc::clone(&calls));
    let resolver = http_resolver(&config(&base_url)).expect("resolver");

    let transfer = resolver.resolve("0xa9059cbb").await.expect("resolve");
    assert_eq!(transfer[0], "transfer(address,uint256)");
    assert_eq!(calls_matching(&calls, "hex_signature=0xa9059cbb"), 0);

    let approve = resolver.resolve("0x095ea7b3").await.expect("resolve");
    assert_eq!(
        approve,
        vec![
            "approve(address,uint256)".to_owned(),
            "sign_szabo_bytecode(bytes16,uint128)".to_owned()
        ]
    );
    assert_eq!(calls_matching(&calls, "hex_signature=0x095ea7b3"), 1);
}

#[tokio::test]
async fn decodes_through_http_databases() {
    let calls = Arc::new(Mutex::new(Vec::<String>::new()));
    let (base_url, _join) = spawn_mock_server(Arc::clone(&calls));
    let decoder = CalldataDecoder::new(http_resolver(&config(&base_url)).expect("resolver"));

    let result = decoder
        .decode_with_selector(TRANSFER)
        .await
        .expect("transfer decodes");
    assert_eq!(result.signature, "transfer(address,uint256)");
    assert_eq!(result.source, DecodeSource::SignatureDatabase);
}

#[tokio::test]
async fn repeated_server_errors_mark_lookup_unavailable() {
    let calls = Arc::new(Mutex::new(Vec::<String>::new()));
    let (base_url, _join) = spawn_mock_server(Arc::clone(&calls));
    let cfg = CalldataAdapterConfig {
        fallback_lookup_url: format!("{base_url}/broken/"),
        max_failed_requests: 2,
        ..config(&base_url)
    };
    let lookup = FourByteSignatureLookup::new(&cfg).expect("client");

    for _ in 0..2 {
        let err = lookup.lookup("0x12345678").await.expect_err("server error");
        assert!(matches!(err, PortError::Transport(_)));
    }
    assert!(lookup.is_unavailable());

    let skipped = lookup.lookup("0x12345678").await.expect("short-circuits");
    assert!(skipped.is_empty());
    assert_eq!(calls_matching(&calls, "/broken/"), 2);

    lookup.reset();
    assert!(!lookup.is_unavailable());
}

#[tokio::test]
async fn fetches_verified_abi_and_reports_missing_contracts() {
    let calls = Arc::new(Mutex::new(Vec::<String>::new()));
    let (base_url, _join) = spawn_mock_server(Arc::clone(&calls));
    let source = SourcifyAbiSource::new(&config(&base_url)).expect("client");
    let token: Address = TOKEN.parse().expect("token address");

    let abi = source
        .fetch_abi(token, 1)
        .await
        .expect("fetch")
        .expect("abi present");
    assert_eq!(abi.functions().count(), 1);

    let missing = source
        .fetch_abi(Address::repeat_byte(0x01), 1)
        .await
        .expect("fetch");
    assert!(missing.is_none());

    let decoder = CalldataDecoder::new(http_resolver(&config(&base_url)).expect("resolver"));
    let result = decoder
        .decode_with_address(TRANSFER, token, 1, &source)
        .await
        .expect("decodes");
    assert_eq!(result.source, DecodeSource::Abi);
    assert_eq!(result.args[0].name, "to");
}

fn spawn_mock_server(
    calls: Arc<Mutex<Vec<String>>>,
) -> (String, thread::JoinHandle<Result<(), PortError>>) {
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());
    let token_path = format!(
        "/server/v2/contract/1/{}",
        TOKEN.parse::<Address>().expect("token").to_checksum(None)
    );

    let join = thread::spawn(move || {
        for _ in 0..32 {
            let req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let path = req.url().to_owned();
            if let Ok(mut g) = calls.lock() {
                g.push(path.clone());
            }

            let (code, payload) = match path.as_str() {
                p if p.contains("/signature-database/v1/lookup?function=0xa9059cbb") => (
                    200,
                    json!({
                        "ok": true,
                        "result": {
                            "event": {},
                            "function": {
                                "0xa9059cbb": [
                                    { "name": "spam_a9059cbb(uint256)", "filtered": true },
                                    { "name": "many_msg_babbage(bytes1)", "filtered": false, "hasVerifiedContract": false },
                                    { "name": "transfer(address,uint256)", "filtered": false, "hasVerifiedContract": true }
                                ]
                            }
                        }
                    }),
                ),
                p if p.contains("/signature-database/v1/lookup?function=") => (
                    200,
                    json!({ "ok": true, "result": { "event": {}, "function": {} } }),
                ),
                p if p.contains("/api/v1/signatures/?hex_signature=0x095ea7b3") => (
                    200,
                    json!({
                        "count": 2,
                        "results": [
                            { "id": 161159, "text_signature": "sign_szabo_bytecode(bytes16,uint128)" },
                            { "id": 149, "text_signature": "approve(address,uint256)" }
                        ]
                    }),
                ),
                p if p.contains("/api/v1/signatures/") => (200, json!({ "count": 0, "results": [] })),
                p if p.starts_with("/broken/") => (500, json!({ "error": "boom" })),
                p if p.starts_with(&token_path) => (
                    200,
                    json!({
                        "abi": [{
                            "type": "function",
                            "name": "transfer",
                            "inputs": [
                                { "name": "to", "type": "address" },
                                { "name": "amount", "type": "uint256" }
                            ],
                            "outputs": [{ "name": "", "type": "bool" }],
                            "stateMutability": "nonpayable"
                        }]
                    }),
                ),
                _ => (404, json!({ "error": "not found" })),
            };

            let response =
                Response::from_string(payload.to_string()).with_status_code(StatusCode(code));
            let _ = req.respond(response);
        }
        Ok(())
    });

    (addr, join)
}
