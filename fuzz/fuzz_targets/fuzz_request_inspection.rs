//! Fuzz testing for code that inspects untrusted request data.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_request_inspection
//! cargo +nightly fuzz run fuzz_request_inspection -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - `is_streaming_request`: arbitrary bodies never panic, and only a
//!   literal boolean `true` under `stream` is detected
//! - `Provider::forward_headers`: arbitrary client headers never leak past
//!   the allow-list
//! - `AuthChain::validate`: arbitrary `Authorization` / `x-api-key` values
//!   never authenticate against a fixed secret by accident

#![no_main]

use http::{HeaderMap, HeaderName, HeaderValue};
use libfuzzer_sys::fuzz_target;
use llm_relay::auth::{ApiKeyAuthenticator, AuthChain, BearerAuthenticator};
use llm_relay::{ProviderKind, build_provider, is_streaming_request};

const SECRET: &str = "fuzz-secret-that-is-never-generated";

fuzz_target!(|data: &[u8]| {
    let streaming = is_streaming_request(data);
    if streaming {
        let value: serde_json::Value =
            serde_json::from_slice(data).expect("detected body must be JSON");
        assert_eq!(value.get("stream"), Some(&serde_json::Value::Bool(true)));
    }

    // First NUL splits the input into a header name and value.
    let Some(split) = data.iter().position(|&b| b == 0) else {
        return;
    };
    let (name, value) = data.split_at(split);
    let value = &value[1..];

    let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name), HeaderValue::from_bytes(value))
    else {
        return;
    };

    let mut inbound = HeaderMap::new();
    inbound.insert(name.clone(), value.clone());
    inbound.insert(http::header::AUTHORIZATION, value.clone());
    inbound.insert("x-api-key", value);

    let provider = build_provider(ProviderKind::Anthropic, "fuzz", None).expect("default provider");
    let outbound = provider.forward_headers(&inbound);
    for (key, _) in &outbound {
        assert!(*key == http::header::CONTENT_TYPE || key.as_str().starts_with("anthropic-"));
    }
    assert!(!outbound.contains_key(http::header::AUTHORIZATION));
    assert!(!outbound.contains_key("x-api-key"));

    let chain = AuthChain::new(vec![
        Box::new(BearerAuthenticator::new(Some(SECRET))),
        Box::new(ApiKeyAuthenticator::new(SECRET)),
    ]);
    let result = chain.validate(&inbound, "fuzz");
    if result.is_valid() {
        assert!(data.windows(SECRET.len()).any(|w| w == SECRET.as_bytes()));
    }
});
