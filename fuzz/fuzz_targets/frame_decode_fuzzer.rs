//! Fuzz target for inbound frame decoding
//!
//! # Invariants
//!
//! - NEVER panic on arbitrary text or binary input
//! - Anything that decodes re-encodes, and decodes back to the same message

#![no_main]

use libfuzzer_sys::fuzz_target;
use topdeck_proto::ClientMessage;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = ClientMessage::from_cbor(data) {
        let bytes = message.to_cbor().expect("decoded message must encode");
        assert_eq!(ClientMessage::from_cbor(&bytes).ok(), Some(message));
    }

    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(message) = ClientMessage::from_json(text) {
            let json = message.to_json().expect("decoded message must encode");
            assert_eq!(ClientMessage::from_json(&json).ok(), Some(message));
        }
    }
});
