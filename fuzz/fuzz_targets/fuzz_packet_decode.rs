#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use mcproto_client::protocol::registry::PacketRegistry;
use mcproto_client::protocol::state::Direction;

fuzz_target!(|data: &[u8]| {
    // Fuzz packet body decoding in every phase
    for registry in [
        PacketRegistry::handshake(),
        PacketRegistry::login(),
        PacketRegistry::game(),
    ] {
        for direction in [Direction::ClientBound, Direction::ServerBound] {
            if let Ok(packet) = registry.decode(direction, Bytes::copy_from_slice(data)) {
                // Anything that decodes must encode again; VarInts may shrink
                let encoded = registry.encode_to_bytes(&packet).expect("decoded packet encodes");
                assert!(encoded.len() <= data.len());
            }
        }
    }
});
