#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use mcproto_client::core::codec::FrameDecoder;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Fuzz frame splitting with and without compression - no panics, bounded allocation
    for threshold in [None, Some(256)] {
        let mut decoder = FrameDecoder::new();
        if let Some(threshold) = threshold {
            let _ = decoder.enable_compression(threshold);
        }
        let mut buf = BytesMut::from(data);
        while let Ok(Some(_)) = decoder.decode(&mut buf) {}
    }
});
