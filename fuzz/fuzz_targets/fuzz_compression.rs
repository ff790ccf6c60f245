#![no_main]

use libfuzzer_sys::fuzz_target;
use mcproto_client::utils::compression::{compress, decompress, maybe_decompress};

fuzz_target!(|data: &[u8]| {
    // Fuzz zlib round-trips
    if let Ok(compressed) = compress(data) {
        let restored = decompress(&compressed, data.len()).expect("roundtrip");
        assert_eq!(restored, data);
    }

    // Fuzz raw inflation with hostile size claims (test size limits with malformed data)
    if let Some((&claim, rest)) = data.split_first() {
        let _ = maybe_decompress(rest, usize::from(claim) << 16, 0);
        let _ = decompress(rest, rest.len());
    }
});
