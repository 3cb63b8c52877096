#![no_main]

use darwin::index::IndexBuilder;
use darwin::utils::{from_bytes, to_bytes};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode to an error or to a builder that re-encodes
    // to a snapshot of the same length
    if let Ok(builder) = from_bytes::<IndexBuilder>(data) {
        let bytes = to_bytes(&builder).expect("re-encode");
        assert_eq!(bytes.len(), data.len());
    }
});
