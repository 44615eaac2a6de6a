#![no_main]

use huella::payload::ModelPayload;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Stored payloads are untrusted bytes; decoding must fail cleanly
    let _ = ModelPayload::decode(data);
});
