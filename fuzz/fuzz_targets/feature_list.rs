#![no_main]

use huella::features::parse_feature_list;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Any accepted list holds only finite values
        if let Ok(values) = parse_feature_list(input) {
            assert!(values.iter().all(|v| v.is_finite()));
        }
    }
});
