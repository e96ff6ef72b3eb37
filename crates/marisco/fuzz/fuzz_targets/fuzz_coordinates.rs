//! Fuzz target for degree-minute coordinate parsing.
//!
//! This fuzzer tests that `parse_ddmm`:
//! 1. Never panics, including on pathological regex input
//! 2. Only returns finite values
//! 3. Agrees in sign with an explicit leading minus

#![no_main]

use libfuzzer_sys::fuzz_target;
use marisco::steps::parse_ddmm;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1_000 {
        return;
    }
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    if let Some(dd) = parse_ddmm(raw) {
        assert!(dd.is_finite());
        if raw.trim_start().starts_with('-') {
            assert!(dd <= 0.0);
        }
    }
});
