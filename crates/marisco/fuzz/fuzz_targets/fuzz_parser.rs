//! Fuzz target for the provider table parser.
//!
//! This fuzzer tests that the CSV/TSV parser:
//! 1. Never panics on malformed input
//! 2. Handles all delimiter combinations
//! 3. Keeps every parsed row as wide as the header

#![no_main]

use libfuzzer_sys::fuzz_target;
use marisco::input::Parser;

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let parser = Parser::new();
    for delimiter in [b',', b'\t', b';'] {
        if let Ok(table) = parser.parse_bytes(data, delimiter) {
            for row in &table.rows {
                assert!(row.len() <= table.column_count());
            }
        }
    }
});
