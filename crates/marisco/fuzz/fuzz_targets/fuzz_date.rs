//! Fuzz target for sampling date parsing.
//!
//! This fuzzer tests that the date parsers:
//! 1. Never panic on any year, month or day
//! 2. Never panic on malformed composite or ISO 8601 strings
//! 3. Always encode a parsed date without overflow

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use marisco::steps::{encode_time, parse_composite_date, parse_iso_time, parse_partial_date};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    year: Option<i64>,
    month: Option<i64>,
    day: Option<i64>,
    raw: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    if let Some(date) = parse_partial_date(input.year, input.month, input.day) {
        let _ = encode_time(&date);
    }
    if let Some(date) = parse_composite_date(input.raw) {
        let _ = encode_time(&date);
    }
    if let Some(date) = parse_iso_time(input.raw) {
        let _ = encode_time(&date);
    }
});
