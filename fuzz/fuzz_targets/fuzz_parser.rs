//! Fuzz the C-subset lexer and parser
//!
//! Malformed input must come back as `MwpError::Parse`, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = mwp::parse(input);
    }
});
