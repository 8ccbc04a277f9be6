//! Fuzz the whole pipeline: parse, coverage, relation building, choices.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mwp::{analyze_program, AnalysisOptions};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(program) = mwp::parse(input) {
            // keep loops cheap; hitting the cap is an error, not a panic
            let options = AnalysisOptions {
                fin: true,
                fixpoint_limit: 64,
                ..AnalysisOptions::default()
            };
            let _ = analyze_program(&program, &options);
        }
    }
});
