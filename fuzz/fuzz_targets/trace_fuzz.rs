//! Fuzz test for trace ID parsing
//!
//! Feeds arbitrary byte sequences into `TraceId::parse` to find:
//! - Panics or crashes
//! - Accepted inputs that fail the module's own invariants
//!
//! Run with: cargo +nightly fuzz run trace_fuzz -- -max_total_time=60

#![no_main]

use corral_core::TraceId;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing must never panic, only return Ok or Err.
        if let Ok(trace) = TraceId::parse(input) {
            // Anything accepted must round-trip through its string form.
            let reparsed = TraceId::parse(trace.as_str()).expect("accepted ID must reparse");
            assert_eq!(trace, reparsed);

            // Root extraction is stable and roots are roots.
            let root = trace.root();
            assert!(root.is_root());
            assert_eq!(root.root(), root);

            // Derived children keep the parent recoverable.
            let child = trace.derive_child("fuzz");
            assert!(child.is_child_of(&trace));
            assert_eq!(child.root(), trace.root());
        }
    }
});
