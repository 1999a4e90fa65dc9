//! Fuzz test for claims snapshot decoding
//!
//! The snapshot is the shared medium written by many agents; decoding it
//! must never panic regardless of what ends up on disk, and anything that
//! decodes must re-encode losslessly.
//!
//! Run with: cargo +nightly fuzz run snapshot_fuzz -- -max_total_time=60

#![no_main]

use corral_core::WorkClaim;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Decoding arbitrary content returns Ok or Err, never panics.
        if let Ok(claims) = serde_json::from_str::<Vec<WorkClaim>>(input) {
            // A decodable snapshot survives a persist/load cycle intact.
            let encoded = serde_json::to_string(&claims).expect("claims must re-encode");
            let reloaded: Vec<WorkClaim> =
                serde_json::from_str(&encoded).expect("re-encoded snapshot must decode");
            assert_eq!(claims, reloaded);
        }
    }
});
