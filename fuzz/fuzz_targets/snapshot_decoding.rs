// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Snapshot decoding under adversarial input.
//!
//! Snapshot files live on disk next to the service and get read on every start.
//! A truncated write, a flipped bit or a file from some other tool must come back
//! as `CorruptSnapshot`, never as a panic or a half-loaded generation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pulse::index::persist::{decode_generation, encode_generation};
use pulse::PulseError;

fuzz_target!(|data: &[u8]| {
    match decode_generation(data, "fuzz") {
        Ok(generation) => {
            // Anything that decodes must survive a round trip unchanged.
            let bytes = encode_generation(&generation).expect("re-encode decoded generation");
            let again = decode_generation(&bytes, "fuzz").expect("decode re-encoded generation");
            assert_eq!(again.generation(), generation.generation());
            assert_eq!(again.len(), generation.len());
            assert!(generation.iter().zip(again.iter()).all(|(a, b)| a == b));

            // INVARIANT: record ids are unique and scan in ascending order
            let ids: Vec<_> = generation.ids().collect();
            assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids out of order");
        }
        Err(PulseError::CorruptSnapshot { .. }) => {}
        Err(other) => panic!("decode failed with a non-corruption error: {}", other),
    }
});
