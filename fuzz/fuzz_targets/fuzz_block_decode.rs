#![no_main]

use libfuzzer_sys::fuzz_target;
use mxi::index::block::{decode_region, FileCodec, WordCodec};

fuzz_target!(|data: &[u8]| {
    // Arbitrary regions must decode or fail with an error, never panic
    let mut words = Vec::new();
    let _ = decode_region::<WordCodec>(data, &mut words);
    let mut files = Vec::new();
    let _ = decode_region::<FileCodec>(data, &mut files);
});
