#![no_main]

use libfuzzer_sys::fuzz_target;
use mxi::index::{Index, IndexInput, MatchCase};

fuzz_target!(|data: &[u8]| {
    let Ok(index) = Index::from_bytes(data) else {
        return;
    };
    let mut input = IndexInput::new(&index);
    if input.open().is_err() {
        return;
    }
    let _ = input.query_files_referring_to_prefix(b"a", MatchCase::Sensitive);
    let _ = input.query_entries_prefixed_by(b"A", MatchCase::Insensitive);
    let _ = input.query_in_document_names("/");
});
