#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mxi::index::Index;

#[derive(Debug, Arbitrary)]
struct Input {
    block_size: u16,
    documents: Vec<(String, Vec<Vec<u8>>)>,
}

fuzz_target!(|input: Input| {
    let Ok(mut index) = Index::with_block_size(input.block_size as usize) else {
        return;
    };
    for (path, words) in &input.documents {
        let _ = index.add_document(path, words);
    }

    let files = index.sorted_files().unwrap();
    let words = index.sorted_word_entries().unwrap();
    // Entries too large for the block size are the only acceptable failure
    if index.finalize().is_err() {
        return;
    }
    assert_eq!(index.sorted_files().unwrap(), files);
    assert_eq!(index.sorted_word_entries().unwrap(), words);
});
