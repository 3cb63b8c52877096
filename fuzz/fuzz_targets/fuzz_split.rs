#![no_main]

use arbitrary::Arbitrary;
use darwin::utils::Tokenizer;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    text: &'a [u8],
    delimiters: &'a [u8],
}

fuzz_target!(|input: Input<'_>| {
    let mut tokenizer = Tokenizer::default();
    let words = tokenizer.split(input.text, input.delimiters);
    assert!(words.iter().all(|w| !w.is_empty()));

    // Ids are dense and never the unknown sentinel
    let Ok(ids) = tokenizer.tokenize(input.text, input.delimiters) else {
        return;
    };
    assert_eq!(ids.len(), words.len());
    assert!(ids.iter().all(|&id| id >= 1 && id as usize <= tokenizer.len()));
});
