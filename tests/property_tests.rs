//! Chunk-boundary invariance of the decoding pipeline.

use mpc_client::protocol::{LineDecoder, ResponseGrouper, ResponseUnit, Token};
use proptest::prelude::*;

/// A daemon transcript covering lines, lists, failures and binary data.
const TRANSCRIPT: &[u8] = b"OK MPD 0.23.5\n\
changed: player\nchanged: mixer\nOK\n\
OK\n\
volume: 50\nstate: play\nlist_OK\nfile: a.flac\nlist_OK\nOK\n\
list_OK\nACK [50@1] {add} No such song\n\
size: 8\nbinary: 8\nAB\nCD\n\xff\x00\nOK\n\
Title: caf\xc3\xa9\nOK\n";

fn decode(chunks: &[&[u8]]) -> Vec<Token> {
    let mut decoder = LineDecoder::new();
    let mut tokens = Vec::new();
    for chunk in chunks {
        tokens.extend(decoder.push(chunk).unwrap());
    }
    assert!(decoder.is_empty());
    tokens
}

fn group(tokens: Vec<Token>) -> Vec<ResponseUnit> {
    let mut grouper = ResponseGrouper::new();
    tokens
        .into_iter()
        .filter_map(|t| grouper.push(t).unwrap())
        .collect()
}

/// Split `data` at the given (unsorted, possibly repeated) offsets.
fn split_at_offsets<'a>(data: &'a [u8], offsets: &[usize]) -> Vec<&'a [u8]> {
    let mut cuts: Vec<usize> = offsets.iter().map(|o| o % (data.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts {
        chunks.push(&data[start..cut]);
        start = cut;
    }
    chunks.push(&data[start..]);
    chunks
}

#[test]
fn test_transcript_units() {
    let units = group(decode(&[TRANSCRIPT]));

    // greeting, idle, noidle, 2 list members, 1 list member + ACK, binary, text
    assert_eq!(units.len(), 9);
    assert!(matches!(units[0], ResponseUnit::Greeting(_)));
    assert!(matches!(&units[6], ResponseUnit::Failure(ack) if ack.code == 50));
    match &units[7] {
        ResponseUnit::Success(response) => {
            assert_eq!(response.binary.as_deref(), Some(&b"AB\nCD\n\xff\x00"[..]));
        }
        other => panic!("expected binary response, got {:?}", other),
    }
    match &units[8] {
        ResponseUnit::Success(response) => assert_eq!(response.lines, vec!["Title: café"]),
        other => panic!("expected text response, got {:?}", other),
    }
}

proptest! {
    #[test]
    fn tokens_do_not_depend_on_chunking(offsets in prop::collection::vec(any::<usize>(), 0..32)) {
        let whole = decode(&[TRANSCRIPT]);
        let chunked = decode(&split_at_offsets(TRANSCRIPT, &offsets));
        prop_assert_eq!(chunked, whole);
    }

    #[test]
    fn units_do_not_depend_on_chunking(offsets in prop::collection::vec(any::<usize>(), 0..32)) {
        let whole = group(decode(&[TRANSCRIPT]));
        let chunked = group(decode(&split_at_offsets(TRANSCRIPT, &offsets)));
        prop_assert_eq!(chunked, whole);
    }

    #[test]
    fn arbitrary_lines_survive_any_split(
        lines in prop::collection::vec("[a-zA-Z0-9_ ]{0,40}", 1..20),
        offsets in prop::collection::vec(any::<usize>(), 0..16),
    ) {
        let data: Vec<u8> = lines.iter().flat_map(|l| format!("{}\n", l).into_bytes()).collect();
        let tokens = decode(&split_at_offsets(&data, &offsets));

        let expected: Vec<Token> = lines.into_iter().map(Token::Line).collect();
        prop_assert_eq!(tokens, expected);
    }
}
