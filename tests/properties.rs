//! Property-based tests for spec.md §8's P1 (resumability) and P3 (no
//! retrograde cursors), generating arbitrary request byte streams and
//! arbitrary partitionings of them.

use std::io::Cursor;

use proptest::prelude::*;

use sehttpd::parse::headers::HeaderState;
use sehttpd::parse::request_line::RequestLineState;
use sehttpd::parse::ParseStatus;
use sehttpd::ring_buffer::RingBuffer;

/// Builds a syntactically valid request (spec.md §4.2/§4.3 grammar) from
/// small arbitrary header counts, so the generator never wastes shrinking
/// effort on inputs the parser is specified to reject outright.
fn valid_request(method: &str, uri: &str, headers: &[(String, String)]) -> Vec<u8> {
    let mut out = format!("{} {} HTTP/1.1\r\n", method, uri).into_bytes();
    for (k, v) in headers {
        out.extend_from_slice(format!("{}: {}\r\n", k, v).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out
}

/// Parse the whole request in one shot: one write, run both phases to
/// completion.
fn parse_one_shot(input: &[u8]) -> (Vec<u8>, Vec<(Vec<u8>, Vec<u8>)>) {
    let mut rb = RingBuffer::new(4096);
    let mut src = Cursor::new(input.to_vec());
    rb.write_from(&mut src).unwrap().unwrap();

    let mut request_line = RequestLineState::new(0);
    while request_line.step(&rb).unwrap() == ParseStatus::NeedMore {}
    let mut headers = HeaderState::new(request_line.cursor());
    while headers.step(&rb).unwrap() == ParseStatus::NeedMore {}

    let uri = rb.slice(request_line.uri_start, request_line.uri_end);
    let hs = headers
        .headers
        .iter()
        .map(|h| (rb.slice(h.key.0, h.key.1), rb.slice(h.value.0, h.value.1)))
        .collect();
    (uri, hs)
}

/// Parse the request delivered across `cuts`, a partitioning of `input`
/// into contiguous, possibly-empty-skipped chunks, checking P3 (cursors
/// never retreat) after every chunk.
fn parse_partitioned(input: &[u8], cuts: &[usize]) -> (Vec<u8>, Vec<(Vec<u8>, Vec<u8>)>) {
    let mut rb = RingBuffer::new(4096);
    let mut request_line = RequestLineState::new(0);
    let mut offset = 0;
    let mut prev_pos = rb.pos();
    let mut prev_last = rb.last();

    let mut request_line_done = false;
    for &cut in cuts {
        let end = (offset + cut).min(input.len());
        if end > offset {
            let mut src = Cursor::new(input[offset..end].to_vec());
            rb.write_from(&mut src).unwrap().unwrap();
            offset = end;
        }
        assert!(rb.pos() >= prev_pos, "pos must never retreat");
        assert!(rb.last() >= prev_last, "last must never retreat");
        prev_pos = rb.pos();
        prev_last = rb.last();

        if !request_line_done {
            if request_line.step(&rb).unwrap() == ParseStatus::Done {
                request_line_done = true;
            }
        }
        if offset >= input.len() {
            break;
        }
    }
    while !request_line_done {
        let mut src = Cursor::new(input[offset..].to_vec());
        rb.write_from(&mut src).unwrap().unwrap();
        offset = input.len();
        if request_line.step(&rb).unwrap() == ParseStatus::Done {
            request_line_done = true;
        }
    }

    let mut headers = HeaderState::new(request_line.cursor());
    while headers.step(&rb).unwrap() == ParseStatus::NeedMore {
        if offset < input.len() {
            let mut src = Cursor::new(input[offset..].to_vec());
            rb.write_from(&mut src).unwrap().unwrap();
            offset = input.len();
        } else {
            panic!("ran out of bytes before headers completed");
        }
    }

    let uri = rb.slice(request_line.uri_start, request_line.uri_end);
    let hs = headers
        .headers
        .iter()
        .map(|h| (rb.slice(h.key.0, h.key.1), rb.slice(h.value.0, h.value.1)))
        .collect();
    (uri, hs)
}

fn header_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(
        (
            "[A-Za-z][A-Za-z0-9-]{0,8}",
            "[A-Za-z0-9]{0,12}",
        ),
        0..5,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// P1: partitioning the same byte stream arbitrarily and feeding it in
    /// drips yields the same parsed URI and header list as one shot.
    #[test]
    fn resumability_matches_one_shot(
        uri in "/[a-z0-9/]{0,16}",
        headers in header_strategy(),
        cut_sizes in prop::collection::vec(1usize..5, 1..20),
    ) {
        let input = valid_request("GET", &uri, &headers);
        let one_shot = parse_one_shot(&input);
        let partitioned = parse_partitioned(&input, &cut_sizes);
        prop_assert_eq!(one_shot, partitioned);
    }
}
