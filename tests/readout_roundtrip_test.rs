//! E2E tests for the uDAQ readout path (hit buffer → hitfile → decode)
//!
//! Hit buffers are generated from seeded random numbers, split into
//! arbitrary blocks, wrapped into a COBS hitfile stream, reassembled and
//! decoded. The decoded counts must match the counts of decoding the
//! original buffer directly.

use rand::prelude::*;
use rand::rngs::StdRng;

use udaq_rs::checksum::fletcher16;
use udaq_rs::decoder::{decode, HitBufSummary};
use udaq_rs::packet::{decode_monitor, reassemble};

/// COBS-encode a packet
fn cobs_encode(data: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(data.len() + 2);
    let mut code_index = encoded.len();
    encoded.push(0x01);

    for &byte in data {
        if byte == 0 {
            code_index = encoded.len();
            encoded.push(0x01);
        } else {
            encoded.push(byte);
            encoded[code_index] += 1;
            if encoded[code_index] == 0xFF {
                code_index = encoded.len();
                encoded.push(0x01);
            }
        }
    }

    encoded
}

/// Wrap a payload into an encoded packet: type byte, payload, checksum
fn make_packet(payload: &[u8]) -> Vec<u8> {
    let mut inner = Vec::with_capacity(payload.len() + 3);
    inner.push(0x10);
    inner.extend_from_slice(payload);
    let cs = fletcher16(&inner);
    inner.extend_from_slice(&cs.to_le_bytes());
    cobs_encode(&inner)
}

/// Build a full hitfile stream from payload blocks
fn make_hitfile(blocks: &[&[u8]]) -> Vec<u8> {
    let mut stream = Vec::new();
    let mut push = |payload: &[u8]| {
        stream.extend_from_slice(&make_packet(payload));
        stream.push(0);
    };
    push(&(blocks.len() as u16).to_le_bytes());
    for block in blocks {
        push(block);
    }
    push(b"OK\n\0");
    stream
}

/// Append a random record to the buffer, returning updated counts
fn push_random_record(rng: &mut StdRng, buf: &mut Vec<u8>, expected: &mut HitBufSummary) {
    let push_word = |buf: &mut Vec<u8>, w: u32| buf.extend_from_slice(&w.to_be_bytes());

    match rng.gen_range(0..6) {
        0 => {
            push_word(buf, 0xE000_0000 | (rng.gen::<u32>() & 0x00FF_FFFF));
            expected.seconds += 1;
        }
        1 => push_word(buf, 0xE400_0000 | (rng.gen::<u32>() & 0x00FF_FFFF)),
        2 => {
            push_word(buf, 0xE500_0000);
            push_word(buf, rng.gen());
        }
        3 => push_word(buf, 0xE600_0000),
        _ => {
            let tag = loop {
                let t: u8 = rng.gen();
                if !matches!(t, 0xE0 | 0xE4 | 0xE5 | 0xE6) {
                    break t;
                }
            };
            let adc_count: u32 = rng.gen_range(0..=15);
            push_word(buf, ((tag as u32) << 24) | (rng.gen::<u32>() & 0x00FF_FFFF));
            push_word(buf, (adc_count << 28) | (rng.gen::<u32>() & 0x0FFF_FFFF));
            for _ in 0..adc_count / 2 {
                push_word(buf, rng.gen());
            }
            expected.hits += 1;
        }
    }
}

/// Generate a well-formed random hit buffer and its expected counts
fn random_hitbuf(rng: &mut StdRng, records: usize) -> (Vec<u8>, HitBufSummary) {
    let mut buf = Vec::new();
    let mut expected = HitBufSummary::default();
    for _ in 0..records {
        push_random_record(rng, &mut buf, &mut expected);
    }
    (buf, expected)
}

#[test]
fn random_hitbuf_decodes_to_expected_counts() {
    let mut rng = StdRng::seed_from_u64(42);
    for records in [0usize, 1, 10, 500] {
        let (buf, expected) = random_hitbuf(&mut rng, records);
        assert_eq!(decode(&buf).unwrap(), expected, "records={}", records);
    }
}

#[test]
fn hitfile_roundtrip_preserves_counts() {
    let mut rng = StdRng::seed_from_u64(7);
    let (buf, expected) = random_hitbuf(&mut rng, 300);

    // Split into blocks of arbitrary, unaligned sizes
    let mut blocks: Vec<&[u8]> = Vec::new();
    let mut rest = &buf[..];
    while !rest.is_empty() {
        let take = rng.gen_range(1..=rest.len().min(97));
        let (block, tail) = rest.split_at(take);
        blocks.push(block);
        rest = tail;
    }

    let stream = make_hitfile(&blocks);
    let reassembled = reassemble(&stream).unwrap();
    assert_eq!(reassembled, buf);
    assert_eq!(decode(&reassembled).unwrap(), expected);
}

#[test]
fn concatenated_streams_add_counts() {
    let mut rng = StdRng::seed_from_u64(1234);
    let (a, ea) = random_hitbuf(&mut rng, 50);
    let (b, eb) = random_hitbuf(&mut rng, 80);

    let mut ab = a.clone();
    ab.extend_from_slice(&b);
    let summary = decode(&ab).unwrap();
    assert_eq!(summary.seconds, ea.seconds + eb.seconds);
    assert_eq!(summary.hits, ea.hits + eb.hits);
}

#[test]
fn truncating_last_hit_fails_whole_decode() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut buf = Vec::new();
    let mut expected = HitBufSummary::default();
    push_random_record(&mut rng, &mut buf, &mut expected);
    // A hit whose samples run past the cut
    buf.extend_from_slice(&0x0100_0000u32.to_be_bytes());
    buf.extend_from_slice(&0xF000_0000u32.to_be_bytes()); // 15 ADCs -> 7 sample words
    buf.extend_from_slice(&0u32.to_be_bytes());

    assert!(decode(&buf).is_err());
}

#[test]
fn monitor_stream_roundtrip() {
    let stream = {
        let mut s = Vec::new();
        for payload in [
            &b"0.0000 21.8750\n\0"[..],
            &b"TAI: 21 60 08 15 30 29730\tCLK: 987654321"[..],
        ] {
            s.extend_from_slice(&make_packet(payload));
            s.push(0);
        }
        s
    };

    let readout = decode_monitor(&stream).unwrap();
    assert_eq!(readout.temperature, 21.875);
    // Day 60 of 2021 is March 1st
    assert_eq!(
        readout.time.to_string(),
        "2021-03-01 08:15:30".to_string()
    );
}
