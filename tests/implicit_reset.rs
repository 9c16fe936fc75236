use lzw16::{decode::Decoder, encode::Encoder, ByteOrder, LzwError, LzwStatus};
use lzw16::{INITIAL_ENTRIES, MAX_ENTRIES};
use rand::{rngs::StdRng, RngCore, SeedableRng};

/// Codes written before the first reset, one new entry with each.
const CODES_PER_TABLE: u64 = (MAX_ENTRIES - INITIAL_ENTRIES) as u64;

fn noise(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

fn little_endian(codes: &[u16]) -> Vec<u8> {
    codes.iter().flat_map(|code| code.to_le_bytes()).collect()
}

#[test]
fn reset_boundary() {
    let data = noise(1 << 19);
    let mut encoder = Encoder::with_byte_order(ByteOrder::Little);
    let mut encoded = vec![];
    let mut out = [0u8; 2];
    let mut encoder_reset_at = None;

    for byte in data.chunks(1) {
        let len_before = encoder.dictionary_len();
        let codes_before = encoder.codes();
        let result = encoder.encode_bytes(byte, &mut out);
        assert_eq!(result.consumed_in, 1);
        encoded.extend_from_slice(&out[..result.consumed_out]);

        if encoder.resets() == 1 && encoder_reset_at.is_none() {
            assert_eq!(len_before, MAX_ENTRIES);
            assert_eq!(codes_before, CODES_PER_TABLE);
            // The byte that triggered the reset starts the first new entry.
            assert_eq!(encoder.dictionary_len(), INITIAL_ENTRIES + 1);
            encoder_reset_at = Some(codes_before);
        } else {
            assert!(encoder.dictionary_len() >= len_before || encoder.resets() > 1);
        }
    }

    encoder.finish();
    let result = encoder.encode_bytes(&[], &mut out);
    assert_eq!(result.status, Ok(LzwStatus::Done));
    encoded.extend_from_slice(&out[..result.consumed_out]);
    let encoder_reset_at = encoder_reset_at.expect("input too short to fill the dictionary");
    assert!(encoder.resets() >= 1);

    let mut decoder = Decoder::with_byte_order(ByteOrder::Little);
    let mut decoded = vec![];
    let mut out = vec![0u8; MAX_ENTRIES];
    let mut decoder_reset_at = None;

    for code in encoded.chunks(2) {
        let len_before = decoder.dictionary_len();
        let codes_before = decoder.codes();
        let result = decoder.decode_bytes(code, &mut out);
        assert_eq!(result.status, Ok(LzwStatus::Ok));
        decoded.extend_from_slice(&out[..result.consumed_out]);

        if decoder.resets() == 1 && decoder_reset_at.is_none() {
            assert_eq!(len_before, MAX_ENTRIES);
            decoder_reset_at = Some(codes_before);
        }
    }

    decoder.finish();
    let result = decoder.decode_bytes(&[], &mut out);
    assert_eq!(result.status, Ok(LzwStatus::Done));

    // The decoder learns each entry one code later than the encoder created it. It fills up
    // while reading the first code written after the encoder's reset, and resets on the next.
    assert_eq!(decoder_reset_at, Some(encoder_reset_at + 1));
    assert_eq!(decoder.resets(), encoder.resets());
    assert_eq!(decoder.codes(), encoder.codes());
    assert!(decoded == data);
}

#[test]
fn repeated_byte_run_does_not_fill_dictionary() {
    let data = vec![0u8; 70_000];
    let mut encoder = Encoder::new();
    let mut encoded = vec![];
    let result = encoder.into_vec(&mut encoded).encode_all(&data);
    assert_eq!(result.status, Ok(LzwStatus::Done));
    // Run lengths 1, 2, 3, ... each take one code.
    assert_eq!(encoder.resets(), 0);
    assert!(encoder.codes() < 400);
    assert_eq!(lzw16::decode_to_vec(&encoded).unwrap(), data);
}

#[test]
fn crafted_stream_resets_after_single_byte() {
    // The first code creates no entry, each following one does.
    let mut codes = vec![0x41u16; 1 + CODES_PER_TABLE as usize];
    codes.push(0x42);
    codes.push(0x100);

    let mut decoder = Decoder::with_byte_order(ByteOrder::Little);
    let mut decoded = vec![];
    let result = decoder
        .into_vec(&mut decoded)
        .decode_all(&little_endian(&codes));
    assert_eq!(result.status, Ok(LzwStatus::Done));
    assert_eq!(decoder.resets(), 1);
    // After the reset 0x100 joins the last code before it with the first one after.
    assert_eq!(&decoded[decoded.len() - 4..], b"ABAB");
    assert_eq!(decoded.len(), 1 + CODES_PER_TABLE as usize + 1 + 2);
}

#[test]
fn crafted_stream_resets_after_long_match() {
    let mut codes = vec![0x41u16; CODES_PER_TABLE as usize];
    // Fill the last slot while the previous sequence is two bytes long.
    codes.push(0x100);
    codes.push(0x41);
    // The first entry after the reset extends that sequence.
    codes.push(0x100);

    let mut decoder = Decoder::with_byte_order(ByteOrder::Little);
    let mut decoded = vec![];
    let result = decoder
        .into_vec(&mut decoded)
        .decode_all(&little_endian(&codes));
    assert_eq!(result.status, Ok(LzwStatus::Done));
    assert_eq!(decoder.resets(), 1);
    assert_eq!(decoder.dictionary_len(), INITIAL_ENTRIES + 2);
    assert_eq!(&decoded[decoded.len() - 4..], b"AAAA");
    assert!(decoded == vec![b'A'; CODES_PER_TABLE as usize + 2 + 1 + 3]);
}

#[test]
fn crafted_stream_refers_to_next_code_after_reset() {
    let mut codes = vec![0x41u16; CODES_PER_TABLE as usize];
    codes.push(0x100);
    // Refers to the entry the reset makes room for.
    codes.push(0x100);

    let mut decoded = vec![];
    let result = Decoder::with_byte_order(ByteOrder::Little)
        .into_vec(&mut decoded)
        .decode_all(&little_endian(&codes));
    assert_eq!(result.status, Ok(LzwStatus::Done));
    assert!(decoded == vec![b'A'; CODES_PER_TABLE as usize + 2 + 3]);
}

#[test]
fn code_beyond_table_after_reset() {
    let full = vec![0x41u16; 1 + CODES_PER_TABLE as usize];

    let mut codes = full.clone();
    codes.push(0x101);
    let mut decoder = Decoder::with_byte_order(ByteOrder::Little);
    let mut decoded = vec![];
    let result = decoder
        .into_vec(&mut decoded)
        .decode_all(&little_endian(&codes));
    assert_eq!(
        result.status,
        Err(LzwError::InvalidCode {
            code: 0x101,
            size: INITIAL_ENTRIES
        })
    );
    assert_eq!(decoder.resets(), 1);

    let mut codes = full;
    codes.push(0x41);
    codes.push(0x102);
    let mut decoded = vec![];
    let result = Decoder::with_byte_order(ByteOrder::Little)
        .into_vec(&mut decoded)
        .decode_all(&little_endian(&codes));
    assert_eq!(
        result.status,
        Err(LzwError::InvalidCode {
            code: 0x102,
            size: INITIAL_ENTRIES + 1
        })
    );
}
