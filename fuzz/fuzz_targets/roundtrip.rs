#![no_main]
use libfuzzer_sys::fuzz_target;
use lzw16::{decode::Decoder, encode::Encoder, ByteOrder};

fuzz_target!(|data: &[u8]| {
    let mut encoder = Encoder::with_byte_order(ByteOrder::Big);
    let mut buffer = Vec::with_capacity(2 * data.len() + 2);
    let _ = encoder.into_stream(&mut buffer).encode_all(data);

    let mut decoder = Decoder::with_byte_order(ByteOrder::Big);
    let mut compare = vec![];
    let result = decoder.into_stream(&mut compare).decode_all(buffer.as_slice());
    assert!(result.status.is_ok(), "{:?}", result.status);
    assert_eq!(data, &*compare);
});
