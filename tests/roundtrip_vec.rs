use lzw16::{decode::Decoder, encode::Encoder, ByteOrder, LzwError, LzwStatus};
use rand::{rngs::StdRng, RngCore, SeedableRng};

#[test]
fn roundtrip_vec() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut noise = vec![0u8; 300_000];
    rng.fill_bytes(&mut noise);

    let text: Vec<u8> = include_bytes!("roundtrip_vec.rs").repeat(40);

    for data in &[&b""[..], &b"x"[..], &noise[..], &text[..]] {
        for &order in &[ByteOrder::Little, ByteOrder::Big] {
            assert_roundtrips(data, order);
        }
    }
}

#[test]
fn text_compresses() {
    let text: Vec<u8> = include_bytes!("roundtrip_vec.rs").repeat(40);
    let encoded = lzw16::encode_to_vec(&text);
    assert!(encoded.len() < text.len() / 3);
    assert_eq!(lzw16::decode_to_vec(&encoded).unwrap(), text);
}

#[test]
fn appends_to_existing_vector() {
    let mut encoded = b"prefix".to_vec();
    let result = Encoder::with_byte_order(ByteOrder::Little)
        .into_vec(&mut encoded)
        .encode_all(b"AAAA");
    assert_eq!(result.status, Ok(LzwStatus::Done));
    assert_eq!(&encoded[..6], b"prefix");
    assert_eq!(&encoded[6..], [0x41, 0x00, 0x00, 0x01, 0x41, 0x00]);
}

#[test]
fn mismatched_byte_order_is_detected() {
    let encoded = {
        let mut encoded = vec![];
        let _ = Encoder::with_byte_order(ByteOrder::Little)
            .into_vec(&mut encoded)
            .encode_all(b"AAAA");
        encoded
    };

    let mut decoded = vec![];
    let result = Decoder::with_byte_order(ByteOrder::Big)
        .into_vec(&mut decoded)
        .decode_all(&encoded);
    // 0x4100 is far beyond the initial dictionary.
    assert_eq!(
        result.status,
        Err(LzwError::InvalidCode {
            code: 0x4100,
            size: 256
        })
    );
}

fn assert_roundtrips(data: &[u8], order: ByteOrder) {
    let mut encoder = Encoder::with_byte_order(order);
    let mut buffer = Vec::with_capacity(2 * data.len() + 40);
    let result = encoder.into_vec(&mut buffer).encode_all(data);
    assert_eq!(result.status, Ok(LzwStatus::Done));
    assert_eq!(result.consumed_in, data.len());

    let mut decoder = Decoder::with_byte_order(order);
    let mut compare = vec![];
    let result = decoder.into_vec(&mut compare).decode_all(buffer.as_slice());
    assert_eq!(result.status, Ok(LzwStatus::Done), "{:?}", order);
    assert_eq!(result.consumed_in, buffer.len());
    assert!(data == &*compare, "{:?}, {} bytes", order, data.len());
}
