#![no_main]
use libfuzzer_sys::fuzz_target;
use varlzw::{Decoder, Encoder, Header};

fuzz_target!(|input: (u8, &[u8])| {
    let (flags, data) = input;
    let header = Header::default()
        .with_reset(flags & 1 != 0)
        .with_fixed_width(flags & 2 != 0);

    let mut encoder = Encoder::new(header);
    let mut buffer = Vec::with_capacity(2*data.len() + 40);
    let result = encoder.into_stream(&mut buffer).encode_all(data);
    assert!(result.status.is_ok(), "{:?}", result.status);

    let mut decoder = Decoder::new();
    let mut compare = vec![];
    let result = decoder.into_stream(&mut compare).decode_all(buffer.as_slice());
    assert!(result.status.is_ok(), "{:?}", result.status);
    assert_eq!(decoder.header(), Some(header));
    assert!(data == &*compare);
});
