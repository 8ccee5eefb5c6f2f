use std::io;

use varlzw::bits::BitWriter;
use varlzw::{Decoder, Encoder, Header, LzwError, END_CODE};

fn stream(header: u32, codes: &[(u32, u8)]) -> Vec<u8> {
    let mut writer = BitWriter::new(vec![]);
    writer.write_bits(header, 2).unwrap();
    for &(code, width) in codes {
        writer.write_bits(code, width).unwrap();
    }
    writer.close().unwrap();
    writer.into_inner()
}

fn stream_error(data: &[u8]) -> io::Error {
    let mut decoder = Decoder::new();
    let mut out = vec![];
    let result = decoder.into_stream(&mut out).decode_all(data);
    match result.status {
        Ok(()) => panic!("decoded {} bytes from a corrupt stream", out.len()),
        Err(err) => err,
    }
}

#[test]
fn empty_stream() {
    let mut decoder = Decoder::new();
    assert!(matches!(decoder.decode(&[]), Err(LzwError::TruncatedHeader)));
    assert_eq!(decoder.header(), None);
    assert_eq!(stream_error(&[]).kind(), io::ErrorKind::UnexpectedEof);
}

#[test]
fn truncated_stream() {
    let data = Encoder::new(Header::default())
        .encode(b"TOBEORNOTTOBEORTOBEORNOT")
        .unwrap();

    for len in 1..data.len() - 1 {
        let mut decoder = Decoder::new();
        match decoder.decode(&data[..len]) {
            Err(LzwError::Truncated { width: 9 }) => {}
            other => panic!("{} bytes: {:?}", len, other),
        }
        assert_eq!(decoder.header(), Some(Header::default()));
        assert_eq!(stream_error(&data[..len]).kind(), io::ErrorKind::UnexpectedEof);
    }
}

#[test]
fn partial_output_before_error() {
    let data = stream(0, &[(u32::from(b'a'), 9), (u32::from(b'b'), 9), (400, 9)]);
    let mut decoder = Decoder::new();
    let mut out = vec![];
    let result = decoder.into_stream(&mut out).decode_all(data.as_slice());
    assert_eq!(out, b"ab");
    assert_eq!(result.bytes_written, 2);
    let err = result.status.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    assert!(err.to_string().contains("400"), "{}", err);
}

#[test]
fn invalid_codes() {
    let cases: &[&[(u32, u8)]] = &[
        // Multi-byte code before any entry exists.
        &[(300, 9), (END_CODE, 9)],
        // One past the code being defined.
        &[(97, 9), (98, 9), (259, 9), (END_CODE, 9)],
        // Far beyond the table after a few entries.
        &[(97, 9), (98, 9), (257, 9), (258, 9), (0x1ff, 9)],
    ];

    for codes in cases {
        let data = stream(0, codes);
        let mut decoder = Decoder::new();
        assert!(
            matches!(decoder.decode(&data), Err(LzwError::InvalidCode { .. })),
            "{:?}",
            codes
        );
        assert_eq!(stream_error(&data).kind(), io::ErrorKind::InvalidData);
    }
}

#[test]
fn fixed_width_mismatch() {
    // A dynamic stream read with the fixed width flag set sees garbage codes.
    let mut data = Encoder::new(Header::default()).encode(b"abcabcabc").unwrap();
    data[0] |= 0b0100_0000;
    let mut decoder = Decoder::new();
    assert!(decoder.decode(&data).is_err());
}

#[test]
fn trailing_data_is_ignored() {
    let mut data = Encoder::new(Header::default()).encode(b"abcabcabc").unwrap();
    let len = data.len();
    data.extend_from_slice(&[0xff; 16]);

    let mut decoder = Decoder::new();
    assert_eq!(decoder.decode(&data).unwrap(), b"abcabcabc");

    let mut out = vec![];
    let result = decoder.into_stream(&mut out).decode_all(data.as_slice());
    assert!(result.status.is_ok());
    assert_eq!(result.bytes_read, len);
    assert_eq!(out, b"abcabcabc");
}
