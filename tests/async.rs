use std::{env, fs};

use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};
use varlzw::{Decoder, Encoder, Header};

#[tokio::test]
async fn roundtrip_slices() {
    let data = fs::read("Cargo.toml").unwrap();
    let header = Header::default().with_reset(true);

    let mut encoder = Encoder::new(header);
    let mut compressed = Vec::<u8>::new().compat_write();
    let result = encoder
        .into_async(&mut compressed)
        .encode_all(data.as_slice().compat())
        .await;
    assert!(result.status.is_ok(), "{:?}", result.status);
    assert_eq!(result.bytes_read, data.len());
    let compressed = compressed.into_inner();
    assert_eq!(result.bytes_written, compressed.len());
    assert_eq!(compressed, Encoder::new(header).encode(&data).unwrap());

    let mut decoder = Decoder::new();
    let mut decompressed = Vec::<u8>::new().compat_write();
    let result = decoder
        .into_async(&mut decompressed)
        .decode_all(compressed.as_slice().compat())
        .await;
    assert!(result.status.is_ok(), "{:?}", result.status);
    assert_eq!(result.bytes_read, compressed.len());
    assert_eq!(decompressed.into_inner(), data);
    assert_eq!(encoder.stats(), decoder.stats());
}

#[tokio::test(flavor = "multi_thread")]
async fn roundtrip_pipe() {
    let file = env::args().next().unwrap();
    let data = fs::read(file).unwrap();
    let (writer, reader) = tokio::io::duplex(1 << 12);

    let mut encoder = Encoder::new(Header::default());
    let encode = encoder
        .into_async(writer.compat_write())
        .encode_all(data.as_slice().compat());

    let mut decoder = Decoder::new();
    let mut decompressed = Vec::<u8>::new().compat_write();
    let decode = decoder
        .into_async(&mut decompressed)
        .decode_all(tokio::io::BufReader::new(reader).compat());

    let (encoded, decoded) = tokio::join!(encode, decode);
    assert!(encoded.status.is_ok(), "{:?}", encoded.status);
    assert!(decoded.status.is_ok(), "{:?}", decoded.status);
    assert_eq!(encoded.bytes_written, decoded.bytes_read);
    assert!(decompressed.into_inner() == data);
}

#[tokio::test]
async fn corrupt_stream() {
    let data = Encoder::new(Header::default()).encode(b"abcabcabc").unwrap();
    let truncated = &data[..data.len() - 2];

    let mut decoder = Decoder::new();
    let mut out = Vec::<u8>::new().compat_write();
    let result = decoder
        .into_async(&mut out)
        .decode_all(truncated.compat())
        .await;
    let err = result.status.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
}
