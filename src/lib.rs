//! # Variable-width LZW decoder and encoder
//!
//! This crate provides an [`Encoder`] and a [`Decoder`] for an LZW variant whose code words
//! grow from 9 to 16 bits as the dictionary fills. When the dictionary is full at 16 bits it
//! either stops growing or, if the stream allows it, starts over from the 256 single bytes.
//! Code words are packed most significant bit first.
//!
//! A stream starts with a two bit header and ends with an end code:
//!
//!  * bit 0: dictionary resets are allowed,
//!  * bit 1: all code words have the static width of 12 bits,
//!  * `END_CODE == 256`, written with the width in force at the end of the stream.
//!
//! There is no magic number, length prefix or checksum.
//!
//! Examplary use:
//!
//! ```
//! use varlzw::{Header, encode::Encoder, decode::Decoder};
//! let data = b"TOBEORNOTTOBEORTOBEORNOT";
//!
//! let mut enc = Encoder::new(Header::default().with_reset(true));
//! let compressed = enc.encode(&data[..]).unwrap();
//!
//! let mut dec = Decoder::new();
//! let decompressed = dec.decode(&compressed).unwrap();
//! assert_eq!(decompressed, &data[..]);
//! ```
//!
//! [`Encoder`]: encode/struct.Encoder.html
//! [`Decoder`]: decode/struct.Decoder.html
use std::io;

/// Code marking the end of a stream. It is never assigned to a string.
pub const END_CODE: Code = 256;
/// The first code assigned to a multi-byte string.
pub const FIRST_CODE: Code = END_CODE + 1;
/// Initial code size of a dynamic stream.
pub const MIN_CODESIZE: u8 = 9;
/// Largest code size of a dynamic stream.
pub const MAX_CODESIZE: u8 = 16;
/// Code size of a stream with the fixed width flag.
pub const STATIC_CODESIZE: u8 = 12;

pub(crate) const MAX_ENTRIES: usize = 1 << MAX_CODESIZE as usize;

/// Alias for a LZW code point.
///
/// Codes fit into 16 bits but the counter of the next free code reaches `1 << 16`.
pub type Code = u32;

/// The two flags leading every compressed stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Header {
    /// Start over with a fresh dictionary once it is full at the maximum width.
    pub allow_reset: bool,
    /// Use 12 bit code words for the whole stream.
    pub fixed_width: bool,
}

/// Counters describing the last stream processed by an encoder or decoder.
///
/// Encoding and then decoding a stream yields the same numbers on both sides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Code words emitted or read, not counting the end code.
    pub codes: u64,
    /// Dictionary entries created.
    pub entries: u64,
    /// How often the code size was incremented.
    pub widenings: u32,
    /// How often the dictionary was reset.
    pub resets: u32,
    /// The code size in force at the end of the stream.
    pub code_size: u8,
}

/// The error type of the de- and encoder.
#[derive(Debug, thiserror::Error)]
pub enum LzwError {
    /// The stream ended before both header bits were read.
    #[error("stream ended inside the header")]
    TruncatedHeader,
    /// The stream ended before the end code.
    #[error("stream ended before the end code (expected a {width} bit code)")]
    Truncated { width: u8 },
    /// A code that has no dictionary entry at this point of the stream.
    #[error("invalid code {code}, the next free code is {next}")]
    InvalidCode { code: Code, next: Code },
    /// The underlying reader or writer failed.
    #[error(transparent)]
    Io(io::Error),
}

impl Header {
    /// Set whether the dictionary may be reset.
    pub fn with_reset(self, allow_reset: bool) -> Self {
        Header { allow_reset, ..self }
    }

    /// Set whether code words keep a static width.
    pub fn with_fixed_width(self, fixed_width: bool) -> Self {
        Header { fixed_width, ..self }
    }

    /// The code size at the start of the stream and after each reset.
    pub fn min_code_size(&self) -> u8 {
        if self.fixed_width {
            STATIC_CODESIZE
        } else {
            MIN_CODESIZE
        }
    }

    /// The largest code size of the stream.
    pub fn max_code_size(&self) -> u8 {
        if self.fixed_width {
            STATIC_CODESIZE
        } else {
            MAX_CODESIZE
        }
    }

    pub(crate) fn write<W: io::Write>(&self, bits: &mut bits::BitWriter<W>) -> io::Result<()> {
        bits.write_bits(Code::from(self.allow_reset), 1)?;
        bits.write_bits(Code::from(self.fixed_width), 1)
    }

    pub(crate) fn read<R: io::BufRead>(bits: &mut bits::BitReader<R>) -> Result<Self, LzwError> {
        match bits.read_bits(2)? {
            Some(flags) => Ok(Header {
                allow_reset: flags & 0b10 != 0,
                fixed_width: flags & 0b01 != 0,
            }),
            None => Err(LzwError::TruncatedHeader),
        }
    }
}

impl From<io::Error> for LzwError {
    fn from(err: io::Error) -> Self {
        LzwError::Io(err)
    }
}

impl From<LzwError> for io::Error {
    fn from(err: LzwError) -> Self {
        match err {
            LzwError::Io(err) => err,
            err @ LzwError::TruncatedHeader | err @ LzwError::Truncated { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            err @ LzwError::InvalidCode { .. } => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

pub mod bits;
pub mod decode;
pub mod encode;
mod width;

pub use crate::decode::Decoder;
pub use crate::encode::Encoder;

#[cfg(test)]
mod tests {
    use super::{bits, Header, LzwError};
    use std::io;

    #[test]
    fn header_bits_order() {
        let header = Header::default().with_reset(true);
        let mut writer = bits::BitWriter::new(vec![]);
        header.write(&mut writer).unwrap();
        writer.close().unwrap();
        assert_eq!(writer.into_inner(), [0b1000_0000]);

        let header = Header::default().with_fixed_width(true);
        let mut writer = bits::BitWriter::new(vec![]);
        header.write(&mut writer).unwrap();
        writer.close().unwrap();
        let out = writer.into_inner();
        assert_eq!(out, [0b0100_0000]);

        let mut reader = bits::BitReader::new(&out[..]);
        assert_eq!(Header::read(&mut reader).unwrap(), header);
    }

    #[test]
    fn header_widths() {
        let dynamic = Header::default();
        assert_eq!((dynamic.min_code_size(), dynamic.max_code_size()), (9, 16));
        let fixed = Header::default().with_fixed_width(true);
        assert_eq!((fixed.min_code_size(), fixed.max_code_size()), (12, 12));
    }

    #[test]
    fn empty_header_is_truncated() {
        let mut reader = bits::BitReader::new(&[0u8; 0][..]);
        assert!(matches!(Header::read(&mut reader), Err(LzwError::TruncatedHeader)));
    }

    #[test]
    fn error_kinds() {
        let err: io::Error = LzwError::Truncated { width: 9 }.into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        let err: io::Error = LzwError::InvalidCode { code: 300, next: 258 }.into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let err: io::Error = LzwError::Io(io::ErrorKind::BrokenPipe.into()).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
