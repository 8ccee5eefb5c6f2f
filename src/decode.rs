//! A module for all decoding needs.
use crate::bits::BitReader;
use crate::width::{CodeSize, Growth};
use crate::{Code, Header, LzwError, Stats, END_CODE, MAX_ENTRIES};

use std::io::{self, BufRead, Write};

/// The state for decoding data with an LZW algorithm.
///
/// The header of each stream determines its code sizes, a decoder needs no configuration.
pub struct Decoder {
    header: Option<Header>,
    stats: Stats,
}

/// A decoding stream sink.
///
/// See [`Decoder::into_stream`] on how to create this type and more information.
///
/// [`Decoder::into_stream`]: struct.Decoder.html#method.into_stream
pub struct IntoStream<'d, W> {
    decoder: &'d mut Decoder,
    writer: W,
}

/// An async decoding sink.
///
/// See [`Decoder::into_async`] on how to create this type and more information.
///
/// [`Decoder::into_async`]: struct.Decoder.html#method.into_async
#[cfg(feature = "async")]
pub struct IntoAsync<'d, W> {
    decoder: &'d mut Decoder,
    writer: W,
}

/// The result of coding a whole stream.
pub struct AllResult {
    /// The total number of bytes consumed from the reader.
    pub bytes_read: usize,
    /// The total number of bytes written into the writer.
    pub bytes_written: usize,
    /// The possible error that occurred.
    ///
    /// Truncated streams are reported as `UnexpectedEof`, codes without a table entry as
    /// `InvalidData`, with an [`LzwError`] as the inner error.
    ///
    /// [`LzwError`]: ../enum.LzwError.html
    pub status: io::Result<()>,
}

#[derive(Clone, Copy)]
struct Link {
    prefix: Code,
    byte: u8,
}

/// The strings of all codes, as links to the string of their prefix code.
///
/// Base codes and the entry created by a reset are marked by `END_CODE` as their prefix.
struct Table {
    inner: Vec<Link>,
    depths: Vec<u32>,
    /// The string of the entry created by the last reset.
    ///
    /// Its prefix belongs to the dictionary that was discarded, so it is kept in full.
    seed: Vec<u8>,
}

struct DecodeState {
    header: Header,

    /// The code size state, shared in behaviour with the encoder.
    size: CodeSize,

    /// The table of decoded codes.
    table: Table,

    /// The string of the last code.
    val: Vec<u8>,

    /// The string of the code being decoded.
    next: Vec<u8>,

    /// The last code, `None` until the first code has been read.
    last: Option<Code>,

    has_ended: bool,

    /// If running out of codes has been logged.
    saturated: bool,

    stats: Stats,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder {
            header: None,
            stats: Stats::default(),
        }
    }

    /// The header of the last stream, if it could be read.
    pub fn header(&self) -> Option<Header> {
        self.header
    }

    /// Counters of the last stream decoded.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Decode a complete stream from a slice.
    ///
    /// Any data after the end code is ignored.
    pub fn decode(&mut self, data: &[u8]) -> Result<Vec<u8>, LzwError> {
        let mut out = Vec::with_capacity(2 * data.len());
        let mut bits = BitReader::new(data);
        let mut written = 0;
        self.decode_part(&mut bits, &mut out, &mut written)?;
        Ok(out)
    }

    /// Construct a decoder into a writer.
    pub fn into_stream<W: Write>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            decoder: self,
            writer,
        }
    }

    /// Construct a decoder into an async writer.
    #[cfg(feature = "async")]
    pub fn into_async<W: futures::io::AsyncWrite + core::marker::Unpin>(
        &mut self,
        writer: W,
    ) -> IntoAsync<'_, W> {
        IntoAsync {
            decoder: self,
            writer,
        }
    }

    fn decode_part<R: BufRead, W: Write>(
        &mut self,
        bits: &mut BitReader<R>,
        writer: &mut W,
        written: &mut usize,
    ) -> Result<(), LzwError> {
        self.header = None;
        let mut state = DecodeState::start(bits)?;
        self.header = Some(state.header);

        let result = (|| -> Result<(), LzwError> {
            while let Some(string) = state.advance(bits)? {
                writer.write_all(string)?;
                *written += string.len();
            }
            Ok(())
        })();

        self.stats = state.stats;
        result
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new()
    }
}

impl<W: Write> IntoStream<'_, W> {
    /// Decode data from a reader until the end code.
    ///
    /// The reader may be advanced beyond the end code by a few bytes, `bytes_read` of the result
    /// only counts the bytes of the stream. The writer is flushed at the end.
    pub fn decode_all(self, read: impl BufRead) -> AllResult {
        let IntoStream {
            decoder,
            mut writer,
        } = self;

        let mut bits = BitReader::new(read);
        let mut bytes_written = 0;
        let status = decoder
            .decode_part(&mut bits, &mut writer, &mut bytes_written)
            .and_then(|()| writer.flush().map_err(LzwError::from))
            .map_err(io::Error::from);

        AllResult {
            bytes_read: bits.bytes_consumed(),
            bytes_written,
            status,
        }
    }
}

#[cfg(feature = "async")]
impl<W: futures::io::AsyncWrite + core::marker::Unpin> IntoAsync<'_, W> {
    /// Decode data from an async reader until the end code.
    ///
    /// The reader is drained completely before decoding. Decoded data is written in chunks.
    pub async fn decode_all(
        self,
        mut read: impl futures::io::AsyncBufRead + core::marker::Unpin,
    ) -> AllResult {
        use futures::io::{AsyncReadExt, AsyncWriteExt};
        const CHUNK: usize = 1 << 16;

        let IntoAsync {
            decoder,
            mut writer,
        } = self;

        let mut input = vec![];
        let mut bytes_read = 0;
        let mut bytes_written = 0;

        let status: io::Result<()> = async {
            read.read_to_end(&mut input).await?;
            let mut bits = BitReader::new(input.as_slice());

            decoder.header = None;
            let mut state = DecodeState::start(&mut bits)?;
            decoder.header = Some(state.header);

            let mut chunk = Vec::with_capacity(CHUNK);
            let result = loop {
                match state.advance(&mut bits) {
                    Ok(Some(string)) => chunk.extend_from_slice(string),
                    Ok(None) => break Ok(()),
                    Err(err) => break Err(err),
                }

                if chunk.len() >= CHUNK {
                    writer.write_all(&chunk).await?;
                    bytes_written += chunk.len();
                    chunk.clear();
                }
            };

            decoder.stats = state.stats;
            bytes_read = bits.bytes_consumed();
            result?;

            writer.write_all(&chunk).await?;
            bytes_written += chunk.len();
            writer.flush().await
        }
        .await;

        AllResult {
            bytes_read,
            bytes_written,
            status,
        }
    }
}

impl DecodeState {
    fn start<R: BufRead>(bits: &mut BitReader<R>) -> Result<Self, LzwError> {
        let header = Header::read(bits)?;
        log::trace!("decoding with {:?}", header);
        let size = CodeSize::new(header);
        Ok(DecodeState {
            header,
            size,
            table: Table::new(),
            val: vec![],
            next: vec![],
            last: None,
            has_ended: false,
            saturated: false,
            stats: Stats {
                code_size: size.width(),
                ..Stats::default()
            },
        })
    }

    /// Decode the next code, returning its string or `None` once the end code was read.
    fn advance<R: BufRead>(&mut self, bits: &mut BitReader<R>) -> Result<Option<&[u8]>, LzwError> {
        if self.has_ended {
            return Ok(None);
        }

        let last = match self.last {
            None => return self.first_code(bits),
            Some(last) => last,
        };

        // The encoder created an entry after writing the last code. Its code size for this code
        // already includes the effect of that entry.
        let growth = self.size.growth(self.table.next_code());
        let code = self.read_code(bits, self.size.width_for(growth))?;
        if code == END_CODE {
            return Ok(self.end());
        }

        match growth {
            Growth::Append => {}
            Growth::Widen => {
                log::debug!(
                    "code size {} -> {} at code {}",
                    self.size.width(),
                    self.size.width() + 1,
                    self.table.next_code()
                );
                self.stats.widenings += 1;
            }
            Growth::Reset => {
                log::debug!(
                    "dictionary full at {} bits, resetting after {} codes",
                    self.size.width(),
                    self.stats.codes
                );
                self.table.clear();
                self.stats.resets += 1;
            }
            Growth::Full => {
                if !self.saturated {
                    log::debug!("dictionary full at {} bits, no more entries", self.size.width());
                    self.saturated = true;
                }
            }
        }
        self.size.apply(growth);

        let next_code = self.table.next_code();
        if growth != Growth::Full && code == next_code {
            // The code is the entry created by this very step: the last string followed by its
            // own first character.
            self.next.clear();
            self.next.extend_from_slice(&self.val);
            self.next.push(self.val[0]);
        } else if self.table.contains(code) {
            self.table.reconstruct(code, &mut self.next);
        } else {
            return Err(LzwError::InvalidCode {
                code,
                next: next_code,
            });
        }

        let first = self.next[0];
        match growth {
            Growth::Full => {}
            Growth::Reset => self.table.seed(&self.val, first),
            Growth::Append | Growth::Widen => self.table.derive(last, first),
        }
        if growth != Growth::Full {
            self.stats.entries += 1;
        }

        core::mem::swap(&mut self.val, &mut self.next);
        self.last = Some(code);
        self.stats.codes += 1;
        self.stats.code_size = self.size.width();
        Ok(Some(self.val.as_slice()))
    }

    fn first_code<R: BufRead>(&mut self, bits: &mut BitReader<R>) -> Result<Option<&[u8]>, LzwError> {
        let code = self.read_code(bits, self.size.width())?;
        if code == END_CODE {
            return Ok(self.end());
        }

        // Only the single bytes are defined at this point.
        self.val = match self.table.lookup(code) {
            Some(string) => string,
            None => {
                return Err(LzwError::InvalidCode {
                    code,
                    next: self.table.next_code(),
                })
            }
        };

        self.last = Some(code);
        self.stats.codes += 1;
        Ok(Some(self.val.as_slice()))
    }

    fn end(&mut self) -> Option<&[u8]> {
        self.has_ended = true;
        log::trace!("decoded {:?}", self.stats);
        None
    }

    fn read_code<R: BufRead>(&mut self, bits: &mut BitReader<R>, width: u8) -> Result<Code, LzwError> {
        bits.read_bits(width)?.ok_or(LzwError::Truncated { width })
    }
}

impl Table {
    fn new() -> Self {
        let mut table = Table {
            inner: Vec::with_capacity(MAX_ENTRIES),
            depths: Vec::with_capacity(MAX_ENTRIES),
            seed: vec![],
        };
        table.clear();
        table
    }

    fn clear(&mut self) {
        self.inner.clear();
        self.depths.clear();
        self.seed.clear();
        for byte in 0..=255u8 {
            self.inner.push(Link::base(byte));
            self.depths.push(1);
        }
        // End code.
        self.inner.push(Link::base(0));
        self.depths.push(0);
    }

    fn next_code(&self) -> Code {
        self.inner.len() as Code
    }

    fn contains(&self, code: Code) -> bool {
        code != END_CODE && (code as usize) < self.inner.len()
    }

    fn lookup(&self, code: Code) -> Option<Vec<u8>> {
        if !self.contains(code) {
            return None;
        }

        let mut string = vec![];
        self.reconstruct(code, &mut string);
        Some(string)
    }

    /// Write the string of a known code into `out`, replacing its contents.
    fn reconstruct(&self, code: Code, out: &mut Vec<u8>) {
        let depth = self.depths[code as usize] as usize;
        out.clear();
        out.resize(depth, 0);

        let mut code = code;
        let mut remaining = depth;
        loop {
            let link = self.inner[code as usize];
            if code < END_CODE {
                out[remaining - 1] = link.byte;
                break;
            }

            if link.prefix == END_CODE {
                out[..remaining].copy_from_slice(&self.seed);
                break;
            }

            remaining -= 1;
            out[remaining] = link.byte;
            code = link.prefix;
        }
    }

    fn derive(&mut self, prefix: Code, byte: u8) {
        let depth = self.depths[prefix as usize] + 1;
        self.inner.push(Link { prefix, byte });
        self.depths.push(depth);
    }

    /// Add an entry whose prefix is not in the table.
    fn seed(&mut self, prefix: &[u8], byte: u8) {
        self.seed.clear();
        self.seed.extend_from_slice(prefix);
        self.seed.push(byte);
        self.inner.push(Link {
            prefix: END_CODE,
            byte,
        });
        self.depths.push(self.seed.len() as u32);
    }
}

impl Link {
    fn base(byte: u8) -> Self {
        Link {
            prefix: END_CODE,
            byte,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Decoder, Table};
    use crate::bits::BitWriter;
    use crate::{LzwError, END_CODE};

    fn stream(header: u32, codes: &[(u32, u8)]) -> Vec<u8> {
        let mut writer = BitWriter::new(vec![]);
        writer.write_bits(header, 2).unwrap();
        for &(code, width) in codes {
            writer.write_bits(code, width).unwrap();
        }
        writer.close().unwrap();
        writer.into_inner()
    }

    #[test]
    fn table_links() {
        let mut table = Table::new();
        assert_eq!(table.next_code(), 257);
        assert_eq!(table.lookup(u32::from(b'a')), Some(b"a".to_vec()));
        assert_eq!(table.lookup(END_CODE), None);
        assert_eq!(table.lookup(257), None);

        table.derive(u32::from(b'a'), b'b');
        table.derive(257, b'c');
        assert_eq!(table.lookup(257), Some(b"ab".to_vec()));
        assert_eq!(table.lookup(258), Some(b"abc".to_vec()));
    }

    #[test]
    fn table_seed() {
        let mut table = Table::new();
        table.seed(b"xyz", b'x');
        table.derive(257, b'q');
        assert_eq!(table.lookup(257), Some(b"xyzx".to_vec()));
        assert_eq!(table.lookup(258), Some(b"xyzxq".to_vec()));

        table.clear();
        assert_eq!(table.next_code(), 257);
        assert_eq!(table.lookup(257), None);
    }

    #[test]
    fn decodes_codes() {
        let data = stream(0, &[(97, 9), (98, 9), (257, 9), (END_CODE, 9)]);
        let mut decoder = Decoder::new();
        assert_eq!(decoder.decode(&data).unwrap(), b"abab");
        let stats = decoder.stats();
        assert_eq!(stats.codes, 3);
        assert_eq!(stats.entries, 2);
    }

    #[test]
    fn self_reference() {
        // "aaaa": a, then the code being defined ("aa"), then a.
        let data = stream(0, &[(97, 9), (257, 9), (97, 9), (END_CODE, 9)]);
        let mut decoder = Decoder::new();
        assert_eq!(decoder.decode(&data).unwrap(), b"aaaa");
    }

    #[test]
    fn empty_stream() {
        let data = stream(0b01, &[(END_CODE, 12)]);
        let mut decoder = Decoder::new();
        assert_eq!(decoder.decode(&data).unwrap(), b"");
        let header = decoder.header().unwrap();
        assert!(header.fixed_width);
        assert!(!header.allow_reset);
    }

    #[test]
    fn code_ahead_of_table() {
        let data = stream(0, &[(97, 9), (258, 9), (END_CODE, 9)]);
        let mut decoder = Decoder::new();
        match decoder.decode(&data) {
            Err(LzwError::InvalidCode { code: 258, next: 257 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn first_code_must_be_a_byte() {
        let data = stream(0, &[(257, 9), (END_CODE, 9)]);
        let mut decoder = Decoder::new();
        assert!(matches!(
            decoder.decode(&data),
            Err(LzwError::InvalidCode { code: 257, .. })
        ));
    }

    #[test]
    fn missing_end_code() {
        let data = stream(0, &[(97, 9), (98, 9)]);
        let mut decoder = Decoder::new();
        assert!(matches!(
            decoder.decode(&data),
            Err(LzwError::Truncated { width: 9 })
        ));
    }
}
