//! Bit streams of code words, most significant bit first.
//!
//! Both sides keep up to 64 bits in a register. The writer hands whole bytes to the inner writer
//! as soon as half of the register is used, the reader refills it from a `BufRead` whenever a
//! request can not be served from the register alone.
use crate::Code;

use std::io::{self, BufRead, Write};

/// Packs code words into bytes.
///
/// Call [`close`] when done, otherwise the last partial byte is lost.
///
/// [`close`]: #method.close
///
/// ```
/// use varlzw::bits::{BitReader, BitWriter};
///
/// let mut writer = BitWriter::new(vec![]);
/// writer.write_bits(0b1_0000_0000, 9).unwrap();
/// writer.close().unwrap();
/// let bytes = writer.into_inner();
/// assert_eq!(bytes, [0b1000_0000, 0]);
///
/// let mut reader = BitReader::new(&bytes[..]);
/// assert_eq!(reader.read_bits(9).unwrap(), Some(256));
/// ```
pub struct BitWriter<W> {
    inner: W,
    /// The buffer bits, aligned to the most significant end.
    buffer: u64,
    /// The number of valid buffer bits.
    bits_in_buffer: u8,
    /// Bytes handed to the inner writer so far.
    written: usize,
}

/// Unpacks code words from bytes.
pub struct BitReader<R> {
    inner: R,
    /// The buffer bits, aligned to the most significant end.
    buffer: u64,
    /// The number of valid buffer bits.
    bits_in_buffer: u8,
    /// Bytes taken from the inner reader so far.
    consumed: usize,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        BitWriter {
            inner,
            buffer: 0,
            bits_in_buffer: 0,
            written: 0,
        }
    }

    /// Append the lowest `count` bits of `value`.
    ///
    /// `count` must be at most 32 and `value` must fit into it.
    pub fn write_bits(&mut self, value: Code, count: u8) -> io::Result<()> {
        debug_assert!(count <= 32);
        debug_assert!(count == 32 || value >> count == 0, "{} exceeds {} bits", value, count);
        if count == 0 {
            return Ok(());
        }

        let shift = 64 - self.bits_in_buffer - count;
        self.buffer |= u64::from(value) << shift;
        self.bits_in_buffer += count;

        if self.bits_in_buffer >= 32 {
            self.push_out(usize::from(self.bits_in_buffer / 8))?;
        }

        Ok(())
    }

    pub fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.write_bits(Code::from(byte), 8)
    }

    /// The number of bytes handed to the inner writer.
    pub fn bytes_written(&self) -> usize {
        self.written
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Pad the last byte with zero bits, write it and flush the inner writer.
    pub fn close(&mut self) -> io::Result<()> {
        let to_byte = self.bits_in_buffer.wrapping_neg() & 0x7;
        self.bits_in_buffer += to_byte;
        self.push_out(usize::from(self.bits_in_buffer / 8))?;
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn push_out(&mut self, count: usize) -> io::Result<()> {
        if count == 0 {
            return Ok(());
        }

        let bytes = self.buffer.to_be_bytes();
        self.inner.write_all(&bytes[..count])?;
        // At most 7 bytes leave at once, the shift stays in range.
        self.buffer <<= 8 * count;
        self.bits_in_buffer -= 8 * count as u8;
        self.written += count;
        Ok(())
    }
}

impl<R: BufRead> BitReader<R> {
    pub fn new(inner: R) -> Self {
        BitReader {
            inner,
            buffer: 0,
            bits_in_buffer: 0,
            consumed: 0,
        }
    }

    /// Take the next `count` bits, at most 32.
    ///
    /// Returns `None` if the stream ends before `count` bits are available. The bits that were
    /// available stay in the reader.
    pub fn read_bits(&mut self, count: u8) -> io::Result<Option<Code>> {
        debug_assert!(count <= 32);
        if count == 0 {
            return Ok(Some(0));
        }

        if self.bits_in_buffer < count {
            self.refill()?;
            if self.bits_in_buffer < count {
                return Ok(None);
            }
        }

        let value = (self.buffer >> (64 - count)) as Code;
        self.buffer <<= count;
        self.bits_in_buffer -= count;
        Ok(Some(value))
    }

    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.read_bits(8)?.map(|byte| byte as u8))
    }

    /// Check if all bits have been read.
    pub fn at_end(&mut self) -> io::Result<bool> {
        if self.bits_in_buffer > 0 {
            return Ok(false);
        }

        self.refill()?;
        Ok(self.bits_in_buffer == 0)
    }

    /// The number of bytes touched by the bits read so far.
    ///
    /// Bytes that were buffered ahead but not yet needed are not counted.
    pub fn bytes_consumed(&self) -> usize {
        self.consumed - usize::from(self.bits_in_buffer / 8)
    }

    fn refill(&mut self) -> io::Result<()> {
        while self.bits_in_buffer <= 56 {
            let data = match self.inner.fill_buf() {
                Ok(data) => data,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };

            if data.is_empty() {
                break;
            }

            let wish_count = usize::from((64 - self.bits_in_buffer) / 8);
            let count = wish_count.min(data.len());
            for &byte in &data[..count] {
                self.buffer |= u64::from(byte) << (56 - self.bits_in_buffer);
                self.bits_in_buffer += 8;
            }

            self.inner.consume(count);
            self.consumed += count;
        }

        Ok(())
    }
}
