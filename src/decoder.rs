//! Resource decompression
//!
//! Compressed resources start with the decoded size (`u32`). The original
//! data uses a block based LZSS variant, some repacked data sets use zlib.

use flate2::read::ZlibDecoder;
use std::io::Read;
use thiserror::Error;

use crate::util::{read_le_u16, read_le_u32};

const BLOCK_SIZE: usize = 0x1000;

/// Largest decoded resource accepted, well above a full screen bitmap.
pub const MAX_DECODED_SIZE: usize = 16 << 20;

// Best case LZSS expansion: a long match with a length byte yields 256
// bytes from 3.25 input bytes.
const LZSS_MAX_RATIO: usize = 80;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Compressed data too short ({0} bytes)")]
    TruncatedHeader(usize),

    #[error("Compressed data truncated at offset {0}")]
    Truncated(usize),

    #[error("Invalid checksum, expected 0x{expected:X} got 0x{actual:X}")]
    Checksum { expected: u16, actual: u16 },

    #[error("Back reference {distance} before start of output ({produced} bytes)")]
    InvalidReference { distance: usize, produced: usize },

    #[error("Decoded data exceeds declared size {0}")]
    OutputOverflow(usize),

    #[error("Declared size {declared} cannot be produced from {input} bytes (limit {limit})")]
    DeclaredSize { declared: usize, input: usize, limit: usize },

    #[error("zlib error: {0}")]
    Zlib(#[from] std::io::Error),
}

struct BitStream<'a> {
    data: &'a [u8],
    pos: usize,
    bits: u16,
    len: u32,
}

impl<'a> BitStream<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        let mut stream = Self { data, pos, bits: 0, len: 0 };
        stream.refill();
        stream
    }

    // the last refill of a block may run past the data, it is never consumed
    fn refill(&mut self) {
        self.bits = read_le_u16(self.data, self.pos).unwrap_or(0);
        self.pos += 2;
        self.len = 16;
    }

    fn next_bit(&mut self) -> bool {
        let carry = (self.bits & 1) == 1;
        self.bits >>= 1;
        self.len -= 1;
        if self.len == 0 {
            self.refill();
        }
        carry
    }

    fn next_byte(&mut self) -> Result<u8, DecodeError> {
        let b = *self.data.get(self.pos).ok_or(DecodeError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn next_word(&mut self) -> Result<u16, DecodeError> {
        let w = read_le_u16(self.data, self.pos).ok_or(DecodeError::Truncated(self.pos))?;
        self.pos += 2;
        Ok(w)
    }
}

/// Rotate-xor sum of `count` words starting at `pos`.
pub fn block_checksum(data: &[u8], pos: usize, count: usize) -> Option<u16> {
    let mut sum: u16 = 0;
    for i in 0..count {
        sum = ((sum & 1) << 15) | (sum >> 1);
        sum ^= read_le_u16(data, pos + i * 2)?;
    }
    Some(sum)
}

fn check_declared_size(declared: usize, input: usize, ratio: usize) -> Result<(), DecodeError> {
    let limit = input.saturating_mul(ratio).min(MAX_DECODED_SIZE);
    if declared > limit {
        return Err(DecodeError::DeclaredSize { declared, input, limit });
    }
    Ok(())
}

/// Declared output size of a compressed buffer.
pub fn decoded_size(src: &[u8]) -> Option<usize> {
    read_le_u32(src, 0).map(|v| v as usize)
}

/// Decodes an LZSS buffer: `u32` output size, `u32` input size in units of
/// 16 bytes, then 4 KiB blocks each starting with a checksum word.
pub fn decode_lzss(src: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let output_size = read_le_u32(src, 0).ok_or(DecodeError::TruncatedHeader(src.len()))? as usize;
    let mut input_size = read_le_u32(src, 4).ok_or(DecodeError::TruncatedHeader(src.len()))? as usize;
    check_declared_size(output_size, src.len(), LZSS_MAX_RATIO)?;
    let mut out: Vec<u8> = Vec::with_capacity(output_size);
    let mut block = 8;
    'blocks: while input_size != 0 {
        let decode_size = input_size.min(256);
        input_size -= decode_size;

        let expected = read_le_u16(src, block).ok_or(DecodeError::Truncated(block))?;
        let actual = block_checksum(src, block + 2, decode_size * 8 - 1)
            .ok_or(DecodeError::Truncated(block))?;
        if expected != actual {
            return Err(DecodeError::Checksum { expected, actual });
        }

        let mut stream = BitStream::new(src, block + 2);
        loop {
            if out.len() > output_size {
                return Err(DecodeError::OutputOverflow(output_size));
            }
            if stream.next_bit() {
                out.push(stream.next_byte()?);
                continue;
            }
            let size: usize;
            let offset: u16;
            if stream.next_bit() {
                let code = stream.next_word()?;
                offset = 0xE000 | ((code >> 3) & 0x1F00) | (code & 0xFF);
                if code & 0x700 != 0 {
                    size = (((code >> 8) & 7) + 2) as usize;
                } else {
                    match stream.next_byte()? {
                        0 => break 'blocks,
                        1 => continue,
                        2 => break,
                        n => size = n as usize + 1,
                    }
                }
            } else {
                let mut n = 0usize;
                for _ in 0..2 {
                    n <<= 1;
                    if stream.next_bit() {
                        n |= 1;
                    }
                }
                size = n + 2;
                offset = 0xFF00 | stream.next_byte()? as u16;
            }
            let distance = (offset as i16).unsigned_abs() as usize;
            if distance > out.len() {
                return Err(DecodeError::InvalidReference {
                    distance,
                    produced: out.len(),
                });
            }
            // the source may overlap the bytes being written
            for _ in 0..size {
                let b = out[out.len() - distance];
                out.push(b);
            }
        }
        block += BLOCK_SIZE;
    }
    if out.len() > output_size {
        return Err(DecodeError::OutputOverflow(output_size));
    }
    if out.len() < output_size {
        tracing::warn!(target: "bermuda::resource", produced = out.len(), expected = output_size, "short LZSS output");
        out.resize(output_size, 0);
    }
    Ok(out)
}

/// Decodes a zlib buffer: `u32` output size followed by a zlib stream.
pub fn decode_zlib(src: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let output_size = read_le_u32(src, 0).ok_or(DecodeError::TruncatedHeader(src.len()))? as usize;
    check_declared_size(output_size, src.len(), usize::MAX)?;
    let mut out = Vec::with_capacity(output_size);
    ZlibDecoder::new(&src[4..]).take(output_size as u64 + 1).read_to_end(&mut out)?;
    if out.len() > output_size {
        return Err(DecodeError::OutputOverflow(output_size));
    }
    if out.len() < output_size {
        tracing::warn!(target: "bermuda::resource", produced = out.len(), expected = output_size, "short zlib output");
        out.resize(output_size, 0);
    }
    Ok(out)
}
