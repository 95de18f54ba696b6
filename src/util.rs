//! Little-endian readers, rectangles and string helpers

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("Unexpected end of data at offset {offset} (wanted {wanted} bytes, {available} available)")]
    UnexpectedEof {
        offset: usize,
        wanted: usize,
        available: usize,
    },
}

pub fn read_le_u16(data: &[u8], offset: usize) -> Option<u16> {
    let b = data.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

pub fn read_le_i16(data: &[u8], offset: usize) -> Option<i16> {
    read_le_u16(data, offset).map(|v| v as i16)
}

pub fn read_le_u32(data: &[u8], offset: usize) -> Option<u32> {
    let b = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Cursor over a byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        if self.remaining() < len {
            return Err(ReadError::UnexpectedEof {
                offset: self.pos,
                wanted: len,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ReadError> {
        self.bytes(len).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, ReadError> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn i16(&mut self) -> Result<i16, ReadError> {
        self.u16().map(|v| v as i16)
    }

    pub fn u32(&mut self) -> Result<u32, ReadError> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// `u16` length followed by that many bytes, trailing NULs dropped.
    pub fn string16(&mut self) -> Result<String, ReadError> {
        let len = self.u16()? as usize;
        let raw = self.bytes(len)?;
        Ok(bytes_to_string(raw))
    }
}

/// Converts a NUL padded byte field to a `String`.
pub fn bytes_to_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Intersects `self` with `clip`. Returns `false` if nothing is left.
    pub fn clip_to(&mut self, clip: &Rect) -> bool {
        let x1 = self.x.max(clip.x);
        let y1 = self.y.max(clip.y);
        let x2 = (self.x + self.w).min(clip.x + clip.w);
        let y2 = (self.y + self.h).min(clip.y + clip.h);
        if x2 <= x1 || y2 <= y1 {
            self.w = 0;
            self.h = 0;
            return false;
        }
        *self = Rect::new(x1, y1, x2 - x1, y2 - y1);
        true
    }
}

pub fn string_ends_with_ignore_case(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len()
        && s.is_char_boundary(s.len() - suffix.len())
        && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_reader() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 3, 0, b'a', b'b', 0];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.u16().unwrap(), 0x1234);
        assert_eq!(r.u32().unwrap(), 0x1234_5678);
        assert_eq!(r.string16().unwrap(), "ab");
        assert!(r.is_empty());
        assert!(matches!(r.u8(), Err(ReadError::UnexpectedEof { offset: 11, .. })));
    }

    #[test]
    fn test_rect_clip() {
        let clip = Rect::new(0, 0, 640, 480);
        let mut r = Rect::new(-10, 470, 20, 20);
        assert!(r.clip_to(&clip));
        assert_eq!(r, Rect::new(0, 470, 10, 10));

        let mut outside = Rect::new(700, 0, 10, 10);
        assert!(!outside.clip_to(&clip));
    }

    #[test]
    fn test_string_helpers() {
        assert!(string_ends_with_ignore_case("C1_01.scn", ".SCN"));
        assert!(!string_ends_with_ignore_case("a", ".SCN"));
        assert_eq!(bytes_to_string(b"NAME\0\0junk"), "NAME");
    }
}
