//! Tokenizer for the SCN and DLG text formats
//!
//! Both formats are DOS text files (CRLF, Latin-1). Comments are blanked in
//! place before tokenizing so that offsets stay meaningful.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Parse error for integer '{0}'")]
    Integer(String),

    #[error("Parse error for array index '{0}'")]
    ArrayIndex(String),

    #[error("Parse error for coord '{0}'")]
    Coord(String),
}

/// Backquotes show up in some scene files and are treated as blanks.
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x60)
}

/// Blanks comments in `buf`:
/// - tabs become spaces,
/// - `//` up to the end of the line,
/// - whole lines whose first non blank character is `;` or `/`.
pub fn strip_comments(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        if *b == b'\t' {
            *b = b' ';
        }
    }
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'/' && buf[i + 1] == b'/' {
            while i < buf.len() && !at_eol(buf, i) {
                buf[i] = b' ';
                i += 1;
            }
        } else {
            i += 1;
        }
    }
    let mut line_start = 0;
    while line_start < buf.len() {
        let line_end = find_eol(buf, line_start).unwrap_or(buf.len());
        let first = (line_start..line_end).find(|&j| !is_whitespace(buf[j]));
        if let Some(first) = first {
            if buf[first] == b';' || buf[first] == b'/' {
                for b in &mut buf[first..line_end] {
                    if *b != b'\r' {
                        *b = b' ';
                    }
                }
            }
        }
        line_start = line_end + 1;
    }
}

fn at_eol(buf: &[u8], i: usize) -> bool {
    buf[i] == b'\n' || (buf[i] == b'\r' && buf.get(i + 1) == Some(&b'\n'))
}

fn find_eol(buf: &[u8], from: usize) -> Option<usize> {
    buf[from..].iter().position(|&b| b == b'\n').map(|p| from + p)
}

/// Latin-1 to `String`, byte for byte.
pub fn decode_latin1(buf: &[u8]) -> String {
    buf.iter().map(|&b| b as char).collect()
}

/// Parses an integer prefix like `strtol(s, 0, 0)`: optional sign, then
/// `0x` hexadecimal, leading `0` octal or decimal. Leading blanks are skipped.
/// Returns the value and the number of bytes consumed.
pub fn parse_c_long(s: &str) -> Option<(i64, usize)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && is_whitespace(bytes[i]) {
        i += 1;
    }
    let mut negative = false;
    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
        negative = bytes[i] == b'-';
        i += 1;
    }
    let mut radix = 10;
    if bytes.get(i) == Some(&b'0') {
        if matches!(bytes.get(i + 1), Some(b'x') | Some(b'X'))
            && bytes.get(i + 2).map_or(false, |b| b.is_ascii_hexdigit())
        {
            radix = 16;
            i += 2;
        } else {
            radix = 8;
        }
    }
    let start = i;
    let mut value: i64 = 0;
    while let Some(d) = bytes.get(i).and_then(|&b| (b as char).to_digit(radix)) {
        value = value.checked_mul(radix as i64)?.checked_add(d as i64)?;
        i += 1;
    }
    if i == start {
        return None;
    }
    Some((if negative { -value } else { value }, i))
}

/// `atoi`: decimal prefix, 0 when there is none.
pub fn atoi(s: &str) -> i32 {
    let trimmed = s.trim_start_matches(|c: char| c.is_ascii() && is_whitespace(c as u8));
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().unwrap_or(0)
}

pub fn parse_int(token: &str) -> Result<i32, TokenError> {
    parse_c_long(token)
        .and_then(|(v, _)| i32::try_from(v).ok())
        .ok_or_else(|| TokenError::Integer(token.to_string()))
}

/// Cursor over stripped text.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    text: &'a str,
    pos: Option<usize>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: Some(0) }
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos.is_none()
    }

    fn trim_left(&mut self) -> Option<usize> {
        let bytes = self.text.as_bytes();
        let mut p = self.pos?;
        while p < bytes.len() && is_whitespace(bytes[p]) {
            p += 1;
        }
        self.pos = Some(p);
        Some(p)
    }

    /// Next blank separated token. A token opening with `"` runs up to the
    /// closing quote. Returns `None` at the end of the text.
    pub fn next_token(&mut self) -> Option<&'a str> {
        let bytes = self.text.as_bytes();
        let mut start = self.trim_left()?;
        let end;
        if bytes.get(start) == Some(&b'"') {
            start += 1;
            end = bytes[start..]
                .iter()
                .position(|&b| b == b'"')
                .map_or(bytes.len(), |p| start + p);
        } else {
            end = bytes[start..]
                .iter()
                .position(|&b| is_whitespace(b))
                .map_or(bytes.len(), |p| start + p);
            if end == start {
                self.pos = None;
                return None;
            }
        }
        self.pos = if end < bytes.len() { Some(end + 1) } else { None };
        Some(&self.text[start..end])
    }

    /// Rest of the current line, leading blanks skipped.
    pub fn next_token_eol(&mut self) -> Option<&'a str> {
        let start = self.trim_left()?;
        let bytes = self.text.as_bytes();
        match bytes[start..].iter().position(|&b| b == b'\n') {
            Some(p) => {
                let eol = start + p;
                self.pos = Some(eol + 1);
                let line = &self.text[start..eol];
                Some(line.strip_suffix('\r').unwrap_or(line))
            }
            None => {
                self.pos = None;
                Some(&self.text[start..])
            }
        }
    }

    pub fn next_int(&mut self) -> Result<i32, TokenError> {
        let token = self.next_token().unwrap_or("");
        parse_int(token)
    }

    /// `[n]`, returned zero based.
    pub fn next_array_index(&mut self) -> Result<i32, TokenError> {
        let token = self.next_token().unwrap_or("");
        token
            .strip_prefix('[')
            .and_then(parse_c_long)
            .and_then(|(v, _)| i32::try_from(v).ok())
            .map(|v| v.wrapping_sub(1))
            .ok_or_else(|| TokenError::ArrayIndex(token.to_string()))
    }

    /// `(x,y)`. Blanks are allowed around the numbers.
    pub fn next_coord(&mut self) -> Result<(i16, i16), TokenError> {
        let start = self.trim_left().unwrap_or(self.text.len());
        let rest = &self.text[start..];
        let err = || TokenError::Coord(rest.lines().next().unwrap_or("").to_string());
        let inner = rest.strip_prefix('(').ok_or_else(err)?;
        let (x, _) = parse_c_long(inner).ok_or_else(err)?;
        let comma = inner.find(',').ok_or_else(err)?;
        let after_comma = &inner[comma + 1..];
        let (y, _) = parse_c_long(after_comma).ok_or_else(err)?;
        let close = after_comma.find(')').ok_or_else(err)?;
        let consumed = 1 + comma + 1 + close + 1;
        self.pos = Some(start + consumed);
        Ok((x as i16, y as i16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(s: &str) -> String {
        let mut buf = s.as_bytes().to_vec();
        strip_comments(&mut buf);
        decode_latin1(&buf)
    }

    #[test]
    fn test_strip_comments() {
        let out = strip("Scene\t1 // comment\r\n; whole line\r\n  / also\r\nEnd");
        assert_eq!(out.lines().next().unwrap().trim(), "Scene 1");
        let mut t = Tokenizer::new(&out);
        assert_eq!(t.next_token(), Some("Scene"));
        assert_eq!(t.next_token(), Some("1"));
        assert_eq!(t.next_token(), Some("End"));
        assert_eq!(t.next_token(), None);
    }

    #[test]
    fn test_tokens_and_quotes() {
        let mut t = Tokenizer::new("  a `b` \"hello world\" c");
        assert_eq!(t.next_token(), Some("a"));
        assert_eq!(t.next_token(), Some("b"));
        assert_eq!(t.next_token(), Some("hello world"));
        assert_eq!(t.next_token(), Some("c"));
        assert!(t.is_exhausted());
    }

    #[test]
    fn test_next_token_eol() {
        let mut t = Tokenizer::new("skip this line\r\nnext");
        assert_eq!(t.next_token(), Some("skip"));
        assert_eq!(t.next_token_eol(), Some("this line"));
        assert_eq!(t.next_token(), Some("next"));
    }

    #[test]
    fn test_parse_c_long() {
        assert_eq!(parse_c_long("42"), Some((42, 2)));
        assert_eq!(parse_c_long("-7)"), Some((-7, 2)));
        assert_eq!(parse_c_long("0x1F"), Some((31, 4)));
        assert_eq!(parse_c_long("010"), Some((8, 3)));
        assert_eq!(parse_c_long("0"), Some((0, 1)));
        assert_eq!(parse_c_long("abc"), None);
        assert_eq!(atoi("12abc"), 12);
        assert_eq!(atoi("x"), 0);
    }

    #[test]
    fn test_array_index_and_coord() {
        let mut t = Tokenizer::new("[3] ( 10, -20) (0x10,4)x");
        assert_eq!(t.next_array_index().unwrap(), 2);
        assert_eq!(t.next_coord().unwrap(), (10, -20));
        assert_eq!(t.next_coord().unwrap(), (16, 4));
        assert_eq!(t.next_token(), Some("x"));

        let mut bad = Tokenizer::new("10,20");
        assert!(matches!(bad.next_coord(), Err(TokenError::Coord(_))));
    }
}
