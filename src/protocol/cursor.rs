//! Cursor-position query.
//!
//! The `u6` capability describes the terminal's position report (for xterm
//! `\E[%i%d;%dR`) and `u7` requests it. The report is matched against the
//! tail of the bytes read so far, so unrelated input arriving before the
//! reply is tolerated and handed to a discard callback.

use regex::bytes::{Regex, RegexBuilder};

use crate::error::{Result, TtyError};
use crate::stream::{InputStream, ReadStatus};

/// A zero-based cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    /// Column, starting at 0.
    pub column: u16,
    /// Row, starting at 0.
    pub row: u16,
}

impl Cursor {
    /// Create a new cursor position.
    pub fn new(column: u16, row: u16) -> Self {
        Self { column, row }
    }
}

/// A compiled `u6` position-report pattern.
#[derive(Debug, Clone)]
pub struct CursorPattern {
    regex: Regex,
    one_based: bool,
}

impl CursorPattern {
    /// Compile a `u6` capability string.
    ///
    /// `\E`/`\e` become ESC, each `%d` a numeric group, `%i` marks the
    /// report as 1-based and `%%` is a literal percent sign.
    pub fn compile(u6: &str) -> Result<Self> {
        let mut pattern = String::new();
        let mut one_based = false;
        let mut groups = 0;
        let mut chars = u6.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('E') | Some('e') => pattern.push_str(r"\x1B"),
                    Some(other) => pattern.push_str(&regex::escape(&other.to_string())),
                    None => return Err(TtyError::Format("trailing backslash in u6".into())),
                },
                '%' => match chars.next() {
                    Some('%') => pattern.push('%'),
                    Some('d') => {
                        pattern.push_str("([0-9]+)");
                        groups += 1;
                    }
                    Some('i') => one_based = true,
                    Some(other) => {
                        return Err(TtyError::Format(format!(
                            "unsupported directive `%{other}` in u6"
                        )))
                    }
                    None => return Err(TtyError::Format("trailing `%` in u6".into())),
                },
                _ => pattern.push_str(&regex::escape(&c.to_string())),
            }
        }
        if groups != 2 {
            return Err(TtyError::Format(format!(
                "u6 must contain two %d groups, found {groups}"
            )));
        }

        pattern.push('$');
        let regex = RegexBuilder::new(&pattern)
            .unicode(false)
            .build()
            .map_err(|e| TtyError::Format(e.to_string()))?;
        Ok(Self { regex, one_based })
    }

    /// Match the pattern against the end of `buffer`.
    ///
    /// Returns the offset where the report starts and the decoded position.
    pub fn match_tail(&self, buffer: &[u8]) -> Option<(usize, Cursor)> {
        let caps = self.regex.captures(buffer)?;
        let whole = caps.get(0)?;
        let row = number(caps.get(1)?.as_bytes())?;
        let column = number(caps.get(2)?.as_bytes())?;
        let adjust = u32::from(self.one_based);
        let cursor = Cursor::new(
            clamp(column.saturating_sub(adjust)),
            clamp(row.saturating_sub(adjust)),
        );
        Some((whole.start(), cursor))
    }
}

fn number(digits: &[u8]) -> Option<u32> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn clamp(n: u32) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Read a position report from `input`.
///
/// Bytes read before the report are passed to `discard` in order.
/// Fails with [`TtyError::Eof`] when the input ends first.
pub fn read_cursor_report(
    input: &dyn InputStream,
    pattern: &CursorPattern,
    mut discard: Option<&mut dyn FnMut(u8)>,
) -> Result<Cursor> {
    let mut buffer = Vec::new();
    loop {
        match input.read(None)? {
            ReadStatus::Byte(b) => buffer.push(b),
            ReadStatus::Eof => return Err(TtyError::Eof),
            ReadStatus::Timeout => continue,
        }
        if let Some((start, cursor)) = pattern.match_tail(&buffer) {
            if let Some(discard) = discard.as_mut() {
                for &b in &buffer[..start] {
                    discard(b);
                }
            }
            return Ok(cursor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::pipe;

    #[test]
    fn test_parse_with_junk() {
        let pattern = CursorPattern::compile("\\E[%i%d;%dR").unwrap();
        let (writer, reader) = pipe(64);
        writer.write(b"ab\x1b[24;80R").unwrap();

        let mut junk = Vec::new();
        let mut collect = |b: u8| junk.push(b);
        let cursor = read_cursor_report(&reader, &pattern, Some(&mut collect)).unwrap();

        assert_eq!(cursor, Cursor::new(79, 23));
        assert_eq!(junk, b"ab");
    }

    #[test]
    fn test_zero_based_pattern() {
        let pattern = CursorPattern::compile("\\E[%d;%dR").unwrap();
        let (start, cursor) = pattern.match_tail(b"\x1b[3;7R").unwrap();
        assert_eq!(start, 0);
        assert_eq!(cursor, Cursor::new(7, 3));
    }

    #[test]
    fn test_partial_report_does_not_match() {
        let pattern = CursorPattern::compile("\\E[%i%d;%dR").unwrap();
        assert!(pattern.match_tail(b"\x1b[24;8").is_none());
        assert!(pattern.match_tail(b"\x1b[24;80Rx").is_none());
    }

    #[test]
    fn test_eof_before_report() {
        let pattern = CursorPattern::compile("\\E[%i%d;%dR").unwrap();
        let (writer, reader) = pipe(64);
        writer.write(b"\x1b[24").unwrap();
        writer.close();

        let err = read_cursor_report(&reader, &pattern, None).unwrap_err();
        assert!(err.is_eof());
    }

    #[test]
    fn test_bad_patterns() {
        assert!(CursorPattern::compile("\\E[%dR").is_err());
        assert!(CursorPattern::compile("\\E[%p1%d;%dR").is_err());
    }
}
