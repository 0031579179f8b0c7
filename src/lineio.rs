// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Line-at-a-time Latin-1 transcoding, shared by every higher-level
//! reader/writer in this crate.

use std::io::{BufRead, Write};

use crate::error::TextdumpError;

/// Reads one logical line at a time, decoding each byte as a Latin-1
/// codepoint (one byte, one char — decoding never fails). Tracks a
/// 1-based line counter so every error can name where it happened.
pub struct LineReader<R: BufRead> {
    inner: R,
    pub filename: String,
    pub line_num: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, filename: impl Into<String>) -> Self {
        LineReader {
            inner,
            filename: filename.into(),
            line_num: 0,
        }
    }

    /// Read the next line, excluding its terminating CRLF or LF.
    pub fn read_line(&mut self) -> Result<String, TextdumpError> {
        let mut raw = Vec::new();
        let n = self
            .inner
            .read_until(b'\n', &mut raw)
            .map_err(|e| self.io_err(e))?;
        if n == 0 {
            return Err(TextdumpError::Io {
                file: self.filename.clone(),
                line: self.line_num + 1,
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "unexpected end of file",
                ),
            });
        }
        self.line_num += 1;
        if raw.last() == Some(&b'\n') {
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
        }
        Ok(raw.into_iter().map(|b| b as char).collect())
    }

    fn io_err(&self, source: std::io::Error) -> TextdumpError {
        TextdumpError::io(self.filename.clone(), self.line_num + 1, source)
    }
}

/// Writes one LF-terminated line per call, encoding each char as a single
/// Latin-1 byte. A char outside `0..=0xFF` is a caller bug (strings in
/// this format are never supposed to carry one) and is replaced with `?`
/// rather than panicking the writer.
pub struct LineWriter<W: Write> {
    inner: W,
}

impl<W: Write> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        LineWriter { inner }
    }

    pub fn write_line(&mut self, s: &str) -> Result<(), TextdumpError> {
        let mut bytes = Vec::with_capacity(s.len() + 1);
        for c in s.chars() {
            let b = if (c as u32) <= 0xFF { c as u8 } else { b'?' };
            bytes.push(b);
        }
        bytes.push(b'\n');
        self.inner
            .write_all(&bytes)
            .map_err(|e| TextdumpError::io("<output>".to_string(), 0, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_lf_and_crlf_lines() {
        let mut r = LineReader::new(Cursor::new(b"one\r\ntwo\nthree".to_vec()), "t");
        assert_eq!(r.read_line().unwrap(), "one");
        assert_eq!(r.read_line().unwrap(), "two");
        assert_eq!(r.read_line().unwrap(), "three");
        assert_eq!(r.line_num, 3);
    }

    #[test]
    fn decodes_high_bytes_as_latin1_codepoints() {
        let mut r = LineReader::new(Cursor::new(vec![0xE9, b'\n']), "t");
        let line = r.read_line().unwrap();
        assert_eq!(line.chars().next().unwrap() as u32, 0xE9);
    }

    #[test]
    fn writer_emits_single_lf() {
        let mut buf = Vec::new();
        {
            let mut w = LineWriter::new(&mut buf);
            w.write_line("hello").unwrap();
        }
        assert_eq!(buf, b"hello\n");
    }
}
