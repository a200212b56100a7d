//! Bounded JSON report writer.

use std::fmt::{self, Write};

/// Writes into a fixed caller-provided buffer.
///
/// Running out of space fails the write and leaves the writer poisoned:
/// a truncated report is never valid output.
#[derive(Debug)]
pub struct ReportWriter<'b> {
    buf: &'b mut [u8],
    len: usize,
    exhausted: bool,
}

impl<'b> ReportWriter<'b> {
    pub fn new(buf: &'b mut [u8]) -> Self {
        Self {
            buf,
            len: 0,
            exhausted: false,
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The written text.
    pub fn as_str(&self) -> &str {
        // Only whole `&str`s are ever copied in, so this cannot fail.
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl Write for ReportWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.exhausted {
            return Err(fmt::Error);
        }
        let end = self.len + s.len();
        if end > self.buf.len() {
            self.exhausted = true;
            return Err(fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Displays a string as a quoted JSON string literal.
pub struct JsonStr<'a>(pub &'a str);

impl fmt::Display for JsonStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('"')
    }
}
