//! Flat CSV back-end.
//!
//! # Wire format
//!
//! One line per top-level record, terminated by `\n`.  Fields are
//! comma-separated in declared order; nested records flatten into
//! additional columns; there is no header row.  Any string containing a
//! comma, quote, CR or LF — and the empty string — is wrapped in double
//! quotes with embedded quotes doubled.  Booleans emit `true`/`false`,
//! buffers emit lowercase hex, floats use the shortest round-trip decimal
//! form.
//!
//! # Limitation: variable-shape fields
//!
//! Structural markers put nothing on the wire, so a vector or map has no
//! encoded element count.  The reader serves columns positionally and
//! reports a count derived from the columns remaining on the line, which
//! is reliable only for a trailing container of scalar elements.  In
//! particular, an absent optional field and an empty one produce identical
//! lines and cannot be told apart without external schema context.  This
//! is a documented property of the format, not a defect: payloads with
//! interior or nested variable-shape fields belong in the binary or XML
//! encodings.

use crate::archive::{IArchive, OArchive, RecFormat};
use crate::error::{RecError, Result};
use crate::stream::{read_fully, write_fully, InStream, OutStream};

fn bad(reason: impl Into<String>) -> RecError {
    RecError::format(RecFormat::Csv, reason)
}

// ── Quoting ──────────────────────────────────────────────────────────────────

fn needs_quoting(s: &str) -> bool {
    s.is_empty() || s.bytes().any(|b| matches!(b, b',' | b'"' | b'\n' | b'\r'))
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Split one raw line into unescaped columns.
fn split_line(line: &str) -> Result<Vec<String>> {
    if line.is_empty() {
        return Ok(Vec::new());
    }
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut chars = line.chars().peekable();
    loop {
        match chars.peek() {
            None => {
                fields.push(std::mem::take(&mut cur));
                return Ok(fields);
            }
            Some('"') if cur.is_empty() => {
                chars.next();
                // Quoted column: runs to the closing quote, `""` unescapes.
                loop {
                    match chars.next() {
                        None => return Err(bad("unterminated quoted column")),
                        Some('"') => match chars.peek() {
                            Some('"') => {
                                chars.next();
                                cur.push('"');
                            }
                            _ => break,
                        },
                        Some(c) => cur.push(c),
                    }
                }
                match chars.next() {
                    None => {
                        fields.push(std::mem::take(&mut cur));
                        return Ok(fields);
                    }
                    Some(',') => fields.push(std::mem::take(&mut cur)),
                    Some(c) => return Err(bad(format!("unexpected `{c}` after closing quote"))),
                }
            }
            Some(',') => {
                chars.next();
                fields.push(std::mem::take(&mut cur));
            }
            Some('"') => return Err(bad("bare quote inside unquoted column")),
            Some(_) => cur.push(chars.next().unwrap()),
        }
    }
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct CsvOArchive<W: OutStream> {
    stream: W,
    depth: usize,
    line_started: bool,
}

impl<W: OutStream> CsvOArchive<W> {
    pub fn new(stream: W) -> Self {
        Self { stream, depth: 0, line_started: false }
    }

    fn column(&mut self, text: &str) -> Result<()> {
        if self.line_started {
            write_fully(&mut self.stream, b",")?;
        }
        self.line_started = true;
        write_fully(&mut self.stream, text.as_bytes())
    }
}

impl<W: OutStream> OArchive for CsvOArchive<W> {
    fn write_bool(&mut self, v: bool, _tag: &str) -> Result<()> {
        self.column(if v { "true" } else { "false" })
    }

    fn write_i8(&mut self, v: i8, _tag: &str) -> Result<()> {
        self.column(&v.to_string())
    }

    fn write_i32(&mut self, v: i32, _tag: &str) -> Result<()> {
        self.column(&v.to_string())
    }

    fn write_i64(&mut self, v: i64, _tag: &str) -> Result<()> {
        self.column(&v.to_string())
    }

    fn write_f32(&mut self, v: f32, _tag: &str) -> Result<()> {
        self.column(&v.to_string())
    }

    fn write_f64(&mut self, v: f64, _tag: &str) -> Result<()> {
        self.column(&v.to_string())
    }

    fn write_string(&mut self, v: &str, _tag: &str) -> Result<()> {
        if needs_quoting(v) {
            self.column(&quote(v))
        } else {
            self.column(v)
        }
    }

    fn write_buffer(&mut self, v: &[u8], _tag: &str) -> Result<()> {
        self.column(&hex::encode(v))
    }

    fn start_record(&mut self, _tag: &str) -> Result<()> {
        if self.depth == 0 {
            self.line_started = false;
        }
        self.depth += 1;
        Ok(())
    }

    fn end_record(&mut self, _tag: &str) -> Result<()> {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            write_fully(&mut self.stream, b"\n")?;
        }
        Ok(())
    }

    fn start_vector(&mut self, _len: usize, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn end_vector(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn start_map(&mut self, _len: usize, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn end_map(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.stream.flush()
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct CsvIArchive<R: InStream> {
    stream: R,
    depth: usize,
    columns: Vec<String>,
    cursor: usize,
}

impl<R: InStream> CsvIArchive<R> {
    pub fn new(stream: R) -> Self {
        Self { stream, depth: 0, columns: Vec::new(), cursor: 0 }
    }

    /// Read one record line, honoring quoting so a quoted LF does not end
    /// the line.  A missing final newline at end of stream is tolerated.
    fn read_line(&mut self) -> Result<String> {
        let mut raw = Vec::new();
        let mut in_quotes = false;
        loop {
            let mut buf = [0u8; 1];
            match read_fully(&mut self.stream, &mut buf) {
                Ok(()) => {}
                Err(RecError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    if !raw.is_empty() && !in_quotes {
                        break;
                    }
                    return Err(RecError::Io(e));
                }
                Err(e) => return Err(e),
            }
            match buf[0] {
                b'\n' if !in_quotes => break,
                b'"' => {
                    in_quotes = !in_quotes;
                    raw.push(b'"');
                }
                b => raw.push(b),
            }
        }
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        String::from_utf8(raw).map_err(|e| bad(format!("record line is not UTF-8: {e}")))
    }

    fn next_column(&mut self) -> Result<&str> {
        if self.depth == 0 {
            return Err(bad("column read outside a record"));
        }
        match self.columns.get(self.cursor) {
            Some(col) => {
                self.cursor += 1;
                Ok(col)
            }
            None => Err(bad("record line has too few columns")),
        }
    }

    fn remaining(&self) -> usize {
        self.columns.len() - self.cursor
    }
}

impl<R: InStream> IArchive for CsvIArchive<R> {
    fn read_bool(&mut self, tag: &str) -> Result<bool> {
        match self.next_column()? {
            "true"  => Ok(true),
            "false" => Ok(false),
            other   => Err(bad(format!("column `{tag}` holds `{other}`, not a boolean"))),
        }
    }

    fn read_i8(&mut self, tag: &str) -> Result<i8> {
        let col = self.next_column()?;
        col.parse()
            .map_err(|_| bad(format!("column `{tag}` holds `{col}`, not an int8")))
    }

    fn read_i32(&mut self, tag: &str) -> Result<i32> {
        let col = self.next_column()?;
        col.parse()
            .map_err(|_| bad(format!("column `{tag}` holds `{col}`, not an int32")))
    }

    fn read_i64(&mut self, tag: &str) -> Result<i64> {
        let col = self.next_column()?;
        col.parse()
            .map_err(|_| bad(format!("column `{tag}` holds `{col}`, not an int64")))
    }

    fn read_f32(&mut self, tag: &str) -> Result<f32> {
        let col = self.next_column()?;
        col.parse()
            .map_err(|_| bad(format!("column `{tag}` holds `{col}`, not a float32")))
    }

    fn read_f64(&mut self, tag: &str) -> Result<f64> {
        let col = self.next_column()?;
        col.parse()
            .map_err(|_| bad(format!("column `{tag}` holds `{col}`, not a float64")))
    }

    fn read_string(&mut self, _tag: &str) -> Result<String> {
        self.next_column().map(str::to_owned)
    }

    fn read_buffer(&mut self, tag: &str) -> Result<Vec<u8>> {
        let col = self.next_column()?;
        hex::decode(col).map_err(|e| bad(format!("column `{tag}` holds malformed hex: {e}")))
    }

    fn start_record(&mut self, _tag: &str) -> Result<()> {
        if self.depth == 0 {
            let line = self.read_line()?;
            self.columns = split_line(&line)?;
            self.cursor = 0;
        }
        self.depth += 1;
        Ok(())
    }

    fn end_record(&mut self, _tag: &str) -> Result<()> {
        if self.depth == 0 {
            return Err(bad("unmatched end of record"));
        }
        self.depth -= 1;
        if self.depth == 0 {
            if self.cursor != self.columns.len() {
                return Err(bad(format!(
                    "record consumed {} of {} columns",
                    self.cursor,
                    self.columns.len()
                )));
            }
            self.columns.clear();
            self.cursor = 0;
        }
        Ok(())
    }

    /// Element count inferred from the columns left on the line; reliable
    /// only for a trailing vector of scalars (see the module docs).
    fn start_vector(&mut self, _tag: &str) -> Result<usize> {
        Ok(self.remaining())
    }

    fn end_vector(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }

    /// Pair count inferred from the columns left on the line; reliable only
    /// for a trailing map of scalar keys and values.
    fn start_map(&mut self, _tag: &str) -> Result<usize> {
        Ok(self.remaining() / 2)
    }

    fn end_map(&mut self, _tag: &str) -> Result<()> {
        Ok(())
    }
}
