//! Self-describing XML back-end.
//!
//! # Wire format
//!
//! Each top-level record is one UTF-8 element tree, emitted compactly with
//! no prolog and no indentation (indented here for readability):
//!
//! ```text
//! <record>
//!   <id type="int32">42</id>
//!   <name type="string">abc</name>
//!   <vector tag="readings" size="2">
//!     <item type="int32">5</item>
//!     <item type="int32">6</item>
//!   </vector>
//! </record>
//! ```
//!
//! - scalar fields become `<tag type="T">text</tag>` with `T` one of
//!   `boolean`, `int8`, `int32`, `int64`, `float32`, `float64`, `string`,
//!   `buffer` (buffers as lowercase hex);
//! - records become `<record>` at the root and `<record tag="field">`
//!   nested;
//! - vectors become `<vector tag="field" size="N">` wrapping their items;
//! - maps become `<map tag="field" size="N">` wrapping interleaved
//!   key/value children.
//!
//! Reading locates children by tag rather than by position, so the format
//! tolerates field reordering but not renaming.  The parser consumes
//! exactly one root element per top-level record and never looks past its
//! close tag, so concatenated fragments on one stream decode sequentially.
//!
//! Text content escapes `&`, `<`, `>`; attribute values additionally escape
//! quotes; C0 control characters use numeric character references.  The
//! reader accepts the five named entities plus decimal and hex references,
//! and skips comments and processing instructions.

use std::fmt::Write as _;

use crate::archive::{IArchive, OArchive, RecFormat};
use crate::error::{RecError, Result};
use crate::stream::{read_fully, write_fully, InStream, OutStream};

fn bad(reason: impl Into<String>) -> RecError {
    RecError::format(RecFormat::Xml, reason)
}

// ── Escaping ─────────────────────────────────────────────────────────────────

fn escape_into(out: &mut String, s: &str, for_attr: bool) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if for_attr => out.push_str("&quot;"),
            c if (c as u32) < 0x20 && c != '\t' && c != '\n' && c != '\r' => {
                let _ = write!(out, "&#x{:X};", c as u32);
            }
            c => out.push(c),
        }
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':')
}

fn valid_name(tag: &str) -> bool {
    let bytes = tag.as_bytes();
    match bytes.first() {
        Some(&b) if is_name_start(b) => bytes[1..].iter().all(|&b| is_name_byte(b)),
        _ => false,
    }
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct XmlOArchive<W: OutStream> {
    stream: W,
    depth: usize,
}

impl<W: OutStream> XmlOArchive<W> {
    pub fn new(stream: W) -> Self {
        Self { stream, depth: 0 }
    }

    fn scalar(&mut self, tag: &str, ty: &str, text: &str) -> Result<()> {
        if !valid_name(tag) {
            return Err(RecError::encoding(
                RecFormat::Xml,
                format!("tag `{tag}` is not a legal element name"),
            ));
        }
        let mut out = String::with_capacity(text.len() + tag.len() * 2 + ty.len() + 16);
        let _ = write!(out, "<{tag} type=\"{ty}\">");
        escape_into(&mut out, text, false);
        let _ = write!(out, "</{tag}>");
        write_fully(&mut self.stream, out.as_bytes())
    }

    fn open_container(&mut self, kind: &str, tag: &str, size: Option<usize>) -> Result<()> {
        let mut out = String::with_capacity(32);
        out.push('<');
        out.push_str(kind);
        if self.depth > 0 || kind != "record" {
            out.push_str(" tag=\"");
            escape_into(&mut out, tag, true);
            out.push('"');
        }
        if let Some(n) = size {
            let _ = write!(out, " size=\"{n}\"");
        }
        out.push('>');
        write_fully(&mut self.stream, out.as_bytes())
    }

    fn close_container(&mut self, kind: &str) -> Result<()> {
        let mut out = String::with_capacity(kind.len() + 3);
        let _ = write!(out, "</{kind}>");
        write_fully(&mut self.stream, out.as_bytes())
    }
}

impl<W: OutStream> OArchive for XmlOArchive<W> {
    fn write_bool(&mut self, v: bool, tag: &str) -> Result<()> {
        self.scalar(tag, "boolean", if v { "true" } else { "false" })
    }

    fn write_i8(&mut self, v: i8, tag: &str) -> Result<()> {
        self.scalar(tag, "int8", &v.to_string())
    }

    fn write_i32(&mut self, v: i32, tag: &str) -> Result<()> {
        self.scalar(tag, "int32", &v.to_string())
    }

    fn write_i64(&mut self, v: i64, tag: &str) -> Result<()> {
        self.scalar(tag, "int64", &v.to_string())
    }

    fn write_f32(&mut self, v: f32, tag: &str) -> Result<()> {
        self.scalar(tag, "float32", &v.to_string())
    }

    fn write_f64(&mut self, v: f64, tag: &str) -> Result<()> {
        self.scalar(tag, "float64", &v.to_string())
    }

    fn write_string(&mut self, v: &str, tag: &str) -> Result<()> {
        self.scalar(tag, "string", v)
    }

    fn write_buffer(&mut self, v: &[u8], tag: &str) -> Result<()> {
        self.scalar(tag, "buffer", &hex::encode(v))
    }

    fn start_record(&mut self, tag: &str) -> Result<()> {
        self.open_container("record", tag, None)?;
        self.depth += 1;
        Ok(())
    }

    fn end_record(&mut self, _tag: &str) -> Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.close_container("record")
    }

    fn start_vector(&mut self, len: usize, tag: &str) -> Result<()> {
        self.open_container("vector", tag, Some(len))
    }

    fn end_vector(&mut self, _tag: &str) -> Result<()> {
        self.close_container("vector")
    }

    fn start_map(&mut self, len: usize, tag: &str) -> Result<()> {
        self.open_container("map", tag, Some(len))
    }

    fn end_map(&mut self, _tag: &str) -> Result<()> {
        self.close_container("map")
    }

    fn flush(&mut self) -> Result<()> {
        self.stream.flush()
    }
}

// ── Parsed tree ──────────────────────────────────────────────────────────────

struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<usize>,
}

fn attr<'n>(node: &'n Node, key: &str) -> Option<&'n str> {
    node.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

// ── Pull parser ──────────────────────────────────────────────────────────────

struct Scanner<'a, R: InStream> {
    stream: &'a mut R,
    peeked: Option<u8>,
}

impl<'a, R: InStream> Scanner<'a, R> {
    fn new(stream: &'a mut R) -> Self {
        Self { stream, peeked: None }
    }

    fn bump(&mut self) -> Result<u8> {
        if let Some(b) = self.peeked.take() {
            return Ok(b);
        }
        let mut buf = [0u8; 1];
        read_fully(self.stream, &mut buf)?;
        Ok(buf[0])
    }

    fn peek(&mut self) -> Result<u8> {
        if self.peeked.is_none() {
            let mut buf = [0u8; 1];
            read_fully(self.stream, &mut buf)?;
            self.peeked = Some(buf[0]);
        }
        Ok(self.peeked.unwrap())
    }

    fn expect(&mut self, want: u8) -> Result<()> {
        let got = self.bump()?;
        if got != want {
            return Err(bad(format!("expected `{}`, found byte {got:#04x}", want as char)));
        }
        Ok(())
    }

    fn skip_ws(&mut self) -> Result<()> {
        while self.peek()?.is_ascii_whitespace() {
            self.bump()?;
        }
        Ok(())
    }

    fn read_name(&mut self) -> Result<String> {
        let first = self.bump()?;
        if !is_name_start(first) {
            return Err(bad(format!("invalid name start byte {first:#04x}")));
        }
        let mut name = String::new();
        name.push(first as char);
        while is_name_byte(self.peek()?) {
            name.push(self.bump()? as char);
        }
        Ok(name)
    }

    fn read_entity(&mut self) -> Result<char> {
        let mut ent = String::new();
        loop {
            let b = self.bump()?;
            if b == b';' {
                break;
            }
            if ent.len() >= 10 {
                return Err(bad("unterminated entity reference"));
            }
            ent.push(b as char);
        }
        match ent.as_str() {
            "amp"  => Ok('&'),
            "lt"   => Ok('<'),
            "gt"   => Ok('>'),
            "quot" => Ok('"'),
            "apos" => Ok('\''),
            _ => {
                let code = if let Some(hexpart) = ent.strip_prefix("#x").or_else(|| ent.strip_prefix("#X")) {
                    u32::from_str_radix(hexpart, 16).ok()
                } else if let Some(decpart) = ent.strip_prefix('#') {
                    decpart.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| bad(format!("unknown entity `&{ent};`")))
            }
        }
    }

    /// Accumulate character data until an unescaped `<`, which is consumed.
    fn read_text(&mut self, out: &mut Vec<u8>) -> Result<()> {
        loop {
            let b = self.bump()?;
            match b {
                b'<' => return Ok(()),
                b'&' => {
                    let c = self.read_entity()?;
                    let mut buf = [0u8; 4];
                    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
                _ => out.push(b),
            }
        }
    }

    fn read_attr_value(&mut self) -> Result<String> {
        self.expect(b'"')?;
        let mut raw = Vec::new();
        loop {
            let b = self.bump()?;
            match b {
                b'"' => break,
                b'&' => {
                    let c = self.read_entity()?;
                    let mut buf = [0u8; 4];
                    raw.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
                _ => raw.push(b),
            }
        }
        String::from_utf8(raw).map_err(|e| bad(format!("attribute value is not UTF-8: {e}")))
    }

    /// Skip `<!-- ... -->`.  Called with `<!` consumed.
    fn skip_comment(&mut self) -> Result<()> {
        self.expect(b'-')?;
        self.expect(b'-')?;
        let mut dashes = 0;
        loop {
            match self.bump()? {
                b'-' => dashes += 1,
                b'>' if dashes >= 2 => return Ok(()),
                _ => dashes = 0,
            }
        }
    }

    /// Skip `<? ... ?>`.  Called with `<?` consumed.
    fn skip_pi(&mut self) -> Result<()> {
        let mut question = false;
        loop {
            match self.bump()? {
                b'?' => question = true,
                b'>' if question => return Ok(()),
                _ => question = false,
            }
        }
    }
}

/// Parse one element, `<` and markup-kind already dispatched: the scanner is
/// positioned at the first byte of the element name.
fn parse_element<R: InStream>(sc: &mut Scanner<'_, R>, nodes: &mut Vec<Node>) -> Result<usize> {
    let name = sc.read_name()?;
    let mut attrs = Vec::new();
    let empty = loop {
        sc.skip_ws()?;
        match sc.peek()? {
            b'/' => {
                sc.bump()?;
                sc.expect(b'>')?;
                break true;
            }
            b'>' => {
                sc.bump()?;
                break false;
            }
            _ => {
                let key = sc.read_name()?;
                sc.skip_ws()?;
                sc.expect(b'=')?;
                sc.skip_ws()?;
                let value = sc.read_attr_value()?;
                attrs.push((key, value));
            }
        }
    };

    let idx = nodes.len();
    nodes.push(Node { name, attrs, text: String::new(), children: Vec::new() });
    if empty {
        return Ok(idx);
    }

    let mut raw_text = Vec::new();
    let mut children = Vec::new();
    loop {
        sc.read_text(&mut raw_text)?;
        match sc.peek()? {
            b'/' => {
                sc.bump()?;
                let close = sc.read_name()?;
                sc.skip_ws()?;
                sc.expect(b'>')?;
                if close != nodes[idx].name {
                    return Err(bad(format!(
                        "mismatched close tag: `</{close}>` closes `<{}>`",
                        nodes[idx].name
                    )));
                }
                break;
            }
            b'!' => {
                sc.bump()?;
                sc.skip_comment()?;
            }
            b'?' => {
                sc.bump()?;
                sc.skip_pi()?;
            }
            _ => children.push(parse_element(sc, nodes)?),
        }
    }

    let text = String::from_utf8(raw_text)
        .map_err(|e| bad(format!("character data is not UTF-8: {e}")))?;
    if !children.is_empty() {
        if !text.trim().is_empty() {
            return Err(bad(format!("mixed content inside `<{}>`", nodes[idx].name)));
        }
    } else {
        nodes[idx].text = text;
    }
    nodes[idx].children = children;
    Ok(idx)
}

// ── Reader ───────────────────────────────────────────────────────────────────

struct Frame {
    node: usize,
    used: Vec<bool>,
}

pub struct XmlIArchive<R: InStream> {
    stream: R,
    nodes: Vec<Node>,
    frames: Vec<Frame>,
}

impl<R: InStream> XmlIArchive<R> {
    pub fn new(stream: R) -> Self {
        Self { stream, nodes: Vec::new(), frames: Vec::new() }
    }

    /// Parse the next root element off the stream.  Leading whitespace,
    /// comments and processing instructions are skipped.
    fn load_root(&mut self) -> Result<()> {
        let mut sc = Scanner::new(&mut self.stream);
        let mut nodes = Vec::new();
        loop {
            sc.skip_ws()?;
            sc.expect(b'<')?;
            match sc.peek()? {
                b'!' => {
                    sc.bump()?;
                    sc.skip_comment()?;
                }
                b'?' => {
                    sc.bump()?;
                    sc.skip_pi()?;
                }
                _ => {
                    parse_element(&mut sc, &mut nodes)?;
                    break;
                }
            }
        }
        if nodes[0].name != "record" {
            return Err(bad(format!("root element is `<{}>`, expected `<record>`", nodes[0].name)));
        }
        self.nodes = nodes;
        Ok(())
    }

    fn push_frame(&mut self, node: usize) {
        let used = vec![false; self.nodes[node].children.len()];
        self.frames.push(Frame { node, used });
    }

    /// Claim the first unused child of the current frame matching `pred`.
    fn take_child<F: Fn(&Node) -> bool>(&mut self, pred: F, what: &str) -> Result<usize> {
        let frame = match self.frames.last_mut() {
            Some(f) => f,
            None => return Err(bad(format!("{what} requested outside a record"))),
        };
        let node = &self.nodes[frame.node];
        for (i, &child) in node.children.iter().enumerate() {
            if !frame.used[i] && pred(&self.nodes[child]) {
                frame.used[i] = true;
                return Ok(child);
            }
        }
        Err(bad(format!("{what} not found in `<{}>`", node.name)))
    }

    fn take_scalar(&mut self, tag: &str, ty: &str) -> Result<String> {
        let idx = self.take_child(|n| n.name == tag, &format!("field `{tag}`"))?;
        let node = &self.nodes[idx];
        match attr(node, "type") {
            Some(t) if t == ty => Ok(node.text.clone()),
            Some(t) => Err(bad(format!("field `{tag}` has type `{t}`, expected `{ty}`"))),
            None => Err(bad(format!("field `{tag}` is missing its type attribute"))),
        }
    }

    /// Claim a container child (`record`/`vector`/`map`) by its tag
    /// attribute, push its frame, and return the node index.
    fn enter_container(&mut self, kind: &'static str, tag: &str) -> Result<usize> {
        let idx = self.take_child(
            |n| n.name == kind && attr(n, "tag") == Some(tag),
            &format!("{kind} `{tag}`"),
        )?;
        self.push_frame(idx);
        Ok(idx)
    }

    fn leave_container(&mut self, kind: &'static str) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| bad(format!("unmatched end of {kind}")))?;
        let name = &self.nodes[frame.node].name;
        if name != kind {
            return Err(bad(format!("end of {kind} closes `<{name}>`")));
        }
        if self.frames.is_empty() {
            // Root fully consumed; the next record parses a fresh fragment.
            self.nodes.clear();
        }
        Ok(())
    }

    fn container_size(&self, idx: usize, per_entry: usize) -> Result<usize> {
        let node = &self.nodes[idx];
        let size: usize = attr(node, "size")
            .ok_or_else(|| bad(format!("`<{}>` is missing its size attribute", node.name)))?
            .parse()
            .map_err(|_| bad(format!("`<{}>` has a malformed size attribute", node.name)))?;
        if size.checked_mul(per_entry) != Some(node.children.len()) {
            return Err(bad(format!(
                "`<{}>` declares {size} entries but holds {} children",
                node.name,
                node.children.len()
            )));
        }
        Ok(size)
    }

    fn parse_text<T: std::str::FromStr>(&self, text: &str, tag: &str, ty: &str) -> Result<T> {
        text.trim()
            .parse::<T>()
            .map_err(|_| bad(format!("field `{tag}` holds `{text}`, not a valid {ty}")))
    }
}

impl<R: InStream> IArchive for XmlIArchive<R> {
    fn read_bool(&mut self, tag: &str) -> Result<bool> {
        let text = self.take_scalar(tag, "boolean")?;
        match text.trim() {
            "true"  => Ok(true),
            "false" => Ok(false),
            other   => Err(bad(format!("field `{tag}` holds `{other}`, not a boolean"))),
        }
    }

    fn read_i8(&mut self, tag: &str) -> Result<i8> {
        let text = self.take_scalar(tag, "int8")?;
        self.parse_text(&text, tag, "int8")
    }

    fn read_i32(&mut self, tag: &str) -> Result<i32> {
        let text = self.take_scalar(tag, "int32")?;
        self.parse_text(&text, tag, "int32")
    }

    fn read_i64(&mut self, tag: &str) -> Result<i64> {
        let text = self.take_scalar(tag, "int64")?;
        self.parse_text(&text, tag, "int64")
    }

    fn read_f32(&mut self, tag: &str) -> Result<f32> {
        let text = self.take_scalar(tag, "float32")?;
        self.parse_text(&text, tag, "float32")
    }

    fn read_f64(&mut self, tag: &str) -> Result<f64> {
        let text = self.take_scalar(tag, "float64")?;
        self.parse_text(&text, tag, "float64")
    }

    fn read_string(&mut self, tag: &str) -> Result<String> {
        self.take_scalar(tag, "string")
    }

    fn read_buffer(&mut self, tag: &str) -> Result<Vec<u8>> {
        let text = self.take_scalar(tag, "buffer")?;
        hex::decode(text.trim())
            .map_err(|e| bad(format!("field `{tag}` holds malformed hex: {e}")))
    }

    fn start_record(&mut self, tag: &str) -> Result<()> {
        if self.frames.is_empty() {
            self.load_root()?;
            self.push_frame(0);
            Ok(())
        } else {
            self.enter_container("record", tag).map(|_| ())
        }
    }

    fn end_record(&mut self, _tag: &str) -> Result<()> {
        self.leave_container("record")
    }

    fn start_vector(&mut self, tag: &str) -> Result<usize> {
        let idx = self.enter_container("vector", tag)?;
        self.container_size(idx, 1)
    }

    fn end_vector(&mut self, _tag: &str) -> Result<()> {
        self.leave_container("vector")
    }

    fn start_map(&mut self, tag: &str) -> Result<usize> {
        let idx = self.enter_container("map", tag)?;
        self.container_size(idx, 2)
    }

    fn end_map(&mut self, _tag: &str) -> Result<()> {
        self.leave_container("map")
    }
}
