//! Adapter that drives an [`XmlHandler`] from a quick-xml event stream.

use std::str;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, trace};

use crate::{ParseError, ParseErrorKind};

/// Attributes of one element as a flat sequence of alternating names and
/// values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList {
    entries: Vec<String>,
}

impl AttributeList {
    /// Build from alternating name/value entries.
    pub fn from_flat(entries: Vec<String>) -> Self {
        Self { entries }
    }

    pub fn from_pairs<'p>(pairs: impl IntoIterator<Item = (&'p str, &'p str)>) -> Self {
        let mut entries = Vec::new();
        for (name, value) in pairs {
            entries.push(name.to_string());
            entries.push(value.to_string());
        }
        Self { entries }
    }

    /// Value of the first attribute named exactly `name`.
    ///
    /// A trailing name without a value ends the scan, so everything from
    /// there on is reported absent.
    pub fn find(&self, name: &str) -> Option<&str> {
        for pair in self.entries.chunks(2) {
            let [key, value] = pair else {
                return None;
            };
            if key == name {
                return Some(value.as_str());
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Receiver of tokenizer events.
///
/// Once [`XmlHandler::is_aborted`] returns true the tokenizer stops
/// delivering events.
pub trait XmlHandler {
    fn start_element(&mut self, name: &str, attrs: &AttributeList, line: u64);
    fn end_element(&mut self, name: &str, line: u64);
    /// Character data of the innermost open element, trimmed and unescaped.
    fn text(&mut self, text: &str, line: u64);
    fn is_aborted(&self) -> bool;
}

/// Run the tokenizer over an in-memory document.
///
/// Returns an error only for documents that are not well-formed. Rejections
/// raised by the handler are recorded by the handler itself.
pub fn tokenize<H: XmlHandler>(xml: &str, handler: &mut H) -> Result<(), ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut lines = LineCounter::new(xml);
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        if handler.is_aborted() {
            debug!("handler aborted, event delivery stopped");
            return Ok(());
        }
        let event = reader.read_event_into(&mut buf);
        let line = lines.line_at(reader.buffer_position());
        match event {
            Ok(Event::Start(e)) => {
                check_in_root(seen_root, depth, line)?;
                let qname = e.name();
                let name = element_name(qname.as_ref(), line)?;
                let attrs = attributes(&e, line)?;
                depth += 1;
                seen_root = true;
                trace!(line, element = name, depth, "start");
                handler.start_element(name, &attrs, line);
            }
            Ok(Event::Empty(e)) => {
                check_in_root(seen_root, depth, line)?;
                let qname = e.name();
                let name = element_name(qname.as_ref(), line)?;
                let attrs = attributes(&e, line)?;
                seen_root = true;
                trace!(line, element = name, depth, "empty");
                handler.start_element(name, &attrs, line);
                if !handler.is_aborted() {
                    handler.end_element(name, line);
                }
            }
            Ok(Event::End(e)) => {
                let qname = e.name();
                let name = element_name(qname.as_ref(), line)?;
                depth = depth.saturating_sub(1);
                trace!(line, element = name, depth, "end");
                handler.end_element(name, line);
            }
            Ok(Event::Text(e)) => {
                if depth == 0 {
                    return Err(syntax(line, "text outside the document element"));
                }
                let text = e.unescape().map_err(|err| syntax(line, err))?;
                handler.text(&text, line);
            }
            Ok(Event::CData(e)) => {
                if depth == 0 {
                    return Err(syntax(line, "text outside the document element"));
                }
                let raw = e.into_inner();
                let text = str::from_utf8(&raw).map_err(|err| syntax(line, err))?;
                handler.text(text.trim(), line);
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(syntax(line, err)),
            _ => {}
        }
        buf.clear();
    }

    let line = lines.line_at(xml.len());
    if !seen_root {
        return Err(syntax(line, "no element found"));
    }
    if depth > 0 {
        return Err(syntax(line, "unclosed element at end of document"));
    }
    Ok(())
}

/// A document has exactly one root element.
fn check_in_root(seen_root: bool, depth: usize, line: u64) -> Result<(), ParseError> {
    if seen_root && depth == 0 {
        return Err(syntax(line, "junk after document element"));
    }
    Ok(())
}

fn element_name(raw: &[u8], line: u64) -> Result<&str, ParseError> {
    str::from_utf8(raw).map_err(|err| syntax(line, err))
}

fn attributes(event: &BytesStart<'_>, line: u64) -> Result<AttributeList, ParseError> {
    let mut entries = Vec::new();
    for attr in event.attributes() {
        let attr = attr.map_err(|err| syntax(line, err))?;
        let key = str::from_utf8(attr.key.as_ref()).map_err(|err| syntax(line, err))?;
        let value = attr.unescape_value().map_err(|err| syntax(line, err))?;
        entries.push(key.to_string());
        entries.push(value.into_owned());
    }
    Ok(AttributeList::from_flat(entries))
}

fn syntax(line: u64, err: impl ToString) -> ParseError {
    ParseError::new(line, ParseErrorKind::Syntax(err.to_string()))
}

/// Maps byte offsets to 1-based line numbers. Offsets must not decrease.
struct LineCounter<'x> {
    text: &'x [u8],
    offset: usize,
    line: u64,
}

impl<'x> LineCounter<'x> {
    fn new(text: &'x str) -> Self {
        Self {
            text: text.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> u64 {
        let offset = offset.min(self.text.len());
        if offset > self.offset {
            let newlines = self.text[self.offset..offset]
                .iter()
                .filter(|b| **b == b'\n')
                .count();
            self.line += newlines as u64;
            self.offset = offset;
        }
        self.line
    }
}
