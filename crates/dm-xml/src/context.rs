//! Per-load parser state shared by both dialect front ends.

use dm_core::{CodecError, FieldAction, TableWriter};
use tracing::error;

use crate::ParseError;

/// Mutable state of one load call. Created fresh per call and dropped when
/// the call returns.
#[derive(Debug)]
pub(crate) struct ParseContext<'a> {
    pub(crate) writer: TableWriter<'a>,
    /// Text of the innermost element opened since the last start tag.
    text: Option<String>,
    depth: usize,
    abort: Option<ParseError>,
}

impl<'a> ParseContext<'a> {
    pub(crate) fn new(writer: TableWriter<'a>) -> Self {
        Self {
            writer,
            text: None,
            depth: 0,
            abort: None,
        }
    }

    /// Called on every start tag so an element never sees text of a
    /// previous sibling.
    pub(crate) fn clear_text(&mut self) {
        self.text = None;
    }

    pub(crate) fn set_text(&mut self, text: &str) {
        self.text = Some(text.to_owned());
    }

    pub(crate) fn has_text(&self) -> bool {
        self.text.is_some()
    }

    /// Decode the current element text into the row.
    pub(crate) fn apply_text(&mut self, action: FieldAction) -> Result<(), CodecError> {
        self.writer.apply_text(action, self.text.as_deref())
    }

    pub(crate) fn descend(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Record the first rejection. Later ones are logged only.
    pub(crate) fn abort(&mut self, err: ParseError) {
        error!(line = err.line, depth = self.depth, error = %err.kind, "decision matrix rejected");
        if self.abort.is_none() {
            self.abort = Some(err);
        }
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }

    /// Combine the tokenizer outcome with the abort flag.
    ///
    /// A handler rejection does not make the tokenizer fail, so both are
    /// checked. Returns the number of rows written.
    pub(crate) fn finish(self, tokenized: Result<(), ParseError>) -> Result<usize, ParseError> {
        if let Some(err) = self.abort {
            return Err(err);
        }
        tokenized?;
        Ok(self.writer.rows())
    }
}
