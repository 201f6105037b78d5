//! Load VSCP decision matrix XML documents into fixed-capacity row tables.
//!
//! Two dialects are supported. The standard dialect is validated by a
//! declarative [`schema`] walked by a generic engine; the extended dialect by
//! a hand-written state machine, since its legality depends
//! on attribute values. Both write rows through [`dm_core::TableWriter`].
//!
//! A load either fills the destination table(s) completely or leaves them
//! all zero.

use std::io;
use std::path::PathBuf;

use dm_core::CodecError;
use thiserror::Error;

mod context;
mod extended;
pub mod loader;
pub mod schema;
pub mod tokenizer;

pub use loader::{load_ext, load_ng, load_std, parse_ext, parse_std};
pub use schema::{Schema, STANDARD};
pub use tokenizer::{AttributeList, XmlHandler};

/// Decision matrix document version accepted by both dialects.
pub const DM_XML_VERSION: &str = "1.0";
/// Decision matrix level (node level).
pub const DM_LEVEL: &str = "1";

/// Reason a document was rejected during the parse pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// The tokenizer found the document is not well-formed XML.
    #[error("xml: {0}")]
    Syntax(String),
    #[error("unknown element <{0}>")]
    UnknownElement(String),
    /// An element appeared below a leaf of the schema tree.
    #[error("bottom of parse tree reached at <{0}>")]
    BottomOfTree(String),
    #[error("attribute '{attribute}' missing on <{element}>")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    /// Element out of place in the extended dialect.
    #[error("invalid structure: {0}")]
    InvalidStructure(String),
    #[error("wrong {attribute}: expected '{expected}', found '{found}'")]
    Mismatch {
        attribute: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("<{element}>: {source}")]
    Codec {
        element: String,
        #[source]
        source: CodecError,
    },
}

/// Parse failure with the line it was detected on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: u64,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: u64, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }

    pub(crate) fn codec(line: u64, element: &str, source: CodecError) -> Self {
        Self::new(
            line,
            ParseErrorKind::Codec {
                element: element.to_string(),
                source,
            },
        )
    }
}

/// Coarse classification of a failed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A required argument was empty or inconsistent.
    InvalidArgument,
    /// The document could not be read into memory.
    File,
    /// The document was rejected while parsing.
    Parse,
}

/// Error returned by the load entry points.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("extended table holds {ext} rows, standard table {std}")]
    TableMismatch { std: usize, ext: usize },
    #[error("cannot read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl LoadError {
    pub fn status(&self) -> Status {
        match self {
            LoadError::MissingArgument(_) | LoadError::TableMismatch { .. } => {
                Status::InvalidArgument
            }
            LoadError::File { .. } => Status::File,
            LoadError::Parse(_) => Status::Parse,
        }
    }

    /// Parse failure details, if the document itself was rejected.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            LoadError::Parse(err) => Some(err),
            _ => None,
        }
    }
}
