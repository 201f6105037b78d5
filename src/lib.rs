#![cfg_attr(docsrs, feature(doc_cfg))]
//! VSCP decision matrix facade re-exporting the workspace crates.
//!
//! ```rust
//! use vscp_dm::{parse_std, MatrixRow};
//!
//! let xml = r#"<dm version="1.0" level="1" type="std">
//!     <row enabled="true">
//!         <mask class="0x1ff" type="0xff"/>
//!         <filter class="0x0a" type="6"/>
//!         <action>0x10</action>
//!         <param>1</param>
//!     </row>
//! </dm>"#;
//! let mut rows = [MatrixRow::default(); 16];
//! let count = parse_std(xml, &mut rows).expect("valid matrix");
//! assert_eq!(count, 1);
//! assert_eq!(rows[0].class_filter_value(), 0x0A);
//! ```

pub use dm_core;
pub use dm_xml;

pub use dm_core::{
    encode_table, DataMatch, ExtRow, MatrixRow, RowFlags, ACTION_EXTENDED, ROW_SIZE,
};
pub use dm_xml::{
    load_ext, load_ng, load_std, parse_ext, parse_std, LoadError, ParseError,
    ParseErrorKind, Status,
};
