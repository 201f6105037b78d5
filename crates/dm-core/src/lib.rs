#![cfg_attr(docsrs, feature(doc_cfg))]
//! Decision matrix row model and the row codec shared by the XML dialects.
//!
//! A decision matrix is a fixed-capacity table of [`MatrixRow`]s, optionally
//! widened by a parallel table of [`ExtRow`]s at the same index. The loaders
//! in `dm-xml` never touch row bytes directly; every write goes through a
//! [`TableWriter`] driven by [`FieldAction`] values.
//!
//! ```rust
//! use dm_core::{ClassField, FieldAction, MatrixRow, RowFlags, TableWriter};
//!
//! let mut rows = [MatrixRow::default(); 2];
//! let mut writer = TableWriter::new(&mut rows);
//! writer.begin_row()?;
//! writer.apply(FieldAction::Flag(RowFlags::ENABLE), "true")?;
//! writer.apply(FieldAction::Class(ClassField::Mask), "0x1ff")?;
//! writer.end_row()?;
//! assert_eq!(writer.rows(), 1);
//! assert_eq!(rows[0].class_mask_value(), 0x1FF);
//! # Ok::<(), dm_core::CodecError>(())
//! ```

pub mod codec;
pub mod numeric;
pub mod row;

pub use codec::{
    ByteField, ClassField, CodecError, DataByte, FieldAction, RowKind, TableWriter, ZoneField,
};
pub use numeric::{compare_ignore_case, eq_ignore_case, parse_bool, parse_unsigned};
pub use row::{encode_table, DataMatch, ExtRow, MatrixRow, RowFlags, ACTION_EXTENDED, ROW_SIZE};
