//! Row codec: maps decoded attribute and text values onto the row bitfields.
//!
//! Both XML dialects describe the same row model, so both drive the same
//! [`TableWriter`] with the same [`FieldAction`]s. Neither front end writes
//! row bytes on its own.

use thiserror::Error;
use tracing::debug;

use crate::numeric::{eq_ignore_case, parse_bool, parse_unsigned};
use crate::row::{DataMatch, ExtRow, MatrixRow, RowFlags, ACTION_EXTENDED};

const BYTE_MAX: u32 = 0xFF;
const CLASS_MAX: u32 = 0x1FF;

const FLAG_NAMES: [(RowFlags, &str); 5] = [
    (RowFlags::ENABLE, "enabled"),
    (RowFlags::CHECK_OADDR, "oaddr enabled"),
    (RowFlags::HARDCODED, "hardcoded"),
    (RowFlags::MATCH_ZONE, "zone enabled"),
    (RowFlags::MATCH_SUB_ZONE, "subzone enabled"),
];

/// Errors produced while writing values into a decision matrix table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Decoded value exceeds what the target field can hold.
    #[error("{field} value {value:#x} out of range (max {max:#x})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
    #[error("invalid boolean '{0}', expected true or false")]
    InvalidBoolean(String),
    #[error("invalid row type '{0}', expected std or ext")]
    InvalidRowKind(String),
    /// Data byte ids 1 and 2 are reserved.
    #[error("data byte id {0} out of range, expected 0, 3, 4 or 5")]
    InvalidByteId(u32),
    #[error("no data byte selected")]
    NoByteSelected,
    #[error("missing {0} value")]
    MissingValue(&'static str),
    /// More rows than the table can hold.
    #[error("decision matrix holds at most {capacity} rows")]
    Overflow { capacity: usize },
    #[error("no row is open")]
    NoRowOpen,
    #[error("row is not an extended row")]
    NotExtended,
    #[error("no extended storage bound")]
    NoExtendedStorage,
    #[error("extended table holds {ext} rows, standard table {std}")]
    CapacityMismatch { std: usize, ext: usize },
    #[error("buffer too short: need {needed} bytes, got {got}")]
    ShortBuffer { needed: usize, got: usize },
}

/// Which half of the class mask/filter pair a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassField {
    Mask,
    Filter,
}

/// Single-byte fields of the standard row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteField {
    Oaddr,
    TypeMask,
    TypeFilter,
    /// Routed to the extended row for extended rows.
    Action,
    /// Routed to the extended row for extended rows.
    Param,
}

/// Zone fields, stored only for extended rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneField {
    Zone,
    SubZone,
}

/// Selectable extended data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataByte {
    Par0,
    Par3,
    Par4,
    Par5,
}

impl DataByte {
    /// Map a `byte id` to its data byte. Ids 1 and 2 are reserved.
    pub fn from_id(id: u32) -> Result<Self, CodecError> {
        match id {
            0 => Ok(DataByte::Par0),
            3 => Ok(DataByte::Par3),
            4 => Ok(DataByte::Par4),
            5 => Ok(DataByte::Par5),
            other => Err(CodecError::InvalidByteId(other)),
        }
    }

    pub const fn id(self) -> u8 {
        match self {
            DataByte::Par0 => 0,
            DataByte::Par3 => 3,
            DataByte::Par4 => 4,
            DataByte::Par5 => 5,
        }
    }

    pub const fn match_flag(self) -> DataMatch {
        match self {
            DataByte::Par0 => DataMatch::PAR_0,
            DataByte::Par3 => DataMatch::PAR_3,
            DataByte::Par4 => DataMatch::PAR_4,
            DataByte::Par5 => DataMatch::PAR_5,
        }
    }

    fn slot(self, row: &mut ExtRow) -> &mut u8 {
        match self {
            DataByte::Par0 => &mut row.par0,
            DataByte::Par3 => &mut row.par3,
            DataByte::Par4 => &mut row.par4,
            DataByte::Par5 => &mut row.par5,
        }
    }
}

/// Kind of the row currently being written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    #[default]
    Standard,
    Extended,
}

impl RowKind {
    /// Parse a `std`/`ext` token, ignoring case.
    pub fn from_token(token: &str) -> Result<Self, CodecError> {
        if eq_ignore_case(token, "std") {
            Ok(RowKind::Standard)
        } else if eq_ignore_case(token, "ext") {
            Ok(RowKind::Extended)
        } else {
            Err(CodecError::InvalidRowKind(token.to_string()))
        }
    }
}

/// A single write into the current row, decoded from one attribute value or
/// one element text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAction {
    /// `true`/`false` sets or clears the flag.
    Flag(RowFlags),
    /// 9-bit class value split into low byte and bit 8 flag.
    Class(ClassField),
    /// Single byte value.
    Byte(ByteField),
    /// Zone byte of the extended row. Ignored for standard rows.
    Zone(ZoneField),
    /// `true`/`false` sets or clears the match flag of the selected data byte.
    DataMatch,
    /// Value of the selected data byte.
    DataByte,
    /// `std`/`ext` row type.
    Kind,
}

impl FieldAction {
    /// Field name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            FieldAction::Flag(flag) => FLAG_NAMES
                .iter()
                .find(|(candidate, _)| candidate == flag)
                .map_or("flag", |(_, name)| *name),
            FieldAction::Class(ClassField::Mask) => "class mask",
            FieldAction::Class(ClassField::Filter) => "class filter",
            FieldAction::Byte(ByteField::Oaddr) => "oaddr",
            FieldAction::Byte(ByteField::TypeMask) => "type mask",
            FieldAction::Byte(ByteField::TypeFilter) => "type filter",
            FieldAction::Byte(ByteField::Action) => "action",
            FieldAction::Byte(ByteField::Param) => "param",
            FieldAction::Zone(ZoneField::Zone) => "zone",
            FieldAction::Zone(ZoneField::SubZone) => "sub-zone",
            FieldAction::DataMatch => "byte enabled",
            FieldAction::DataByte => "byte",
            FieldAction::Kind => "row type",
        }
    }
}

/// Write cursor over caller-owned decision matrix storage.
///
/// The standard table length is the capacity. An extended table, if bound,
/// must have the same length. The cursor never writes past the capacity:
/// opening or closing a row at `index == capacity` fails with
/// [`CodecError::Overflow`].
#[derive(Debug)]
pub struct TableWriter<'a> {
    rows: &'a mut [MatrixRow],
    ext: Option<&'a mut [ExtRow]>,
    index: usize,
    open: bool,
    kind: RowKind,
    data_byte: Option<DataByte>,
}

impl<'a> TableWriter<'a> {
    /// Bind a standard table only.
    pub fn new(rows: &'a mut [MatrixRow]) -> Self {
        Self {
            rows,
            ext: None,
            index: 0,
            open: false,
            kind: RowKind::Standard,
            data_byte: None,
        }
    }

    /// Bind a standard table and its parallel extended table.
    pub fn with_extended(
        rows: &'a mut [MatrixRow],
        ext: &'a mut [ExtRow],
    ) -> Result<Self, CodecError> {
        if rows.len() != ext.len() {
            return Err(CodecError::CapacityMismatch {
                std: rows.len(),
                ext: ext.len(),
            });
        }
        let mut writer = Self::new(rows);
        writer.ext = Some(ext);
        Ok(writer)
    }

    pub fn capacity(&self) -> usize {
        self.rows.len()
    }

    /// Number of completed rows.
    pub fn rows(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> RowKind {
        self.kind
    }

    pub fn is_row_open(&self) -> bool {
        self.open
    }

    pub fn has_extended(&self) -> bool {
        self.ext.is_some()
    }

    /// Zero every bound slot and rewind the cursor.
    pub fn clear(&mut self) {
        self.rows.fill(MatrixRow::default());
        if let Some(ext) = self.ext.as_deref_mut() {
            ext.fill(ExtRow::default());
        }
        self.index = 0;
        self.open = false;
        self.kind = RowKind::Standard;
        self.data_byte = None;
    }

    /// Open the row at the cursor and zero its slots.
    pub fn begin_row(&mut self) -> Result<(), CodecError> {
        let capacity = self.capacity();
        if self.index >= capacity {
            return Err(CodecError::Overflow { capacity });
        }
        self.rows[self.index] = MatrixRow::default();
        if let Some(ext) = self.ext.as_deref_mut() {
            ext[self.index] = ExtRow::default();
        }
        self.open = true;
        self.kind = RowKind::Standard;
        self.data_byte = None;
        debug!(index = self.index, "row start");
        Ok(())
    }

    /// Close the current row and advance the cursor.
    pub fn end_row(&mut self) -> Result<(), CodecError> {
        if !self.open {
            return Err(CodecError::NoRowOpen);
        }
        let capacity = self.capacity();
        if self.index >= capacity {
            return Err(CodecError::Overflow { capacity });
        }
        debug!(index = self.index, kind = ?self.kind, "row end");
        self.index += 1;
        self.open = false;
        self.data_byte = None;
        Ok(())
    }

    /// Select which data byte subsequent [`FieldAction::DataMatch`] and
    /// [`FieldAction::DataByte`] writes go to.
    pub fn select_data_byte(&mut self, id: u32) -> Result<DataByte, CodecError> {
        let byte = DataByte::from_id(id)?;
        self.data_byte = Some(byte);
        Ok(byte)
    }

    /// Apply element text; `None` means the element carried no text.
    ///
    /// Zone text of a standard row is not needed, so it may be absent.
    pub fn apply_text(&mut self, action: FieldAction, text: Option<&str>) -> Result<(), CodecError> {
        match (action, text) {
            (FieldAction::Zone(_), _) if self.open && self.kind != RowKind::Extended => {
                debug!(index = self.index, field = action.name(), "zone text ignored for standard row");
                Ok(())
            }
            (_, Some(text)) => self.apply(action, text),
            (_, None) => Err(CodecError::MissingValue(action.name())),
        }
    }

    /// Decode `value` and write it into the current row.
    pub fn apply(&mut self, action: FieldAction, value: &str) -> Result<(), CodecError> {
        if !self.open {
            return Err(CodecError::NoRowOpen);
        }
        let index = self.index;
        match action {
            FieldAction::Flag(flag) => {
                let on = parse_bool(value)?;
                self.rows[index].flags.set(flag, on);
            }
            FieldAction::Class(field) => {
                let raw = checked(action, value, CLASS_MAX)?;
                let row = &mut self.rows[index];
                let low = (raw & 0xFF) as u8;
                let bit8 = raw & 0x100 != 0;
                match field {
                    ClassField::Mask => {
                        row.class_mask = low;
                        row.flags.set(RowFlags::CLASS_MASK_BIT8, bit8);
                    }
                    ClassField::Filter => {
                        row.class_filter = low;
                        row.flags.set(RowFlags::CLASS_FILTER_BIT8, bit8);
                    }
                }
            }
            FieldAction::Byte(field) => {
                let byte = checked(action, value, BYTE_MAX)? as u8;
                let extended = self.kind == RowKind::Extended;
                match (field, self.ext.as_deref_mut()) {
                    (ByteField::Action, Some(ext)) if extended => ext[index].action = byte,
                    (ByteField::Param, Some(ext)) if extended => ext[index].action_param = byte,
                    (ByteField::Action, _) => self.rows[index].action = byte,
                    (ByteField::Param, _) => self.rows[index].action_param = byte,
                    (ByteField::Oaddr, _) => self.rows[index].oaddr = byte,
                    (ByteField::TypeMask, _) => self.rows[index].type_mask = byte,
                    (ByteField::TypeFilter, _) => self.rows[index].type_filter = byte,
                }
            }
            FieldAction::Zone(field) => {
                if self.kind != RowKind::Extended {
                    debug!(index, field = action.name(), "zone value ignored for standard row");
                    return Ok(());
                }
                let byte = checked(action, value, BYTE_MAX)? as u8;
                let ext = self.ext_row(index)?;
                match field {
                    ZoneField::Zone => ext.zone = byte,
                    ZoneField::SubZone => ext.sub_zone = byte,
                }
            }
            FieldAction::DataMatch => {
                let byte = self.selected_extended_byte()?;
                let on = parse_bool(value)?;
                let mut flags = self.rows[index].data_match();
                flags.set(byte.match_flag(), on);
                self.rows[index].action_param = flags.bits();
            }
            FieldAction::DataByte => {
                let byte = self.selected_extended_byte()?;
                let data = checked(action, value, BYTE_MAX)? as u8;
                *byte.slot(self.ext_row(index)?) = data;
            }
            FieldAction::Kind => match RowKind::from_token(value)? {
                RowKind::Standard => self.kind = RowKind::Standard,
                RowKind::Extended => {
                    if self.ext.is_none() {
                        return Err(CodecError::NoExtendedStorage);
                    }
                    self.rows[index].action = ACTION_EXTENDED;
                    self.kind = RowKind::Extended;
                }
            },
        }
        debug!(index, field = action.name(), value, "row write");
        Ok(())
    }

    fn selected_extended_byte(&self) -> Result<DataByte, CodecError> {
        if self.kind != RowKind::Extended {
            return Err(CodecError::NotExtended);
        }
        self.data_byte.ok_or(CodecError::NoByteSelected)
    }

    fn ext_row(&mut self, index: usize) -> Result<&mut ExtRow, CodecError> {
        self.ext
            .as_deref_mut()
            .map(|ext| &mut ext[index])
            .ok_or(CodecError::NoExtendedStorage)
    }
}

fn checked(action: FieldAction, value: &str, max: u32) -> Result<u32, CodecError> {
    let raw = parse_unsigned(value);
    if raw > max {
        return Err(CodecError::OutOfRange {
            field: action.name(),
            value: raw,
            max,
        });
    }
    Ok(raw)
}
