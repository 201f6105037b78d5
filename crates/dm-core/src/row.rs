//! Fixed-layout decision matrix rows.

use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::CodecError;

/// Size of one encoded row (standard or extended) in bytes.
pub const ROW_SIZE: usize = 8;

/// Reserved action code marking a standard row whose payload lives in the
/// extended row at the same index.
pub const ACTION_EXTENDED: u8 = 0xFF;

bitflags! {
    /// Flag byte of a standard decision matrix row.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RowFlags: u8 {
        /// Row takes part in event matching.
        const ENABLE = 0x80;
        /// Originating address must match `oaddr`.
        const CHECK_OADDR = 0x40;
        /// Originating node must be a hardcoded node.
        const HARDCODED = 0x20;
        /// Event zone must match the node zone.
        const MATCH_ZONE = 0x10;
        /// Event sub-zone must match the node sub-zone.
        const MATCH_SUB_ZONE = 0x08;
        /// Bit 8 of the class mask.
        const CLASS_MASK_BIT8 = 0x02;
        /// Bit 8 of the class filter.
        const CLASS_FILTER_BIT8 = 0x01;
    }
}

bitflags! {
    /// Data byte match flags, stored in the action parameter of a standard
    /// row that is marked extended.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DataMatch: u8 {
        const PAR_0 = 0x01;
        const PAR_3 = 0x08;
        const PAR_4 = 0x10;
        const PAR_5 = 0x20;
    }
}

/// Standard decision matrix row.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixRow {
    /// Originating address, checked when [`RowFlags::CHECK_OADDR`] is set.
    pub oaddr: u8,
    pub flags: RowFlags,
    /// Low byte of the 9-bit class mask.
    pub class_mask: u8,
    /// Low byte of the 9-bit class filter.
    pub class_filter: u8,
    pub type_mask: u8,
    pub type_filter: u8,
    pub action: u8,
    pub action_param: u8,
}

impl MatrixRow {
    /// True if the row defers to the extended row at the same index.
    pub fn is_extended(&self) -> bool {
        self.action == ACTION_EXTENDED
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(RowFlags::ENABLE)
    }

    /// Full 9-bit class mask.
    pub fn class_mask_value(&self) -> u16 {
        nine_bit(
            self.class_mask,
            self.flags.contains(RowFlags::CLASS_MASK_BIT8),
        )
    }

    /// Full 9-bit class filter.
    pub fn class_filter_value(&self) -> u16 {
        nine_bit(
            self.class_filter,
            self.flags.contains(RowFlags::CLASS_FILTER_BIT8),
        )
    }

    /// Data byte match flags. Only meaningful for extended rows.
    pub fn data_match(&self) -> DataMatch {
        DataMatch::from_bits_truncate(self.action_param)
    }

    /// Append the register representation of the row.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.oaddr);
        buf.put_u8(self.flags.bits());
        buf.put_u8(self.class_mask);
        buf.put_u8(self.class_filter);
        buf.put_u8(self.type_mask);
        buf.put_u8(self.type_filter);
        buf.put_u8(self.action);
        buf.put_u8(self.action_param);
    }

    /// Decode a row from its register representation.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < ROW_SIZE {
            return Err(CodecError::ShortBuffer {
                needed: ROW_SIZE,
                got: buf.len(),
            });
        }
        let mut cursor = buf;
        Ok(Self {
            oaddr: cursor.get_u8(),
            flags: RowFlags::from_bits_retain(cursor.get_u8()),
            class_mask: cursor.get_u8(),
            class_filter: cursor.get_u8(),
            type_mask: cursor.get_u8(),
            type_filter: cursor.get_u8(),
            action: cursor.get_u8(),
            action_param: cursor.get_u8(),
        })
    }
}

/// Extension of a standard row, indexed 1:1 with the standard table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtRow {
    pub zone: u8,
    pub sub_zone: u8,
    pub action: u8,
    pub action_param: u8,
    pub par0: u8,
    pub par3: u8,
    pub par4: u8,
    pub par5: u8,
}

impl ExtRow {
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_slice(&[
            self.zone,
            self.sub_zone,
            self.action,
            self.action_param,
            self.par0,
            self.par3,
            self.par4,
            self.par5,
        ]);
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < ROW_SIZE {
            return Err(CodecError::ShortBuffer {
                needed: ROW_SIZE,
                got: buf.len(),
            });
        }
        let mut cursor = buf;
        Ok(Self {
            zone: cursor.get_u8(),
            sub_zone: cursor.get_u8(),
            action: cursor.get_u8(),
            action_param: cursor.get_u8(),
            par0: cursor.get_u8(),
            par3: cursor.get_u8(),
            par4: cursor.get_u8(),
            par5: cursor.get_u8(),
        })
    }
}

/// Encode a whole standard table into consecutive register rows.
pub fn encode_table(rows: &[MatrixRow]) -> Bytes {
    let mut buffer = BytesMut::with_capacity(rows.len() * ROW_SIZE);
    for row in rows {
        row.encode(&mut buffer);
    }
    buffer.freeze()
}

fn nine_bit(low: u8, bit8: bool) -> u16 {
    (low as u16) | if bit8 { 0x100 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_layout_order() {
        let row = MatrixRow {
            oaddr: 0x01,
            flags: RowFlags::ENABLE | RowFlags::CLASS_FILTER_BIT8,
            class_mask: 0x03,
            class_filter: 0x04,
            type_mask: 0x05,
            type_filter: 0x06,
            action: 0x07,
            action_param: 0x08,
        };
        let mut buf = BytesMut::new();
        row.encode(&mut buf);
        assert_eq!(&buf[..], &[0x01, 0x81, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        assert_eq!(MatrixRow::decode(&buf).expect("decode"), row);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let err = ExtRow::decode(&[0u8; 7]).unwrap_err();
        assert!(matches!(err, CodecError::ShortBuffer { needed: 8, got: 7 }));
    }

    #[test]
    fn nine_bit_class_values() {
        let row = MatrixRow {
            class_mask: 0x01,
            class_filter: 0xFF,
            flags: RowFlags::CLASS_MASK_BIT8,
            ..MatrixRow::default()
        };
        assert_eq!(row.class_mask_value(), 0x101);
        assert_eq!(row.class_filter_value(), 0x0FF);
    }

    #[test]
    fn table_encoding_concatenates_rows() {
        let rows = [
            MatrixRow {
                action: ACTION_EXTENDED,
                action_param: (DataMatch::PAR_0 | DataMatch::PAR_5).bits(),
                ..MatrixRow::default()
            },
            MatrixRow::default(),
        ];
        assert!(rows[0].is_extended());
        assert_eq!(rows[0].data_match(), DataMatch::PAR_0 | DataMatch::PAR_5);
        let bytes = encode_table(&rows);
        assert_eq!(bytes.len(), 2 * ROW_SIZE);
        assert_eq!(bytes[6], ACTION_EXTENDED);
        assert!(bytes[ROW_SIZE..].iter().all(|b| *b == 0));
    }
}
