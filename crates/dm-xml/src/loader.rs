//! Load entry points.
//!
//! Every entry point zeroes its destination before parsing and again on any
//! failure, so a caller never sees a partially written table.

use std::fs;
use std::path::Path;

use dm_core::{CodecError, ExtRow, MatrixRow, TableWriter};
use tracing::{debug, info};

use crate::context::ParseContext;
use crate::extended::ExtendedValidator;
use crate::schema::{SchemaEngine, STANDARD};
use crate::tokenizer::tokenize;
use crate::{LoadError, ParseError, ParseErrorKind};

fn check_path(path: &Path) -> Result<(), LoadError> {
    if path.as_os_str().is_empty() {
        return Err(LoadError::MissingArgument("path"));
    }
    Ok(())
}

/// Read the whole document into an owned buffer.
///
/// Only a failed read is a file error. A document that is not UTF-8 was
/// read fine and is rejected as malformed.
fn stage_file(path: &Path) -> Result<String, LoadError> {
    check_path(path)?;
    let raw = fs::read(path).map_err(|source| LoadError::File {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = raw.len(), "document staged");
    String::from_utf8(raw).map_err(|err| {
        let valid = &err.as_bytes()[..err.utf8_error().valid_up_to()];
        let line = 1 + valid.iter().filter(|b| **b == b'\n').count() as u64;
        ParseError::new(line, ParseErrorKind::Syntax(err.utf8_error().to_string())).into()
    })
}

fn check_tables(rows: &[MatrixRow], ext: &[ExtRow]) -> Result<(), LoadError> {
    if rows.len() != ext.len() {
        return Err(LoadError::TableMismatch {
            std: rows.len(),
            ext: ext.len(),
        });
    }
    Ok(())
}

fn clear<T: Default>(table: &mut [T]) {
    table.iter_mut().for_each(|slot| *slot = T::default());
}

/// Parse a standard-dialect document held in memory into `rows`.
///
/// The table length is the capacity. Returns the number of rows written.
pub fn parse_std(xml: &str, rows: &mut [MatrixRow]) -> Result<usize, LoadError> {
    let outcome = {
        let mut writer = TableWriter::new(rows);
        writer.clear();
        let mut engine = SchemaEngine::new(&STANDARD, ParseContext::new(writer));
        let tokenized = tokenize(xml, &mut engine);
        engine.ctx.finish(tokenized)
    };
    match outcome {
        Ok(count) => {
            info!(rows = count, capacity = rows.len(), "standard decision matrix loaded");
            Ok(count)
        }
        Err(err) => {
            clear(rows);
            Err(err.into())
        }
    }
}

/// Parse an extended-dialect document held in memory into `rows` and its
/// parallel table `ext`.
///
/// Both tables must have the same length.
pub fn parse_ext(
    xml: &str,
    rows: &mut [MatrixRow],
    ext: &mut [ExtRow],
) -> Result<usize, LoadError> {
    let outcome = {
        let mut writer = TableWriter::with_extended(rows, ext).map_err(|err| match err {
            CodecError::CapacityMismatch { std, ext } => LoadError::TableMismatch { std, ext },
            other => LoadError::from(ParseError::codec(0, "dm", other)),
        })?;
        writer.clear();
        let mut validator = ExtendedValidator::new(ParseContext::new(writer));
        let tokenized = tokenize(xml, &mut validator);
        validator.ctx.finish(tokenized)
    };
    match outcome {
        Ok(count) => {
            info!(rows = count, capacity = rows.len(), "extended decision matrix loaded");
            Ok(count)
        }
        Err(err) => {
            clear(rows);
            clear(ext);
            Err(err.into())
        }
    }
}

/// Load a standard-dialect decision matrix file into `rows`.
pub fn load_std(path: impl AsRef<Path>, rows: &mut [MatrixRow]) -> Result<usize, LoadError> {
    let xml = stage_file(path.as_ref())?;
    parse_std(&xml, rows)
}

/// Load an extended-dialect decision matrix file into `rows` and `ext`.
pub fn load_ext(
    path: impl AsRef<Path>,
    rows: &mut [MatrixRow],
    ext: &mut [ExtRow],
) -> Result<usize, LoadError> {
    check_tables(rows, ext)?;
    let xml = stage_file(path.as_ref())?;
    parse_ext(&xml, rows, ext)
}

/// Next-generation matrix load. No dialect is defined yet: arguments are
/// validated and the file is staged, `storage` is left untouched.
pub fn load_ng(path: impl AsRef<Path>, storage: &mut [u8]) -> Result<(), LoadError> {
    let path = path.as_ref();
    check_path(path)?;
    if storage.is_empty() {
        return Err(LoadError::MissingArgument("storage"));
    }
    let xml = stage_file(path)?;
    debug!(bytes = xml.len(), capacity = storage.len(), "next generation matrix not parsed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;
    use dm_core::RowFlags;

    fn std_doc(rows: &str) -> String {
        format!(r#"<dm version="1.0" level="1" type="std">{rows}</dm>"#)
    }

    fn ext_doc(rows: &str) -> String {
        format!(r#"<dm version="1.0" level="1" type="ext">{rows}</dm>"#)
    }

    fn std_row(action: &str) -> String {
        format!(
            r#"<row enabled="true">
                <mask class="0x1ff" type="0xff"/>
                <filter class="0x100" type="0x06"/>
                <action>{action}</action>
                <param>0</param>
            </row>"#
        )
    }

    fn rows_of(n: usize) -> String {
        (0..n).map(|i| std_row(&i.to_string())).collect()
    }

    /// Parse failure reason of a rejected load.
    fn rejection(err: LoadError) -> ParseErrorKind {
        match err {
            LoadError::Parse(err) => err.kind,
            other => panic!("expected a parse failure, got {other}"),
        }
    }

    #[test]
    fn standard_row_end_to_end() {
        let mut rows = [MatrixRow::default(); 4];
        let count = parse_std(&std_doc(&std_row("0x10")), &mut rows).unwrap();
        assert_eq!(count, 1);
        let row = rows[0];
        assert!(row.is_enabled());
        assert_eq!(row.class_mask, 0xFF);
        assert_eq!(row.class_filter, 0x00);
        assert!(row
            .flags
            .contains(RowFlags::CLASS_MASK_BIT8 | RowFlags::CLASS_FILTER_BIT8));
        assert_eq!((row.type_mask, row.type_filter), (0xFF, 0x06));
        assert_eq!((row.action, row.action_param), (0x10, 0));
        assert!(rows[1..].iter().all(|r| *r == MatrixRow::default()));
    }

    #[test]
    fn one_row_document_scenario() {
        let xml = std_doc(
            r#"<row enabled="true">
                <mask class="0x101" type="0"/>
                <filter class="0" type="0"/>
                <zone enabled="true"/>
                <subzone enabled="false"/>
                <oaddr enabled="false">0</oaddr>
                <action>200</action>
                <param>5</param>
            </row>"#,
        );
        let mut rows = [MatrixRow::default(); 2];
        assert_eq!(parse_std(&xml, &mut rows).unwrap(), 1);
        let row = rows[0];
        assert!(row.is_enabled());
        assert_eq!(row.class_mask, 0x01);
        assert!(row.flags.contains(RowFlags::CLASS_MASK_BIT8));
        assert!(!row.flags.contains(RowFlags::CLASS_FILTER_BIT8));
        assert!(row.flags.contains(RowFlags::MATCH_ZONE));
        assert!(!row.flags.contains(RowFlags::MATCH_SUB_ZONE));
        assert!(!row.flags.contains(RowFlags::CHECK_OADDR));
        assert_eq!(row.oaddr, 0);
        assert_eq!((row.action, row.action_param), (0xC8, 5));
        assert_eq!(rows[1], MatrixRow::default());
    }

    #[test]
    fn full_table_loads() {
        let mut rows = [MatrixRow::default(); 3];
        assert_eq!(parse_std(&std_doc(&rows_of(3)), &mut rows).unwrap(), 3);
        assert_eq!(rows[2].action, 2);
    }

    #[test]
    fn capacity_plus_one_overflows_and_clears() {
        let mut rows = [MatrixRow::default(); 3];
        let err = parse_std(&std_doc(&rows_of(4)), &mut rows).unwrap_err();
        assert!(matches!(
            rejection(err),
            ParseErrorKind::Codec {
                source: CodecError::Overflow { capacity: 3 },
                ..
            }
        ));
        assert!(rows.iter().all(|r| *r == MatrixRow::default()));
    }

    #[test]
    fn extended_capacity_plus_one_overflows_and_clears() {
        let row = r#"<row enabled="true" type="ext">
                <zone enabled="true">1</zone>
                <action>2</action>
                <param>3</param>
                <data><byte id="4" enabled="true">9</byte></data>
            </row>"#;
        let xml = ext_doc(&row.repeat(3));
        let mut rows = [MatrixRow::default(); 2];
        let mut ext = [ExtRow::default(); 2];
        let err = parse_ext(&xml, &mut rows, &mut ext).unwrap_err();
        assert!(matches!(
            rejection(err),
            ParseErrorKind::Codec {
                source: CodecError::Overflow { capacity: 2 },
                ..
            }
        ));
        assert!(rows.iter().all(|r| *r == MatrixRow::default()));
        assert!(ext.iter().all(|r| *r == ExtRow::default()));

        let xml = ext_doc(&row.repeat(2));
        assert_eq!(parse_ext(&xml, &mut rows, &mut ext).unwrap(), 2);
        assert_eq!(ext[1].par4, 9);
    }

    #[test]
    fn failure_discards_earlier_rows() {
        let mut rows = [MatrixRow {
            action: 0x55,
            ..MatrixRow::default()
        }; 3];
        let xml = std_doc(&format!("{}{}", rows_of(2), std_row("0x100")));
        let err = parse_std(&xml, &mut rows).unwrap_err();
        assert!(matches!(
            rejection(err),
            ParseErrorKind::Codec {
                source: CodecError::OutOfRange { value: 0x100, .. },
                ..
            }
        ));
        assert!(rows.iter().all(|r| *r == MatrixRow::default()));
    }

    #[test]
    fn range_boundaries() {
        let mut rows = [MatrixRow::default(); 1];
        let class = |value: &str| {
            std_doc(&format!(
                r#"<row enabled="true"><mask class="{value}" type="0"/></row>"#
            ))
        };
        assert_eq!(parse_std(&class("0x1FF"), &mut rows).unwrap(), 1);
        assert!(parse_std(&class("0x200"), &mut rows).is_err());
        assert_eq!(parse_std(&std_doc(&std_row("255")), &mut rows).unwrap(), 1);
        assert!(parse_std(&std_doc(&std_row("256")), &mut rows).is_err());
        assert!(parse_std(&std_doc(&std_row("-1")), &mut rows).is_err());
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let mut rows = [MatrixRow::default(); 2];
        let xml = r#"<dm version="1.0" level="1" type="std"><row enabled="true">"#;
        let err = parse_std(xml, &mut rows).unwrap_err();
        assert_eq!(err.status(), Status::Parse);
        assert!(matches!(rejection(err), ParseErrorKind::Syntax(_)));
    }

    #[test]
    fn second_document_element_is_rejected() {
        let std_xml = std_doc(&std_row("1")).repeat(2);
        let mut rows = [MatrixRow::default(); 4];
        let err = parse_std(&std_xml, &mut rows).unwrap_err();
        assert!(matches!(rejection(err), ParseErrorKind::Syntax(_)));
        assert!(rows.iter().all(|r| *r == MatrixRow::default()));

        let ext_xml = ext_doc(r#"<row enabled="true" type="std"><action>1</action></row>"#).repeat(2);
        let mut ext = [ExtRow::default(); 4];
        let err = parse_ext(&ext_xml, &mut rows, &mut ext).unwrap_err();
        assert!(matches!(rejection(err), ParseErrorKind::Syntax(_)));
        assert!(rows.iter().all(|r| *r == MatrixRow::default()));

        let junk = format!("garbage{}trailing", std_doc(""));
        let err = parse_std(&junk, &mut rows).unwrap_err();
        assert!(matches!(rejection(err), ParseErrorKind::Syntax(_)));
    }

    #[test]
    fn empty_document_loads_nothing() {
        let mut rows = [MatrixRow {
            oaddr: 9,
            ..MatrixRow::default()
        }; 2];
        assert_eq!(parse_std(&std_doc(""), &mut rows).unwrap(), 0);
        assert!(rows.iter().all(|r| *r == MatrixRow::default()));
    }

    #[test]
    fn extended_tables_must_match() {
        let mut rows = [MatrixRow {
            oaddr: 1,
            ..MatrixRow::default()
        }; 2];
        let mut ext = [ExtRow::default(); 3];
        let err = parse_ext("<dm/>", &mut rows, &mut ext).unwrap_err();
        assert!(matches!(err, LoadError::TableMismatch { std: 2, ext: 3 }));
        assert_eq!(err.status(), Status::InvalidArgument);
        // Argument errors leave the caller's storage alone.
        assert_eq!(rows[0].oaddr, 1);
    }

    #[test]
    fn extended_failure_clears_both_tables() {
        let mut rows = [MatrixRow::default(); 2];
        let mut ext = [ExtRow {
            zone: 1,
            ..ExtRow::default()
        }; 2];
        let xml = ext_doc(
            r#"<row enabled="true" type="ext"><zone enabled="true">5</zone></row>
            <row enabled="true" type="ext"><zone enabled="true">0x1000</zone></row>"#,
        );
        let err = parse_ext(&xml, &mut rows, &mut ext).unwrap_err();
        assert_eq!(err.status(), Status::Parse);
        assert!(rows.iter().all(|r| *r == MatrixRow::default()));
        assert!(ext.iter().all(|r| *r == ExtRow::default()));
    }

    #[test]
    fn extended_dialect_rejects_standard_document() {
        let mut rows = [MatrixRow::default(); 2];
        let mut ext = [ExtRow::default(); 2];
        let err = parse_ext(&std_doc(&std_row("1")), &mut rows, &mut ext).unwrap_err();
        assert!(matches!(
            rejection(err),
            ParseErrorKind::Mismatch {
                attribute: "type",
                ..
            }
        ));
    }

    #[test]
    fn empty_path_is_an_argument_error() {
        let mut rows = [MatrixRow::default(); 1];
        let err = load_std("", &mut rows).unwrap_err();
        assert!(matches!(err, LoadError::MissingArgument("path")));
        assert_eq!(err.status(), Status::InvalidArgument);
    }

    #[test]
    fn next_generation_requires_storage() {
        let err = load_ng("matrix.xml", &mut []).unwrap_err();
        assert!(matches!(err, LoadError::MissingArgument("storage")));
    }
}
