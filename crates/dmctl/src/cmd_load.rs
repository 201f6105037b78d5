use std::path::Path;

use anyhow::{Context, Result};
use dm_core::{encode_table, ExtRow, MatrixRow, ROW_SIZE};
use tracing::info;

use crate::common::{self, ExtEntry, RowEntry};

#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub hex: bool,
}

pub fn run_std(path: &Path, capacity: usize, output: Output) -> Result<()> {
    let mut rows = vec![MatrixRow::default(); capacity];
    let count = dm_xml::load_std(path, &mut rows)
        .with_context(|| format!("load standard decision matrix {}", path.display()))?;
    info!(rows = count, capacity, "standard matrix ready");
    let rows = &rows[..count];

    if output.hex {
        for line in common::hex_lines(&encode_table(rows)) {
            println!("{line}");
        }
    } else if output.json {
        let entries: Vec<RowEntry> = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| RowEntry::new(idx, row))
            .collect();
        common::print_json(&entries)?;
    } else {
        print_rows(rows);
    }
    Ok(())
}

pub fn run_ext(path: &Path, capacity: usize, output: Output) -> Result<()> {
    let mut rows = vec![MatrixRow::default(); capacity];
    let mut ext = vec![ExtRow::default(); capacity];
    let count = dm_xml::load_ext(path, &mut rows, &mut ext)
        .with_context(|| format!("load extended decision matrix {}", path.display()))?;
    info!(rows = count, capacity, "extended matrix ready");
    let (rows, ext) = (&rows[..count], &ext[..count]);

    if output.hex {
        let mut encoded = Vec::with_capacity(count * ROW_SIZE);
        ext.iter().for_each(|row| row.encode(&mut encoded));
        println!("standard:");
        for line in common::hex_lines(&encode_table(rows)) {
            println!("{line}");
        }
        println!("extended:");
        for line in common::hex_lines(&encoded) {
            println!("{line}");
        }
    } else if output.json {
        #[derive(serde::Serialize)]
        struct Tables {
            rows: Vec<RowEntry>,
            extended: Vec<ExtEntry>,
        }
        let tables = Tables {
            rows: rows
                .iter()
                .enumerate()
                .map(|(idx, row)| RowEntry::new(idx, row))
                .collect(),
            extended: rows
                .iter()
                .zip(ext)
                .enumerate()
                .filter(|(_, (row, _))| row.is_extended())
                .map(|(idx, (row, ext))| ExtEntry::new(idx, row, ext))
                .collect(),
        };
        common::print_json(&tables)?;
    } else {
        print_rows(rows);
        let extended: Vec<_> = rows
            .iter()
            .zip(ext)
            .enumerate()
            .filter(|(_, (row, _))| row.is_extended())
            .collect();
        if extended.is_empty() {
            return Ok(());
        }
        println!();
        println!(
            "{:<6} {:<6} {:<8} {:<8} {:<8} {}",
            "INDEX", "ZONE", "SUBZONE", "ACTION", "PARAM", "DATA (0,3,4,5)"
        );
        for (idx, (row, ext)) in extended {
            let entry = ExtEntry::new(idx, row, ext);
            let data = entry
                .data
                .iter()
                .map(|b| b.map_or_else(|| "--".to_string(), |b| format!("{b:02X}")))
                .collect::<Vec<_>>()
                .join(" ");
            println!(
                "{idx:<6} {:<6} {:<8} {:<8} {:<8} {data}",
                format!("{:#04x}", entry.zone),
                format!("{:#04x}", entry.sub_zone),
                format!("{:#04x}", entry.action),
                format!("{:#04x}", entry.action_param),
            );
        }
    }
    Ok(())
}

fn print_rows(rows: &[MatrixRow]) {
    if rows.is_empty() {
        println!("Decision matrix is empty.");
        return;
    }
    println!(
        "{:<6} {:<4} {:<6} {:<4} {:<4} {:<4} {:<4} {:<12} {:<12} {:<8} {}",
        "INDEX", "EN", "OADDR", "CHK", "HC", "ZN", "SZN", "CLASS", "TYPE", "ACTION", "PARAM"
    );
    for (idx, row) in rows.iter().enumerate() {
        let entry = RowEntry::new(idx, row);
        let action = if entry.extended {
            "ext".to_string()
        } else {
            format!("{:#04x}", entry.action)
        };
        println!(
            "{idx:<6} {:<4} {:<6} {:<4} {:<4} {:<4} {:<4} {:<12} {:<12} {:<8} {:#04x}",
            common::flag(entry.enabled),
            format!("{:#04x}", entry.oaddr),
            common::flag(entry.check_oaddr),
            common::flag(entry.hardcoded),
            common::flag(entry.match_zone),
            common::flag(entry.match_sub_zone),
            format!("{:03X}/{:03X}", entry.class_mask, entry.class_filter),
            format!("{:02X}/{:02X}", entry.type_mask, entry.type_filter),
            action,
            entry.action_param,
        );
    }
}
