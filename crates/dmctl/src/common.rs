use anyhow::{Context, Result};
use dm_core::{DataMatch, ExtRow, MatrixRow, RowFlags, ROW_SIZE};
use serde::Serialize;

/// Capacity used when `--rows` is not given.
pub const DEFAULT_ROWS: usize = 32;

#[derive(Serialize)]
pub struct RowEntry {
    pub index: usize,
    pub enabled: bool,
    pub extended: bool,
    pub oaddr: u8,
    pub check_oaddr: bool,
    pub hardcoded: bool,
    pub match_zone: bool,
    pub match_sub_zone: bool,
    pub class_mask: u16,
    pub class_filter: u16,
    pub type_mask: u8,
    pub type_filter: u8,
    pub action: u8,
    pub action_param: u8,
}

impl RowEntry {
    pub fn new(index: usize, row: &MatrixRow) -> Self {
        Self {
            index,
            enabled: row.is_enabled(),
            extended: row.is_extended(),
            oaddr: row.oaddr,
            check_oaddr: row.flags.contains(RowFlags::CHECK_OADDR),
            hardcoded: row.flags.contains(RowFlags::HARDCODED),
            match_zone: row.flags.contains(RowFlags::MATCH_ZONE),
            match_sub_zone: row.flags.contains(RowFlags::MATCH_SUB_ZONE),
            class_mask: row.class_mask_value(),
            class_filter: row.class_filter_value(),
            type_mask: row.type_mask,
            type_filter: row.type_filter,
            action: row.action,
            action_param: row.action_param,
        }
    }
}

/// Extended part of a row; `None` entries in `data` are bytes not matched.
#[derive(Serialize)]
pub struct ExtEntry {
    pub index: usize,
    pub zone: u8,
    pub sub_zone: u8,
    pub action: u8,
    pub action_param: u8,
    pub data: [Option<u8>; 4],
}

impl ExtEntry {
    pub fn new(index: usize, row: &MatrixRow, ext: &ExtRow) -> Self {
        let matched = row.data_match();
        let pick = |flag: DataMatch, value: u8| matched.contains(flag).then_some(value);
        Self {
            index,
            zone: ext.zone,
            sub_zone: ext.sub_zone,
            action: ext.action,
            action_param: ext.action_param,
            data: [
                pick(DataMatch::PAR_0, ext.par0),
                pick(DataMatch::PAR_3, ext.par3),
                pick(DataMatch::PAR_4, ext.par4),
                pick(DataMatch::PAR_5, ext.par5),
            ],
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialise JSON output")?;
    println!("{text}");
    Ok(())
}

/// One line per encoded row: index followed by its register bytes.
pub fn hex_lines(encoded: &[u8]) -> Vec<String> {
    encoded
        .chunks(ROW_SIZE)
        .enumerate()
        .map(|(idx, chunk)| {
            let bytes = chunk
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{idx:>3}: {bytes}")
        })
        .collect()
}

pub fn flag(on: bool) -> &'static str {
    if on {
        "y"
    } else {
        "-"
    }
}
