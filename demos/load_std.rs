//! Load a standard decision matrix and print its rows.
//!
//! `cargo run --example load_std -- path/to/dm.xml`; without a path a
//! built-in document is parsed.

use std::env;
use std::error::Error;

use tracing_subscriber::EnvFilter;
use vscp_dm::{encode_table, load_std, parse_std, MatrixRow};

const DOCUMENT: &str = r#"<?xml version="1.0"?>
<dm version="1.0" level="1" type="std">
    <row enabled="true">
        <oaddr enabled="false">0</oaddr>
        <mask class="0x1ff" type="0xff"/>
        <filter class="0x14" type="0x03"/>
        <zone enabled="true">1</zone>
        <action>0x10</action>
        <param>0x02</param>
    </row>
    <row enabled="false">
        <mask class="0" type="0"/>
        <filter class="0" type="0"/>
        <action>0x20</action>
        <param>0</param>
    </row>
</dm>
"#;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with_target(false)
        .init();

    let mut rows = [MatrixRow::default(); 32];
    let count = match env::args().nth(1) {
        Some(path) => load_std(&path, &mut rows)?,
        None => parse_std(DOCUMENT, &mut rows)?,
    };

    let encoded = encode_table(&rows[..count]);
    for (idx, chunk) in encoded.chunks(vscp_dm::ROW_SIZE).enumerate() {
        println!("{idx:>3}: {chunk:02X?}");
    }
    Ok(())
}
