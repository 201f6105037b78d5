pub mod cmd_load;
pub mod cmd_schema;
pub mod common;
