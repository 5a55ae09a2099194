// apps/sf_cli/src/commands/mod.rs

pub mod info;
pub mod run;
pub mod validate;
