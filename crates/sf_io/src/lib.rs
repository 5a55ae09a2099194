// crates/sf_io/src/lib.rs

//! StoneFlow 状态快照层
//!
//! 小端二进制快照的保存与载入，保证往返逐位一致。

pub mod state_file;

pub use state_file::{load_state, save_state};
