//! Handlers 模块

pub mod backup;
pub mod commands;
pub mod system;

pub use backup::*;
pub use commands::*;
pub use system::*;
