//! CLI command implementations.

pub mod agent;
pub mod init;
pub mod knowledge;
pub mod tool;
