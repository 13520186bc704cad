//! Utility modules for the content pipeline.

pub mod command;
pub mod date;
pub mod fs;
pub mod log;
