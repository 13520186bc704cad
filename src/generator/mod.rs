//! Generated artifacts consumed by the page-rendering layer.

pub mod metadata;
