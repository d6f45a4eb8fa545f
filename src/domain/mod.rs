//! Domain layer: pure types and text transformations with no I/O.

pub mod diagnostic;
pub mod document;
pub mod link;
pub mod outcome;
