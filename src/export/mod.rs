//! Export targets: PDF conversion and attachments on disk.

pub mod attachment;
pub mod pdf;
