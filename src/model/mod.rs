//! Core data model types: addresses, attachments, headers and documents.

pub mod address;
pub mod attachment;
pub mod mail;
