//! `mail-export`: normalize EML and MSG mail containers into one document
//! model and render them as self-contained HTML, ready for archival or
//! PDF conversion.
//!
//! ```no_run
//! # async fn demo() -> mail_export::error::Result<()> {
//! use mail_export::{Document, RenderOptions};
//!
//! let file = tokio::fs::File::open("message.eml").await?;
//! let doc = Document::init_eml(file, RenderOptions::default()).await?;
//! let html = doc.get_as_html(None).await?;
//! # let _ = html;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod format;
pub mod model;
pub mod options;
pub mod parser;
pub mod render;

pub use document::Document;
pub use error::{ExportError, Result};
pub use model::mail::{Header, MailFormat};
pub use options::RenderOptions;
