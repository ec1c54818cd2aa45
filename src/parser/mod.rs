//! Source adapters: EML and MSG extraction shims behind one interface.

pub mod eml;
pub mod header;
pub mod highlight;
pub mod msg;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ExportError, Result};
use crate::model::mail::{MailFormat, ParsedMail};

/// Maps one container format onto [`ParsedMail`].
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The container format this adapter understands.
    fn format(&self) -> MailFormat;

    /// Decode a fully buffered container.
    async fn parse_bytes(&self, data: &[u8]) -> Result<ParsedMail>;

    /// Drain `input` completely, then decode it.
    async fn parse_stream(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<ParsedMail> {
        let mut data = Vec::new();
        input.read_to_end(&mut data).await?;
        tracing::debug!(format = ?self.format(), bytes = data.len(), "Buffered input stream");
        self.parse_bytes(&data).await
    }
}

/// The adapters available to a document, used again for nested mail attachments.
#[derive(Clone)]
pub struct Adapters {
    eml: Arc<dyn SourceAdapter>,
    msg: Option<Arc<dyn SourceAdapter>>,
}

impl Adapters {
    /// EML support only.
    pub fn eml_only() -> Self {
        Self {
            eml: Arc::new(eml::EmlAdapter),
            msg: None,
        }
    }

    /// EML plus an MSG adapter.
    pub fn with_msg(msg: Arc<dyn SourceAdapter>) -> Self {
        Self {
            eml: Arc::new(eml::EmlAdapter),
            msg: Some(msg),
        }
    }

    /// The adapter for `format`, or `Unsupported` if none is configured.
    pub fn get(&self, format: MailFormat) -> Result<Arc<dyn SourceAdapter>> {
        match format {
            MailFormat::Eml => Ok(Arc::clone(&self.eml)),
            MailFormat::Msg => self.msg.clone().ok_or_else(|| {
                ExportError::Unsupported("no MSG compound-file reader is configured".into())
            }),
        }
    }
}

impl Default for Adapters {
    fn default() -> Self {
        Self::eml_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_requires_reader() {
        let adapters = Adapters::eml_only();
        assert!(adapters.get(MailFormat::Eml).is_ok());
        assert!(matches!(
            adapters.get(MailFormat::Msg),
            Err(ExportError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_stream_drains_input() {
        let raw = b"Subject: Streamed\r\n\r\nBody\r\n".to_vec();
        let mut reader: &[u8] = &raw;
        let mail = eml::EmlAdapter.parse_stream(&mut reader).await.unwrap();
        assert_eq!(mail.subject.as_deref(), Some("Streamed"));
        assert!(reader.is_empty());
    }
}
