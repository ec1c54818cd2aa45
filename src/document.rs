//! The document facade: one mail container, parsed once, rendered many times.
//!
//! A [`Document`] owns its input stream until the first access parses it.
//! Every accessor is `&self` and may be called concurrently; concurrent
//! first accesses share a single parse. Render options passed to an
//! accessor apply to that call only.

use std::borrow::Cow;
use std::io::Cursor;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::{Mutex, OnceCell};

use crate::classify::{AttachmentClassifier, MAX_NESTING_DEPTH};
use crate::error::{ExportError, Result};
use crate::model::attachment::Attachment;
use crate::model::mail::{Header, MailDocument, MailFormat, ParsedMail};
use crate::options::RenderOptions;
use crate::parser::header::build_header;
use crate::parser::highlight::highlight;
use crate::parser::{Adapters, SourceAdapter};
use crate::render::{listed_attachments, AttachmentEntry, HtmlRenderer};

type Input = Box<dyn AsyncRead + Send + Unpin>;

struct Parsed {
    mail: ParsedMail,
    /// Body HTML highlighted with the document's own options.
    body_html: Option<String>,
}

/// A single EML or MSG mail.
pub struct Document {
    format: MailFormat,
    adapters: Adapters,
    options: RenderOptions,
    depth: usize,
    input: Mutex<Option<Input>>,
    parsed: OnceCell<Parsed>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("format", &self.format)
            .field("depth", &self.depth)
            .field("parsed", &self.parsed.initialized())
            .finish()
    }
}

impl Document {
    /// Wrap an input stream without reading it yet.
    ///
    /// Options are validated here, before any byte is read.
    pub fn new<R>(input: R, format: MailFormat, adapters: Adapters, options: RenderOptions) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::with_depth(Box::new(input), format, adapters, options, 0)
    }

    /// Wrap an input stream and parse it.
    pub async fn init<R>(
        input: R,
        format: MailFormat,
        adapters: Adapters,
        options: RenderOptions,
    ) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let doc = Self::new(input, format, adapters, options)?;
        doc.parse().await?;
        Ok(doc)
    }

    /// Parse an EML stream.
    pub async fn init_eml<R>(input: R, options: RenderOptions) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::init(input, MailFormat::Eml, Adapters::eml_only(), options).await
    }

    /// Parse an MSG stream with the given MSG adapter.
    pub async fn init_msg<R>(
        input: R,
        msg: Arc<dyn SourceAdapter>,
        options: RenderOptions,
    ) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::init(input, MailFormat::Msg, Adapters::with_msg(msg), options).await
    }

    fn with_depth(
        input: Input,
        format: MailFormat,
        adapters: Adapters,
        options: RenderOptions,
        depth: usize,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            format,
            adapters,
            options,
            depth,
            input: Mutex::new(Some(input)),
            parsed: OnceCell::new(),
        })
    }

    pub fn format(&self) -> MailFormat {
        self.format
    }

    /// The options given at construction.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Mail-in-mail depth; 0 for a top-level document.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Parse the input if that has not happened yet.
    ///
    /// Idempotent: later calls return the same result without touching the
    /// stream. A failed parse leaves the stream consumed, so retrying fails
    /// with a parse error.
    pub async fn parse(&self) -> Result<&ParsedMail> {
        Ok(&self.parsed().await?.mail)
    }

    async fn parsed(&self) -> Result<&Parsed> {
        self.parsed.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<Parsed> {
        let adapter = self.adapters.get(self.format)?;
        let mut input = self
            .input
            .lock()
            .await
            .take()
            .ok_or_else(|| ExportError::Parse("input stream was already consumed".into()))?;

        let mail = adapter.parse_stream(input.as_mut()).await?;
        let body_html = highlighted_body(&mail, &self.options)?;

        tracing::debug!(
            format = ?self.format,
            depth = self.depth,
            attachments = mail.attachments.len(),
            "Document parsed"
        );
        Ok(Parsed { mail, body_html })
    }

    /// The canonical header.
    pub async fn get_header(&self, options: Option<&RenderOptions>) -> Result<Header> {
        let options = self.effective(options)?;
        Ok(build_header(self.parse().await?, options.ignore_embedded))
    }

    /// Attachments in source order; standalone ones only with `ignore_embedded`.
    pub async fn get_attachments(&self, options: Option<&RenderOptions>) -> Result<Vec<Arc<Attachment>>> {
        let options = self.effective(options)?;
        let mail = self.parse().await?;
        Ok(AttachmentClassifier::classify_for(mail.format, &mail.attachments)
            .get_visible(options.ignore_embedded))
    }

    /// Inline attachments, referenced from the body rather than listed.
    pub async fn get_embedded(&self) -> Result<Vec<Arc<Attachment>>> {
        let mail = self.parse().await?;
        Ok(AttachmentClassifier::classify_for(mail.format, &mail.attachments).embedded)
    }

    /// The filename assigned to one of this document's attachments.
    pub async fn attachment_filename<'a>(&self, attachment: &'a Attachment) -> Result<&'a str> {
        AttachmentClassifier::filename(attachment, &self.adapters, self.depth).await
    }

    /// The body HTML, highlighted; `None` if the mail has no body.
    pub async fn get_body_html(&self, options: Option<&RenderOptions>) -> Result<Option<String>> {
        let options = self.effective(options)?;
        let parsed = self.parsed().await?;
        Ok(self.body_for(parsed, options)?.map(Cow::into_owned))
    }

    /// The full standalone HTML document.
    ///
    /// Rendering the same document twice with the same options yields
    /// identical output.
    pub async fn get_as_html(&self, options: Option<&RenderOptions>) -> Result<String> {
        let options = self.effective(options)?;
        let renderer = HtmlRenderer::new(options)?;
        let parsed = self.parsed().await?;

        let header = build_header(&parsed.mail, options.ignore_embedded);
        let listed = listed_attachments(&header.attachments, &options.exclude_header);
        let names = match &listed {
            Some(list) => Some(AttachmentClassifier::filenames(list, &self.adapters, self.depth).await?),
            None => None,
        };
        let entries: Option<Vec<AttachmentEntry<'_>>> = listed.as_ref().zip(names.as_ref()).map(|(list, names)| {
            list.iter()
                .zip(names.iter().copied())
                .map(|(attachment, filename)| AttachmentEntry {
                    attachment: attachment.as_ref(),
                    filename,
                })
                .collect()
        });

        let body_html = self
            .body_for(parsed, options)?
            .map(Cow::into_owned)
            .unwrap_or_default();
        let doc = MailDocument {
            format: self.format,
            header,
            body_html,
        };
        Ok(renderer.render(&doc, entries.as_deref()))
    }

    /// Open a nested mail attachment as a document of its own.
    ///
    /// The nested document inherits this document's adapters and options.
    pub async fn open_nested(&self, attachment: &Attachment) -> Result<Document> {
        let index = attachment.index;
        let format = attachment
            .content_type
            .as_deref()
            .and_then(MailFormat::from_content_type)
            .ok_or_else(|| ExportError::AttachmentResolution {
                index,
                reason: format!("'{}' is not a mail container", attachment.mime_type()),
            })?;

        let depth = self.depth + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(ExportError::AttachmentResolution {
                index,
                reason: format!("nesting deeper than {MAX_NESTING_DEPTH} levels"),
            });
        }

        let nested = Self::with_depth(
            Box::new(Cursor::new(Arc::clone(&attachment.content))),
            format,
            self.adapters.clone(),
            self.options.clone(),
            depth,
        )?;
        nested
            .parse()
            .await
            .map_err(|e| ExportError::AttachmentResolution {
                index,
                reason: e.to_string(),
            })?;
        Ok(nested)
    }

    fn effective<'a>(&'a self, options: Option<&'a RenderOptions>) -> Result<&'a RenderOptions> {
        match options {
            Some(options) => {
                options.validate()?;
                Ok(options)
            }
            None => Ok(&self.options),
        }
    }

    fn body_for<'a>(&self, parsed: &'a Parsed, options: &RenderOptions) -> Result<Option<Cow<'a, str>>> {
        if options.same_highlight(&self.options) {
            return Ok(parsed.body_html.as_deref().map(Cow::Borrowed));
        }
        Ok(highlighted_body(&parsed.mail, options)?.map(Cow::Owned))
    }
}

fn highlighted_body(mail: &ParsedMail, options: &RenderOptions) -> Result<Option<String>> {
    mail.body_html()
        .map(|body| highlight(body, &options.highlight_keywords, options.highlight_case_sensitive))
        .transpose()
}
