//! Save a document's attachments to disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::document::Document;
use crate::error::{ExportError, Result};
use crate::model::attachment::Attachment;

/// Longest filename written, in characters.
const MAX_FILENAME_LEN: usize = 150;

/// Write every attachment of `doc` into `output_dir` under its resolved
/// filename. Existing files are never overwritten; a counter is appended
/// instead. Inline parts are skipped unless `include_embedded` is set.
pub async fn save_attachments(
    doc: &Document,
    output_dir: &Path,
    include_embedded: bool,
) -> Result<Vec<PathBuf>> {
    let mut options = doc.options().clone();
    options.ignore_embedded = !include_embedded;
    let attachments = doc.get_attachments(Some(&options)).await?;

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| ExportError::io(output_dir, e))?;

    let mut paths = Vec::with_capacity(attachments.len());
    for attachment in &attachments {
        let name = doc.attachment_filename(attachment).await?;
        let path = save_attachment(attachment, name, output_dir).await?;
        tracing::debug!(path = %path.display(), bytes = attachment.size(), "Attachment saved");
        paths.push(path);
    }
    Ok(paths)
}

/// Write one attachment, picking the first free variant of `name`.
pub async fn save_attachment(attachment: &Attachment, name: &str, output_dir: &Path) -> Result<PathBuf> {
    let filename = sanitize_filename(name, MAX_FILENAME_LEN);
    let base = output_dir.join(&filename);

    for candidate in candidates(&base) {
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(mut file) => {
                file.write_all(&attachment.content)
                    .await
                    .map_err(|e| ExportError::io(&candidate, e))?;
                file.flush().await.map_err(|e| ExportError::io(&candidate, e))?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(ExportError::io(&candidate, e)),
        }
    }

    Err(ExportError::io(
        base,
        std::io::Error::new(ErrorKind::AlreadyExists, "no free filename left"),
    ))
}

/// Replace anything that is unsafe in a filename with `_`.
pub fn sanitize_filename(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | '@' | ' ' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    let trimmed = sanitized.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "attachment".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `name.ext`, then `name_1.ext`, `name_2.ext`, ...
fn candidates(path: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("attachment");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    std::iter::once(path.to_path_buf()).chain((1..1000).map(move |i| {
        if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attachment::Disposition;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report (final).pdf", 40), "report (final).pdf");
        assert_eq!(sanitize_filename("a/b\\c:d*e", 20), "a_b_c_d_e");
        assert_eq!(sanitize_filename("..", 20), "attachment");
        assert_eq!(sanitize_filename("../etc/passwd", 20), "_etc_passwd");
        assert_eq!(sanitize_filename("", 20), "attachment");
        assert_eq!(sanitize_filename("abcdef", 3), "abc");
    }

    #[test]
    fn test_candidates() {
        let names: Vec<_> = candidates(Path::new("/tmp/out/a.pdf")).take(3).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("/tmp/out/a.pdf"),
                PathBuf::from("/tmp/out/a_1.pdf"),
                PathBuf::from("/tmp/out/a_2.pdf"),
            ]
        );
        let bare: Vec<_> = candidates(Path::new("/tmp/out/attachment_3")).skip(1).take(1).collect();
        assert_eq!(bare, vec![PathBuf::from("/tmp/out/attachment_3_1")]);
    }

    #[tokio::test]
    async fn test_save_attachment_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = Attachment::new(0, b"one".to_vec(), None, None, Disposition::Attachment);
        let second = Attachment::new(1, b"two".to_vec(), None, None, Disposition::Attachment);

        let a = save_attachment(&first, "notes.txt", dir.path()).await.unwrap();
        let b = save_attachment(&second, "notes.txt", dir.path()).await.unwrap();

        assert_eq!(a, dir.path().join("notes.txt"));
        assert_eq!(b, dir.path().join("notes_1.txt"));
        assert_eq!(std::fs::read(&a).unwrap(), b"one");
        assert_eq!(std::fs::read(&b).unwrap(), b"two");
    }
}
