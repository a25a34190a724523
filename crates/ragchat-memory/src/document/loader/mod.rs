mod pdf;
mod text;

pub use pdf::PdfLoader;
pub use text::TextLoader;

use std::path::{Path, PathBuf};

use super::DocumentError;

/// Resolve `path` and reject files larger than `max_size` bytes.
async fn checked_path(path: &Path, max_size: u64) -> Result<PathBuf, DocumentError> {
    let path = tokio::fs::canonicalize(path).await?;
    let meta = tokio::fs::metadata(&path).await?;
    if meta.len() > max_size {
        return Err(DocumentError::FileTooLarge(meta.len()));
    }
    Ok(path)
}
