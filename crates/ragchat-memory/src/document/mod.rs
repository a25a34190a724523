pub mod error;
pub mod loader;
pub mod pipeline;
pub mod splitter;
pub mod types;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

pub use error::DocumentError;
pub use loader::{PdfLoader, TextLoader};
pub use pipeline::{IngestionPipeline, LoadReport};
pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{Chunk, Document, DocumentMetadata};

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Document>, DocumentError>> + Send + 'a>>;

pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> LoadFuture<'_>;

    fn supported_extensions(&self) -> &[&str];
}

/// Pick the loader for `path` by its (case-insensitive) extension.
///
/// # Errors
///
/// Returns [`DocumentError::UnsupportedFormat`] if no loader handles the extension.
pub fn loader_for(path: &Path) -> Result<Box<dyn DocumentLoader>, DocumentError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let candidates: [Box<dyn DocumentLoader>; 2] =
        [Box::new(PdfLoader::default()), Box::new(TextLoader::default())];
    candidates
        .into_iter()
        .find(|l| l.supported_extensions().contains(&ext.as_str()))
        .ok_or_else(|| DocumentError::UnsupportedFormat(path.display().to_string()))
}

/// File name of `path`, falling back to the full path when it has none.
pub(crate) fn source_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or_else(|| path.display().to_string(), str::to_owned)
}
