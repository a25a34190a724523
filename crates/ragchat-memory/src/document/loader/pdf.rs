use std::path::Path;

use super::super::{
    DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentLoader, DocumentMetadata, LoadFuture,
    source_name,
};
use super::checked_path;

/// Extracts text from a PDF, one [`Document`] per non-blank page.
pub struct PdfLoader {
    pub max_file_size: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

fn page_documents(source: &str, pages: Vec<String>) -> Vec<Document> {
    pages
        .into_iter()
        .zip(1u32..)
        .filter(|(text, _)| !text.trim().is_empty())
        .map(|(content, page)| Document {
            content,
            metadata: DocumentMetadata {
                source: source.to_owned(),
                content_type: "application/pdf".to_owned(),
                page: Some(page),
            },
        })
        .collect()
}

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let path = checked_path(&path, max_size).await?;
            let source = source_name(&path);

            let pages = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_by_pages(&path)
                    .map_err(|e| DocumentError::Pdf(e.to_string()))
            })
            .await
            .map_err(|e| DocumentError::Io(std::io::Error::other(e)))??;

            let docs = page_documents(&source, pages);
            tracing::debug!(source, pages = docs.len(), "extracted PDF text");
            Ok(docs)
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_pages_are_dropped_and_numbering_kept() {
        let docs = page_documents(
            "book.pdf",
            vec!["first".into(), "  \n".into(), "third".into()],
        );
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].metadata.page, Some(1));
        assert_eq!(docs[1].metadata.page, Some(3));
        assert_eq!(docs[1].metadata.source, "book.pdf");
        assert_eq!(docs[1].metadata.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let result = PdfLoader::default()
            .load(Path::new("/nonexistent/book.pdf"))
            .await;
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }

    #[tokio::test]
    async fn invalid_pdf_is_pdf_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.pdf");
        std::fs::write(&file, "this is not a pdf").unwrap();

        let result = PdfLoader::default().load(&file).await;
        assert!(matches!(result, Err(DocumentError::Pdf(_))));
    }

    #[tokio::test]
    async fn oversized_pdf_rejected_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.pdf");
        std::fs::write(&file, "xx").unwrap();

        let loader = PdfLoader { max_file_size: 1 };
        assert!(matches!(
            loader.load(&file).await,
            Err(DocumentError::FileTooLarge(2))
        ));
    }
}
