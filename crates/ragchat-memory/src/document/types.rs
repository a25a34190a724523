#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// File name the text was read from, e.g. `handbook.pdf`.
    pub source: String,
    pub content_type: String,
    /// 1-based page number for paginated formats.
    pub page: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone)]
pub struct Chunk {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub chunk_index: usize,
}

impl Chunk {
    /// Hex-encoded blake3 digest of the chunk text, used to skip already indexed chunks.
    #[must_use]
    pub fn content_hash(&self) -> String {
        blake3::hash(self.content.as_bytes()).to_hex().to_string()
    }
}
