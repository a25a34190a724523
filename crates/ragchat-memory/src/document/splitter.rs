use super::types::{Chunk, Document};

/// Chunking parameters. Sizes are counted in characters, not bytes.
#[derive(Debug, Clone)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub sentence_aware: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5000,
            chunk_overlap: 0,
            sentence_aware: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    /// Split one document. Chunk indices start at zero.
    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        self.chunks_from(document, 0)
    }

    /// Split several documents, numbering chunks continuously across all of them.
    #[must_use]
    pub fn split_all(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in documents {
            let next = self.chunks_from(doc, chunks.len());
            chunks.extend(next);
        }
        chunks
    }

    fn chunks_from(&self, document: &Document, first_index: usize) -> Vec<Chunk> {
        let size = self.config.chunk_size.max(1);
        let pieces = if self.config.sentence_aware {
            let sentences = sentence_spans(&document.content)
                .into_iter()
                .flat_map(|s| char_windows(s, size, size))
                .collect::<Vec<_>>();
            merge_spans(&sentences, size, self.config.chunk_overlap)
        } else {
            let step = size.saturating_sub(self.config.chunk_overlap).max(1);
            char_windows(&document.content, size, step)
                .into_iter()
                .map(str::to_owned)
                .collect()
        };

        pieces
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .enumerate()
            .map(|(i, content)| Chunk {
                content,
                metadata: document.metadata.clone(),
                chunk_index: first_index + i,
            })
            .collect()
    }
}

/// Cut `text` into contiguous spans ending at a paragraph break or at `.`, `?`, `!`
/// followed by whitespace. The spans concatenate back to `text`.
fn sentence_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        let Some(&(next_i, next_c)) = iter.peek() else {
            break;
        };
        let end = match c {
            '\n' if next_c == '\n' => {
                let mut end = next_i + next_c.len_utf8();
                iter.next();
                while let Some(&(j, '\n')) = iter.peek() {
                    end = j + 1;
                    iter.next();
                }
                Some(end)
            }
            '.' | '?' | '!' if next_c.is_whitespace() => Some(i + c.len_utf8()),
            _ => None,
        };
        if let Some(end) = end {
            spans.push(&text[start..end]);
            start = end;
        }
    }

    if start < text.len() {
        spans.push(&text[start..]);
    }
    spans
}

/// Windows of at most `size` characters, advancing `step` characters each time.
fn char_windows(text: &str, size: usize, step: usize) -> Vec<&str> {
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;

    let mut windows = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = (start + size).min(char_count);
        windows.push(&text[bounds[start]..bounds[end]]);
        if end == char_count {
            break;
        }
        start += step;
    }
    windows
}

/// Greedily pack spans into chunks of at most `size` characters, starting each new
/// chunk with trailing spans of the previous one totalling at most `overlap` characters.
fn merge_spans(spans: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: Vec<(&str, usize)> = Vec::new();
    let mut window_len = 0;

    for span in spans {
        let len = span.chars().count();
        if window_len > 0 && window_len + len > size {
            chunks.push(window.iter().map(|(s, _)| *s).collect::<String>());

            let mut keep = 0;
            let mut kept_len = 0;
            for (_, l) in window.iter().rev() {
                if kept_len + l > overlap || kept_len + l + len > size {
                    break;
                }
                kept_len += l;
                keep += 1;
            }
            window.drain(..window.len() - keep);
            window_len = kept_len;
        }
        window.push((span, len));
        window_len += len;
    }

    if !window.is_empty() {
        chunks.push(window.iter().map(|(s, _)| *s).collect());
    }
    chunks
}
