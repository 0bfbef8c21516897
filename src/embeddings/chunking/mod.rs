
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A contiguous, possibly overlapping slice of a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk text, trimmed of surrounding whitespace
    pub text: String,
    /// Name of the document this chunk was cut from
    pub source_document: String,
    /// Zero-based position of this chunk within its document
    pub chunk_index: usize,
    /// Number of chunks the document was split into
    pub total_chunks: usize,
}

/// Configuration for content chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub max_chunk_size: usize,
    /// Characters shared between the end of one chunk and the start of the next
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Splits document text into overlapping, sentence-aware chunks.
///
/// Splitting is a pure function of the input text and the configuration, so a
/// single `Chunker` can be shared freely between threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `text` into chunks tagged with `source_document`.
    ///
    /// Windows hold at most `max_chunk_size` characters. A window that ends
    /// before the end of the text is cut just after its last `.` or newline,
    /// provided that boundary lies in the second half of the window. The next
    /// window starts `chunk_overlap` characters before the previous one ended,
    /// but always at least one character after the previous start.
    #[inline]
    pub fn split(&self, text: &str, source_document: &str) -> Vec<Chunk> {
        let pieces = self.split_text(text);
        let total_chunks = pieces.len();

        debug!(
            "Split '{}' ({} chars) into {} chunks",
            source_document,
            text.chars().count(),
            total_chunks
        );

        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, piece)| Chunk {
                text: piece.to_string(),
                source_document: source_document.to_string(),
                chunk_index,
                total_chunks,
            })
            .collect()
    }

    /// Split `text` into trimmed window slices without attaching metadata
    #[inline]
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        if text.is_empty() {
            return pieces;
        }

        // Byte offset of every character plus the end of the text, so window
        // arithmetic stays in characters while slicing stays on char boundaries.
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let char_count = chars.len();
        let byte_offset = |pos: usize| chars.get(pos).map_or(text.len(), |&(offset, _)| offset);

        let max_chunk_size = self.config.max_chunk_size.max(1);
        let mut start = 0;

        while start < char_count {
            let mut end = (start + max_chunk_size).min(char_count);

            if end < char_count {
                if let Some(break_point) = sentence_break(&chars, start, end, max_chunk_size) {
                    end = break_point + 1;
                }
            }

            let piece = text
                .get(byte_offset(start)..byte_offset(end))
                .unwrap_or_default()
                .trim();
            if !piece.is_empty() {
                pieces.push(piece);
            }

            if end >= char_count {
                break;
            }

            start = end.saturating_sub(self.config.chunk_overlap).max(start + 1);
        }

        pieces
    }
}

/// Find the last sentence or line boundary inside `start..end` that lies past
/// the window's midpoint
fn sentence_break(
    chars: &[(usize, char)],
    start: usize,
    end: usize,
    max_chunk_size: usize,
) -> Option<usize> {
    let midpoint = start + max_chunk_size / 2;

    chars
        .get(start..end)?
        .iter()
        .rposition(|&(_, c)| c == '.' || c == '\n')
        .map(|offset| start + offset)
        .filter(|&break_point| break_point > midpoint)
}
