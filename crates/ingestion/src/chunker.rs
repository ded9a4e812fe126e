//! Text chunking module
//!
//! Splits extracted contract text into retrieval chunks for embedding.

use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000 }
    }
}

/// A text chunk with its position in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    pub index: i32,
}

/// Split text into chunks of at most `chunk_size` characters, preferring
/// paragraph, line and sentence boundaries
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let splitter = TextSplitter::new(ChunkConfig::new(config.chunk_size.max(1)));

    let chunks: Vec<TextChunk> = splitter
        .chunks(text)
        .filter(|chunk| !chunk.trim().is_empty())
        .enumerate()
        .map(|(index, content)| TextChunk {
            content: content.to_string(),
            index: index as i32,
        })
        .collect();

    debug!(
        input_len = text.len(),
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        "Text chunked"
    );

    chunks
}
