use std::fmt;

use crate::subtitle::CueBlock;

/// Default chunk size in characters for one translation turn.
pub const DEFAULT_CHUNK_LIMIT: usize = 8500;

/// A batch of whole cue blocks sent as one translation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    text: String,
    blocks: usize,
}

impl Chunk {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of cue blocks in this chunk.
    pub fn block_count(&self) -> usize {
        self.blocks
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Group cue blocks into chunks of roughly `limit` characters.
///
/// Each block is appended with a trailing newline and the limit is checked
/// after appending, so a chunk can overshoot by its last block. Blocks are
/// never split: a block longer than `limit` becomes a chunk of its own.
pub fn plan(blocks: &[CueBlock], limit: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0;
    let mut buffer_blocks = 0;

    for block in blocks {
        buffer.push_str(block.as_str());
        buffer.push('\n');
        buffer_chars += block.char_len() + 1;
        buffer_blocks += 1;

        if buffer_chars > limit {
            chunks.push(Chunk {
                text: std::mem::take(&mut buffer),
                blocks: buffer_blocks,
            });
            buffer_chars = 0;
            buffer_blocks = 0;
        }
    }

    if !buffer.is_empty() {
        chunks.push(Chunk {
            text: buffer,
            blocks: buffer_blocks,
        });
    }

    chunks
}
