//! Line-level segmentation of subtitle documents into cue blocks.
//!
//! No SRT syntax is validated here: a block is any run of non-blank lines
//! separated from its neighbours by blank lines. Index and timing lines are
//! carried through as opaque text.

use std::fmt;

/// One subtitle entry (index, timing and text lines) as a single opaque span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueBlock(String);

impl CueBlock {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, which is what chunk limits are measured in.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for CueBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split subtitle text into cue blocks.
///
/// Each line is trimmed; consecutive non-blank lines form one block and a
/// blank line closes it. Relative order is preserved and no block is empty.
pub fn segment(text: &str) -> Vec<CueBlock> {
    let mut blocks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !pending.is_empty() {
                blocks.push(CueBlock(pending.join("\n")));
                pending.clear();
            }
        } else {
            pending.push(trimmed);
        }
    }

    if !pending.is_empty() {
        blocks.push(CueBlock(pending.join("\n")));
    }

    blocks
}

/// Render blocks back into a document, one blank line between blocks.
pub fn join(blocks: &[CueBlock]) -> String {
    blocks
        .iter()
        .map(CueBlock::as_str)
        .collect::<Vec<_>>()
        .join("\n\n")
}
