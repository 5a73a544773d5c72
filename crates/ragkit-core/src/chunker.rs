//! Token-aware text chunking.
//!
//! Splits normalized text into overlapping chunks bounded by a token
//! budget. Sentences are packed greedily; a chunk that would overflow is
//! closed and the next one is seeded with whole trailing sentences that
//! fit inside the overlap budget. Sentences too long to fit on their own
//! are split at word boundaries.

use crate::types::{Chunk, Meta};

/// Counts the units used for every size comparison in a chunker. All
/// checks inside one chunker go through the same counter, so the token
/// contract stays self-consistent whatever the counting rule is.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Whitespace-word heuristic: roughly 0.75 words per token for English
/// text.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordTokenCounter;

impl TokenCounter for WordTokenCounter {
    fn count(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        words * 4 / 3
    }
}

pub struct TextChunker {
    counter: Box<dyn TokenCounter>,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(Box::new(WordTokenCounter))
    }
}

impl TextChunker {
    pub fn new(counter: Box<dyn TokenCounter>) -> Self {
        Self { counter }
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Collapse whitespace runs to a single space, strip control
    /// characters, and trim. Empty input stays empty.
    pub fn clean_text(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pending_space = false;
        for ch in text.chars() {
            if ch.is_whitespace() {
                pending_space = !out.is_empty();
            } else if !ch.is_control() {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                out.push(ch);
            }
        }
        out
    }

    /// Create overlapping chunks from `text`. `chunk_size` and
    /// `chunk_overlap` are token counts under this chunker's counter.
    ///
    /// Pure and deterministic: same input and parameters always produce
    /// the same sequence. Emitted chunks are never empty; empty input
    /// yields an empty sequence without error.
    pub fn create_chunks(&self, text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
        let text = self.clean_text(text);
        if text.is_empty() {
            return Vec::new();
        }

        let sentences = split_sentences(&text);

        let mut chunks: Vec<String> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_tokens = 0usize;

        for sentence in sentences {
            let sentence_tokens = self.counter.count(sentence);

            // A sentence that cannot fit on its own is split at word
            // boundaries; pending content is flushed first and the overlap
            // state resets to empty.
            if sentence_tokens > chunk_size {
                if !current.is_empty() {
                    chunks.push(current.join(" "));
                    current.clear();
                    current_tokens = 0;
                }
                chunks.extend(self.split_long_sentence(sentence, chunk_size));
                continue;
            }

            if current_tokens + sentence_tokens > chunk_size && !current.is_empty() {
                chunks.push(current.join(" "));

                if chunk_overlap > 0 {
                    // Seed the next chunk with whole trailing sentences
                    // whose cumulative size stays within the overlap
                    // budget; partial sentences are never carried over.
                    let mut overlap: Vec<&str> = Vec::new();
                    let mut overlap_tokens = 0usize;
                    for s in current.iter().rev() {
                        let s_tokens = self.counter.count(s);
                        if overlap_tokens + s_tokens <= chunk_overlap {
                            overlap.insert(0, *s);
                            overlap_tokens += s_tokens;
                        } else {
                            break;
                        }
                    }
                    current = overlap;
                    current_tokens = overlap_tokens;
                } else {
                    current.clear();
                    current_tokens = 0;
                }
            }

            current.push(sentence);
            current_tokens += sentence_tokens;
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }

    /// Split one oversized sentence into word-bounded pieces of at most
    /// `max_tokens` each. A single word larger than the budget becomes its
    /// own piece.
    fn split_long_sentence(&self, sentence: &str, max_tokens: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_tokens = 0usize;

        for word in sentence.split_whitespace() {
            let word_tokens = self.counter.count(word);
            if current_tokens + word_tokens > max_tokens {
                if !current.is_empty() {
                    chunks.push(current.join(" "));
                }
                current = vec![word];
                current_tokens = word_tokens;
            } else {
                current.push(word);
                current_tokens += word_tokens;
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }

    /// Chunk a full document and wrap the pieces as [`Chunk`] values with
    /// position and caller metadata attached.
    pub fn chunk_document(
        &self,
        source_id: &str,
        text: &str,
        base_meta: &Meta,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Vec<Chunk> {
        let texts = self.create_chunks(text, chunk_size, chunk_overlap);
        let total_chunks = texts.len();
        texts
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| {
                let mut metadata = base_meta.clone();
                metadata.insert("chunk_index".to_string(), chunk_index.to_string());
                metadata.insert("total_chunks".to_string(), total_chunks.to_string());
                Chunk {
                    text,
                    source_id: source_id.to_string(),
                    chunk_index,
                    total_chunks,
                    metadata,
                }
            })
            .collect()
    }
}

/// Split normalized text into sentences: break after `.`, `!`, or `?`
/// followed by whitespace, discarding empty fragments.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?')
            && i + 1 < bytes.len()
            && bytes[i + 1].is_ascii_whitespace()
        {
            let fragment = text[start..=i].trim();
            if !fragment.is_empty() {
                sentences.push(fragment);
            }
            start = i + 2;
            i = start;
            continue;
        }
        i += 1;
    }
    if start < text.len() {
        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sentences_basic() {
        let sentences = split_sentences("First one. Second one! Third?");
        assert_eq!(sentences, vec!["First one.", "Second one!", "Third?"]);
    }

    #[test]
    fn split_sentences_no_terminator() {
        assert_eq!(split_sentences("just words"), vec!["just words"]);
    }

    #[test]
    fn clean_text_collapses_and_trims() {
        let chunker = TextChunker::default();
        assert_eq!(chunker.clean_text("  a\t\tb\n\nc  "), "a b c");
        assert_eq!(chunker.clean_text("a\u{0}b"), "ab");
        assert_eq!(chunker.clean_text(""), "");
    }
}
