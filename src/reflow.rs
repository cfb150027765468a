//! Thread splitting: reflow arbitrary text into post-sized chunks.
//!
//! Lines are packed greedily into chunks joined by `\n`. A line that is too
//! long on its own is broken at whitespace and its words are packed the same
//! way, joined by a single space. Only the overflowing line is word-split;
//! earlier chunks are never re-emitted.
//!
//! Lengths are counted in `char`s. A single word longer than the limit is
//! emitted whole.

/// Split `text` into chunks of at most `max_len` characters.
///
/// Returns an empty vec for blank input. Never emits an empty chunk.
pub fn reflow(text: &str, max_len: usize) -> Vec<String> {
    let mut builder = ChunkBuilder::new(max_len);

    for line in text.lines() {
        if char_len(line) <= max_len {
            builder.append(line, '\n');
        } else {
            builder.flush();
            for word in line.split_whitespace() {
                builder.append(word, ' ');
            }
        }
    }

    builder.finish()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Accumulates pieces into a chunk until the next piece would overflow.
struct ChunkBuilder {
    max_len: usize,
    chunks: Vec<String>,
    current: String,
    current_len: usize,
}

impl ChunkBuilder {
    fn new(max_len: usize) -> Self {
        Self {
            max_len,
            chunks: Vec::new(),
            current: String::new(),
            current_len: 0,
        }
    }

    fn append(&mut self, piece: &str, separator: char) {
        let piece_len = char_len(piece);

        if self.current.is_empty() {
            self.current.push_str(piece);
            self.current_len = piece_len;
            return;
        }

        if self.current_len + 1 + piece_len <= self.max_len {
            self.current.push(separator);
            self.current.push_str(piece);
            self.current_len += 1 + piece_len;
        } else {
            self.flush();
            self.current.push_str(piece);
            self.current_len = piece_len;
        }
    }

    fn flush(&mut self) {
        let chunk = std::mem::take(&mut self.current);
        self.current_len = 0;

        let trimmed = chunk.trim_matches('\n');
        if !trimmed.trim().is_empty() {
            self.chunks.push(trimmed.to_string());
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}
