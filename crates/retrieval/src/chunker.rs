//! Paragraph-aware chunker with overlap.
//!
//! Paragraphs (separated by two or more newlines) are packed into a buffer
//! until the next one would push it past `max_chars`. On flush, the last
//! `overlap_chars` characters of the flushed chunk seed the next buffer.
//! A paragraph longer than `max_chars` is cut into fixed windows that step
//! by `max_chars - overlap_chars`.
//!
//! All sizes are in characters, not bytes.

use ragpack_core::Chunk;

/// Split one document into ordered, overlapping chunks.
///
/// `overlap_chars` must be smaller than `max_chars`; callers validate this
/// through `RetrievalConfig::validate`. The window step is clamped to one
/// character so an invalid geometry still terminates.
pub fn chunk(doc_name: &str, text: &str, max_chars: usize, overlap_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    let step = max_chars.saturating_sub(overlap_chars).max(1);

    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0usize;
    let mut index = 0usize;

    for paragraph in split_paragraphs(text) {
        let para_len = paragraph.chars().count();
        let joined_len = if buffer.is_empty() {
            para_len
        } else {
            buffer_len + 2 + para_len
        };

        if joined_len <= max_chars {
            if !buffer.is_empty() {
                buffer.push_str("\n\n");
            }
            buffer.push_str(paragraph);
            buffer_len = joined_len;
            continue;
        }

        let mut seed = String::new();
        if !buffer.is_empty() {
            seed = tail_chars(&buffer, overlap_chars).to_string();
            chunks.push(Chunk::new(doc_name, index, std::mem::take(&mut buffer)));
            index += 1;
        }

        if para_len > max_chars {
            for window in windows(paragraph, max_chars, step) {
                chunks.push(Chunk::new(doc_name, index, window));
                index += 1;
            }
            continue;
        }

        let seed_len = seed.chars().count();
        if !seed.is_empty() && seed_len + 2 + para_len <= max_chars {
            buffer = seed;
            buffer.push_str("\n\n");
            buffer.push_str(paragraph);
            buffer_len = seed_len + 2 + para_len;
        } else {
            // Seed and paragraph together would overflow the chunk limit.
            buffer = paragraph.to_string();
            buffer_len = para_len;
        }
    }

    if !buffer.is_empty() {
        chunks.push(Chunk::new(doc_name, index, buffer));
    }

    chunks
}

/// Split on runs of two or more `\n`, trimming and dropping empty pieces.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\n' {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < bytes.len() && bytes[i] == b'\n' {
            i += 1;
        }
        if i - run_start >= 2 {
            pieces.push(&text[start..run_start]);
            start = i;
        }
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// The last `n` characters of `s`.
fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let offset = s
        .char_indices()
        .nth(count - n)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[offset..]
}

/// Fixed-size character windows over `text`, `step` apart.
fn windows(text: &str, size: usize, step: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + size).min(chars.len());
        out.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    out
}
