//! Sliding-window text chunker.
//!
//! Splits document text into overlapping passages of at most `max_chars`
//! characters, preferring to cut at a sentence boundary (`.` or newline)
//! when one falls in the back half of the window. Consecutive passages
//! share `overlap` characters so context is not lost at the seams.
//!
//! All indices are characters, not bytes. Korean text is multibyte in
//! UTF-8, and byte slicing would split codepoints.

/// Split text into overlapping passage strings. Whitespace-only slices are
/// dropped; empty input yields no passages.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut passages = Vec::new();
    let mut start = 0usize;

    while start < total {
        let mut end = (start + max_chars).min(total);

        // Prefer a sentence boundary, but only past the window midpoint.
        // Cutting earlier would produce stubby passages.
        if end < total {
            let boundary = (start..end).rev().find(|&i| chars[i] == '.' || chars[i] == '\n');
            if let Some(cut) = boundary {
                if cut > start + max_chars / 2 {
                    end = cut + 1;
                }
            }
        }

        let slice: String = chars[start..end].iter().collect();
        let trimmed = slice.trim();
        if !trimmed.is_empty() {
            passages.push(trimmed.to_string());
        }

        start = if end < total {
            // Step back by the overlap, but always make progress.
            let next = end.saturating_sub(overlap);
            if next <= start {
                end
            } else {
                next
            }
        } else {
            end
        };
    }

    passages
}
