// Lyric line wrapping.

/// Re-wrap `text` so no line is longer than `max_chars` characters.
///
/// Existing line breaks are kept (empty lines included); inside a line,
/// whitespace runs collapse to one space and words are packed greedily.
/// A word longer than `max_chars` is split across lines. Nothing but
/// whitespace is ever dropped. `max_chars == 0` returns the text as is.
///
/// Width is measured in Unicode scalar values.
pub fn wrap(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return text.to_owned();
    }

    text.split('\n')
        .map(|line| wrap_line(line, max_chars))
        .collect::<Vec<_>>()
        .join("\n")
}

fn wrap_line(line: &str, max_chars: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for piece in line
        .split_whitespace()
        .flat_map(|word| split_long_word(word, max_chars))
    {
        let len = piece.chars().count();
        if current_len == 0 {
            current.push_str(piece);
            current_len = len;
        } else if current_len + 1 + len <= max_chars {
            current.push(' ');
            current.push_str(piece);
            current_len += 1 + len;
        } else {
            lines.push(std::mem::replace(&mut current, piece.to_owned()));
            current_len = len;
        }
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

/// Cut `word` into chunks of at most `max_chars` characters.
fn split_long_word(word: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (count, (idx, _)) in word.char_indices().enumerate() {
        if count > 0 && count % max_chars == 0 {
            pieces.push(&word[start..idx]);
            start = idx;
        }
    }
    pieces.push(&word[start..]);
    pieces
}
