//! Cut-point search for splitting a unit that does not fit the buffer.
//! Fallback chain: line break, sentence end, word gap, hard cut.

/// Byte offset of the `n`th character (`s.len()` past the end).
pub(crate) fn byte_at(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | ';' | '!' | '?' | ':')
}

/// Byte offset to cut `text` at so the head holds between `min_chars` and
/// `max_chars` characters. Cuts land before the whitespace that follows a
/// boundary, so the head never ends in whitespace. Always > 0 for
/// non-empty text.
pub(crate) fn find_cut(text: &str, min_chars: usize, max_chars: usize) -> usize {
    let max_chars = max_chars.max(1);
    let hi = byte_at(text, max_chars);
    if hi >= text.len() {
        return text.len();
    }
    let lo = byte_at(text, min_chars.min(max_chars));

    // (position, char at position, previous char), last candidate first
    let mut candidates: Vec<(usize, char, Option<char>)> = Vec::new();
    let mut prev = text[..lo].chars().next_back();
    for (i, c) in text[lo..].char_indices() {
        let at = lo + i;
        if at > hi {
            break;
        }
        candidates.push((at, c, prev));
        prev = Some(c);
    }
    candidates.retain(|(at, _, _)| *at > 0);
    candidates.reverse();

    let line = candidates.iter().find(|(_, c, p)| *c == '\n' && p.is_some_and(|p| !p.is_whitespace()));
    let sentence = || candidates.iter().find(|(_, c, p)| c.is_whitespace() && p.is_some_and(is_terminal));
    let word = || candidates.iter().find(|(_, c, p)| c.is_whitespace() && p.is_some_and(|p| !p.is_whitespace()));
    line.or_else(sentence).or_else(word).map_or(hi, |(at, _, _)| *at)
}

/// Byte offset where the overlap suffix of `text` starts: at most
/// `max_chars` characters, moved forward to the first sentence start, else
/// the first word start, else the raw cut.
pub(crate) fn overlap_start(text: &str, max_chars: usize) -> usize {
    if max_chars == 0 {
        return text.len();
    }
    let total = text.chars().count();
    let lo = byte_at(text, total.saturating_sub(max_chars));
    let mut prev = text[..lo].chars().next_back();
    let mut before_prev = text[..lo].chars().rev().nth(1);
    let mut word_start = None;
    for (i, c) in text[lo..].char_indices() {
        if !c.is_whitespace() {
            if let Some(p) = prev {
                if p == '\n' || (p.is_whitespace() && before_prev.is_some_and(is_terminal)) {
                    return lo + i;
                }
                if p.is_whitespace() && word_start.is_none() {
                    word_start = Some(lo + i);
                }
            }
        }
        before_prev = prev;
        prev = Some(c);
    }
    word_start.unwrap_or(lo)
}
