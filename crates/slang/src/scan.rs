//! Byte-level cursor helpers shared by the rewriter.
//!
//! Every search skips `//` and `/* */` comments. Positions are byte offsets
//! into the source; all delimiters searched for are ASCII, so returned
//! offsets always fall on `char` boundaries.

pub(crate) fn is_ident(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// If a comment starts at `at`, returns the offset just past it.
fn comment_end(src: &[u8], at: usize) -> Option<usize> {
    if src.get(at) != Some(&b'/') {
        return None;
    }
    match src.get(at + 1) {
        Some(b'/') => Some(
            src[at..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(src.len(), |offset| at + offset),
        ),
        Some(b'*') => Some(
            src[at + 2..]
                .windows(2)
                .position(|pair| pair == b"*/")
                .map_or(src.len(), |offset| at + 2 + offset + 2),
        ),
        _ => None,
    }
}

/// Skips whitespace and comments.
pub(crate) fn skip_trivia(src: &[u8], mut at: usize) -> usize {
    loop {
        while src.get(at).is_some_and(u8::is_ascii_whitespace) {
            at += 1;
        }
        match comment_end(src, at) {
            Some(end) => at = end,
            None => return at,
        }
    }
}

/// Next occurrence of `needle` outside comments, starting at `from`.
pub(crate) fn find_code(src: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    let mut at = from;
    while at < src.len() {
        if let Some(end) = comment_end(src, at) {
            at = end;
            continue;
        }
        if src[at..].starts_with(needle) {
            return Some(at);
        }
        at += 1;
    }
    None
}

/// Next whole-word occurrence of `word` outside comments.
pub(crate) fn find_word(src: &[u8], from: usize, word: &[u8]) -> Option<usize> {
    let mut at = from;
    loop {
        let found = find_code(src, at, word)?;
        if is_word_at(src, found, word) {
            return Some(found);
        }
        at = found + 1;
    }
}

/// True when `word` sits at `at` with identifier boundaries on both sides.
pub(crate) fn is_word_at(src: &[u8], at: usize, word: &[u8]) -> bool {
    src[at..].starts_with(word)
        && (at == 0 || !is_ident(src[at - 1]))
        && src.get(at + word.len()).map_or(true, |&b| !is_ident(b))
}

/// End offset of the identifier starting at `at` (equal to `at` when none).
pub(crate) fn word_end(src: &[u8], at: usize) -> usize {
    src[at.min(src.len())..]
        .iter()
        .position(|&b| !is_ident(b))
        .map_or(src.len(), |offset| at + offset)
}

/// Offset of the `}` closing the `{` at `open`, tracking nesting depth.
pub(crate) fn matching_brace(src: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut at = open;
    while at < src.len() {
        if let Some(end) = comment_end(src, at) {
            at = end;
            continue;
        }
        match src[at] {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(at);
                }
            }
            _ => {}
        }
        at += 1;
    }
    None
}

/// Replaces every comment with a single space.
pub(crate) fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut at = 0;
    while at < bytes.len() {
        match comment_end(bytes, at) {
            Some(end) => {
                out.push_str(&text[copied..at]);
                out.push(' ');
                at = end;
                copied = end;
            }
            None => at += 1,
        }
    }
    out.push_str(&text[copied..]);
    out
}
