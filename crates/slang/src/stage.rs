use std::borrow::Cow;

const STAGE_PRAGMA: &str = "#pragma stage";
const FRAGMENT_PRAGMA: &str = "#pragma stage fragment";

/// Keeps the shared prelude and the fragment stage of a combined source.
///
/// Everything before the first `#pragma stage` is shared by both stages. The
/// fragment segment runs from just after `#pragma stage fragment` to the next
/// stage pragma or the end of the file. Sources without a fragment marker are
/// returned unchanged.
pub fn extract_fragment_stage(source: &str) -> Cow<'_, str> {
    let Some(fragment) = source.find(FRAGMENT_PRAGMA) else {
        return Cow::Borrowed(source);
    };

    let shared_end = source.find(STAGE_PRAGMA).unwrap_or(fragment);
    let body = &source[fragment + FRAGMENT_PRAGMA.len()..];
    let body = body
        .find(STAGE_PRAGMA)
        .map_or(body, |next| &body[..next]);

    let mut out = String::with_capacity(shared_end + body.len());
    out.push_str(&source[..shared_end]);
    out.push_str(body);
    Cow::Owned(out)
}

/// Removes the first `#version` line (including its newline).
pub fn strip_version_directive(source: &str) -> Cow<'_, str> {
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        if line.trim_start_matches([' ', '\t']).starts_with("#version") {
            let mut out = String::with_capacity(source.len() - line.len());
            out.push_str(&source[..offset]);
            out.push_str(&source[offset + line.len()..]);
            return Cow::Owned(out);
        }
        offset += line.len();
    }
    Cow::Borrowed(source)
}
