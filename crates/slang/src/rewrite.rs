use crate::is_builtin;
use crate::scan;

const LAYOUT: &[u8] = b"layout";
const UNIFORM: &[u8] = b"uniform";

/// Input the preamble already declares.
const TEXCOORD_INPUT: &str = "vTexCoord";
/// Output the preamble already declares.
const COLOR_OUTPUT: &str = "FragColor";

/// A pending replacement of `start..end` in the scanned source.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

impl Edit {
    fn delete(start: usize, end: usize) -> Self {
        Self::replace(start, end, String::new())
    }

    fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Rewrites every `layout(...)`-qualified declaration into the plain subset.
pub(crate) fn rewrite_layouts(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut edits = Vec::new();
    let mut at = 0;

    while let Some(layout) = scan::find_word(bytes, at, LAYOUT) {
        at = layout + LAYOUT.len();
        let open = scan::skip_trivia(bytes, at);
        if bytes.get(open) != Some(&b'(') {
            continue;
        }
        let Some(close) = scan::find_code(bytes, open, b")") else {
            tracing::debug!(offset = layout, "unterminated layout qualifier");
            break;
        };
        at = close + 1;

        let keyword = scan::skip_trivia(bytes, at);
        let next = if scan::is_word_at(bytes, keyword, UNIFORM) {
            uniform(src, layout, keyword + UNIFORM.len(), &mut edits)
        } else if scan::is_word_at(bytes, keyword, b"in") {
            varying(src, layout, keyword, TEXCOORD_INPUT, &mut edits)
        } else if scan::is_word_at(bytes, keyword, b"out") {
            varying(src, layout, keyword, COLOR_OUTPUT, &mut edits)
        } else {
            Some(at)
        };

        match next {
            Some(next) => at = next,
            None => {
                tracing::debug!(offset = layout, "unterminated declaration; stopping scan");
                break;
            }
        }
    }

    apply(src, edits)
}

fn uniform(src: &str, layout: usize, after_keyword: usize, edits: &mut Vec<Edit>) -> Option<usize> {
    let bytes = src.as_bytes();
    let start = scan::skip_trivia(bytes, after_keyword);
    if bytes.get(start) == Some(&b'{') {
        return uniform_block(src, layout, start, edits);
    }
    let name_end = scan::word_end(bytes, start);
    if name_end > start {
        let brace = scan::skip_trivia(bytes, name_end);
        if bytes.get(brace) == Some(&b'{') {
            return uniform_block(src, layout, brace, edits);
        }
    }

    let semicolon = scan::find_code(bytes, after_keyword, b";")?;
    let name = declared_name(&src[after_keyword..semicolon]);
    if is_builtin(name) {
        edits.push(Edit::delete(layout, semicolon + 1));
    } else {
        edits.push(Edit::replace(layout, after_keyword, "uniform"));
    }
    Some(semicolon + 1)
}

fn uniform_block(src: &str, layout: usize, open: usize, edits: &mut Vec<Edit>) -> Option<usize> {
    let bytes = src.as_bytes();
    let close = scan::matching_brace(bytes, open)?;

    let mut end = close + 1;
    let instance_start = scan::skip_trivia(bytes, end);
    let instance_end = scan::word_end(bytes, instance_start);
    let instance = (instance_end > instance_start).then(|| &src[instance_start..instance_end]);
    if instance.is_some() {
        end = instance_end;
    }
    let terminator = scan::skip_trivia(bytes, end);
    if bytes.get(terminator) == Some(&b';') {
        end = terminator + 1;
    }

    let declarations = flatten_members(&src[open + 1..close]);
    tracing::trace!(
        instance = instance.unwrap_or(""),
        flattened = declarations.lines().count(),
        "rewriting uniform block"
    );
    edits.push(Edit::replace(layout, end, declarations));

    if let Some(instance) = instance {
        strip_instance_prefix(src, instance, edits);
    }
    Some(end)
}

/// Emits one `uniform <type> <name>;` line per non-built-in member.
fn flatten_members(body: &str) -> String {
    let body = scan::strip_comments(body);
    let terminated = body.rfind(';').map_or("", |last| &body[..last]);

    let mut out = String::new();
    for member in terminated.split(';').map(str::trim) {
        let mut declarators = member.split(',');
        let Some((ty, first)) = declarators
            .next()
            .and_then(|head| head.trim().rsplit_once(char::is_whitespace))
        else {
            continue;
        };
        let ty = ty.split_whitespace().collect::<Vec<_>>().join(" ");
        for declarator in std::iter::once(first).chain(declarators).map(str::trim) {
            if declarator.is_empty() || is_builtin(base_name(declarator)) {
                continue;
            }
            out.push_str("uniform ");
            out.push_str(&ty);
            out.push(' ');
            out.push_str(declarator);
            out.push_str(";\n");
        }
    }
    out
}

fn strip_instance_prefix(src: &str, instance: &str, edits: &mut Vec<Edit>) {
    let bytes = src.as_bytes();
    let pattern = format!("{instance}.");
    let mut at = 0;
    while let Some(found) = scan::find_code(bytes, at, pattern.as_bytes()) {
        let preceded = found > 0 && (scan::is_ident(bytes[found - 1]) || bytes[found - 1] == b'.');
        if !preceded {
            edits.push(Edit::delete(found, found + pattern.len()));
        }
        at = found + 1;
    }
}

fn varying(
    src: &str,
    layout: usize,
    keyword: usize,
    provided: &str,
    edits: &mut Vec<Edit>,
) -> Option<usize> {
    let semicolon = scan::find_code(src.as_bytes(), keyword, b";")?;
    if declared_name(&src[keyword..semicolon]) == provided {
        edits.push(Edit::delete(layout, semicolon + 1));
    } else {
        edits.push(Edit::delete(layout, keyword));
    }
    Some(semicolon + 1)
}

/// Last declarator of a statement with any array suffix removed.
fn declared_name(statement: &str) -> &str {
    base_name(statement.split_whitespace().last().unwrap_or(""))
}

fn base_name(declarator: &str) -> &str {
    declarator
        .split('[')
        .next()
        .unwrap_or(declarator)
        .trim()
}

/// Applies edits in ascending order; an edit starting inside an already
/// applied span is dropped.
fn apply(src: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| edit.start);
    let mut out = String::with_capacity(src.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.start < cursor {
            tracing::trace!(start = edit.start, "dropping overlapping edit");
            continue;
        }
        out.push_str(&src[cursor..edit.start]);
        out.push_str(&edit.text);
        cursor = edit.end;
    }
    out.push_str(&src[cursor..]);
    out
}
