//! Restricted markdown dialect → [`BlockNode`] tree.
//!
//! Block syntax is line oriented:
//!
//! | Line                 | Node                         |
//! |----------------------|------------------------------|
//! | `# ` .. `#### `      | `Heading` levels 2..=5       |
//! | `---`                | `HorizontalRule`             |
//! | consecutive `- `     | one `BulletList`             |
//! | blank                | separator, no node           |
//! | anything else        | `Paragraph`                  |
//!
//! Inline syntax is `**bold**`, `*italic*` and `[text](href)`, nested in
//! any order. Both functions are pure: the same input always yields the
//! same tree.

use crate::document::{BlockNode, InlineSpan, Mark};

/// Heading prefixes and the structural level each maps to. Level 1 is
/// reserved for the post title, so `# ` is the second level.
const HEADING_PREFIXES: [(&str, u8); 4] = [("# ", 2), ("## ", 3), ("### ", 4), ("#### ", 5)];

const HORIZONTAL_RULE: &str = "---";

const LIST_MARKER: &str = "- ";

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// Parse a whole document body.
///
/// Empty input yields an empty sequence; rejecting that is the caller's job.
pub fn parse_markdown(source: &str) -> Vec<BlockNode> {
    let mut blocks = Vec::new();
    let mut lines = source.split('\n').peekable();

    while let Some(line) = lines.next() {
        if let Some((level, text)) = heading(line) {
            blocks.push(BlockNode::Heading {
                level,
                content: parse_inline(text),
            });
        } else if line == HORIZONTAL_RULE {
            blocks.push(BlockNode::HorizontalRule);
        } else if let Some(first) = line.strip_prefix(LIST_MARKER) {
            let mut items = vec![parse_inline(first)];
            while let Some(next) = lines.next_if(|l| l.starts_with(LIST_MARKER)) {
                items.push(parse_inline(&next[LIST_MARKER.len()..]));
            }
            blocks.push(BlockNode::BulletList(items));
        } else if line.trim().is_empty() {
            continue;
        } else {
            blocks.push(BlockNode::Paragraph(parse_inline(line)));
        }
    }

    blocks
}

fn heading(line: &str) -> Option<(u8, &str)> {
    HEADING_PREFIXES
        .iter()
        .find_map(|(prefix, level)| line.strip_prefix(prefix).map(|text| (*level, text)))
}

// ---------------------------------------------------------------------------
// Inline content
// ---------------------------------------------------------------------------

/// Parse one line of inline markup into text runs.
///
/// Adjacent runs with identical marks are merged. An opening delimiter
/// without a matching close is kept as literal text.
pub fn parse_inline(text: &str) -> Vec<InlineSpan> {
    let mut out = Vec::new();
    parse_with_marks(text, &[], &mut out);
    out
}

/// Recursive-descent scan. `marks` is the set active for this level and
/// is never mutated; nested constructs get their own extended copy.
fn parse_with_marks(text: &str, marks: &[Mark], out: &mut Vec<InlineSpan>) {
    let mut rest = text;
    let mut literal = String::new();

    while !rest.is_empty() {
        if let Some((inner, consumed)) = match_bold(rest) {
            flush(out, &mut literal, marks);
            parse_with_marks(inner, &with_mark(marks, Mark::Bold), out);
            rest = &rest[consumed..];
        } else if let Some((inner, consumed)) = match_italic(rest) {
            flush(out, &mut literal, marks);
            parse_with_marks(inner, &with_mark(marks, Mark::Italic), out);
            rest = &rest[consumed..];
        } else if let Some((inner, href, consumed)) = match_link(rest) {
            flush(out, &mut literal, marks);
            let link = Mark::Link {
                href: href.to_string(),
            };
            parse_with_marks(inner, &with_mark(marks, link), out);
            rest = &rest[consumed..];
        } else if rest.starts_with(['*', '[']) {
            // Unterminated delimiter: one ASCII byte of literal text.
            literal.push_str(&rest[..1]);
            rest = &rest[1..];
        } else {
            let end = rest.find(['*', '[']).unwrap_or(rest.len());
            literal.push_str(&rest[..end]);
            rest = &rest[end..];
        }
    }

    flush(out, &mut literal, marks);
}

/// `**inner**` with a non-empty inner; the shortest close wins.
fn match_bold(rest: &str) -> Option<(&str, usize)> {
    let body = rest.strip_prefix("**")?;
    let close = find_after_first_char(body, "**")?;
    Some((&body[..close], 2 + close + 2))
}

/// `*inner*` where inner is non-empty and contains no `*`.
fn match_italic(rest: &str) -> Option<(&str, usize)> {
    let body = rest.strip_prefix('*')?;
    let close = body.find('*')?;
    if close == 0 {
        return None;
    }
    Some((&body[..close], 1 + close + 1))
}

/// `[inner](href)` with non-empty inner (no `]`) and href (no `)`).
fn match_link(rest: &str) -> Option<(&str, &str, usize)> {
    let body = rest.strip_prefix('[')?;
    let close = body.find(']')?;
    if close == 0 {
        return None;
    }
    let target = body[close + 1..].strip_prefix('(')?;
    let end = target.find(')')?;
    if end == 0 {
        return None;
    }
    let consumed = 1 + close + 1 + 1 + end + 1;
    Some((&body[..close], &target[..end], consumed))
}

/// Byte offset of the first `needle` that begins after at least one char.
fn find_after_first_char(haystack: &str, needle: &str) -> Option<usize> {
    let first = haystack.chars().next()?.len_utf8();
    haystack[first..].find(needle).map(|i| i + first)
}

fn with_mark(marks: &[Mark], mark: Mark) -> Vec<Mark> {
    let mut next = marks.to_vec();
    if !next.iter().any(|m| m.same_kind(&mark)) {
        next.push(mark);
    }
    next
}

fn flush(out: &mut Vec<InlineSpan>, literal: &mut String, marks: &[Mark]) {
    if literal.is_empty() {
        return;
    }
    let text = std::mem::take(literal);
    if let Some(last) = out.last_mut() {
        if last.marks() == marks {
            match last {
                InlineSpan::Plain(prev) | InlineSpan::Marked { text: prev, .. } => {
                    prev.push_str(&text)
                }
            }
            return;
        }
    }
    out.push(InlineSpan::new(text, marks));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
