//! Type Text Scanner
//!
//! The checker only hands back text, so every structural edit on a resolved type
//! (reference substitution, brand injection, pretty printing) goes through the
//! small scanner in this module instead of ad-hoc string matching.
//!
//! All positions are byte offsets into the scanned text. Characters inside string
//! literals are never reported, and the `>` of an arrow (`=>`) is not a bracket.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// A byte range inside a type text
pub type Span = Range<usize>;

/// Identifier grammar of ECMAScript, Unicode letters included
pub const IDENTIFIER_PATTERN: &str = r"[\p{ID_Start}_$][\p{ID_Continue}$\x{200C}\x{200D}]*";

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{IDENTIFIER_PATTERN}$")).expect("valid identifier regex")
});

// =============================================================================
// Core scan
// =============================================================================

/// A character outside string literals together with its nesting depth.
///
/// Openers and closers report the depth *outside* the bracket pair, so the
/// separators of a top-level list are exactly the ones at depth 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanChar {
    pub index: usize,
    pub ch: char,
    pub depth: usize,
}

/// Scan `text`, skipping string literals and tracking bracket depth.
pub fn scan(text: &str) -> Vec<ScanChar> {
    let mut out = Vec::with_capacity(text.len());
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev: Option<char> = None;

    for (index, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            prev = Some(ch);
            continue;
        }

        match ch {
            '"' | '\'' | '`' => {
                quote = Some(ch);
            }
            '{' | '[' | '(' | '<' => {
                out.push(ScanChar { index, ch, depth });
                depth += 1;
            }
            '>' if prev == Some('=') => {
                out.push(ScanChar { index, ch, depth });
            }
            '}' | ']' | ')' | '>' => {
                depth = depth.saturating_sub(1);
                out.push(ScanChar { index, ch, depth });
            }
            _ => out.push(ScanChar { index, ch, depth }),
        }
        prev = Some(ch);
    }

    out
}

/// Byte index of the bracket that closes the one at `open`.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let rest = text.get(open..)?;
    let first = rest.chars().next()?;
    if !matches!(first, '{' | '[' | '(' | '<') {
        return None;
    }
    scan(rest)
        .into_iter()
        .skip(1)
        .find(|c| c.depth == 0 && matches!(c.ch, '}' | ']' | ')' | '>'))
        .map(|c| open + c.index)
}

/// Split `text` on `sep` occurring at depth 0; returned spans are trimmed.
pub fn split_top_level(text: &str, sep: char) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = 0;
    for c in scan(text) {
        if c.depth == 0 && c.ch == sep {
            spans.push(trim_span(text, start..c.index));
            start = c.index + c.ch.len_utf8();
        }
    }
    spans.push(trim_span(text, start..text.len()));
    spans.into_iter().filter(|s| !s.is_empty()).collect()
}

/// Narrow a span so it excludes surrounding whitespace.
pub fn trim_span(text: &str, span: Span) -> Span {
    let slice = &text[span.clone()];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    let start = span.start + leading;
    let end = (span.end - trailing).max(start);
    start..end
}

/// True when `text` is a single bracketed group, e.g. `{ ... }` or `( ... )`.
pub fn is_wrapped(text: &str, open: char) -> bool {
    let trimmed = text.trim();
    if !trimmed.starts_with(open) {
        return false;
    }
    let offset = text.len() - text.trim_start().len();
    matching_close(text, offset) == Some(offset + trimmed.len() - 1)
}

/// Replace `span` of `text` with `replacement`.
pub fn replace_span(text: &str, span: Span, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..span.start]);
    out.push_str(replacement);
    out.push_str(&text[span.end..]);
    out
}

// =============================================================================
// Identifiers
// =============================================================================

/// True for a syntactically valid TypeScript identifier.
pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER.is_match(text)
}

/// True for a character that may continue an identifier.
pub fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '$' | '\u{200C}' | '\u{200D}')
}

/// Content of a string literal body with its escape sequences resolved.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !chars.peek().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
            // line continuation
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                    }
                }
            }
            'u' => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Byte index of the quote closing a literal that starts at index 0 of `text`.
fn closing_quote(text: &str) -> Option<usize> {
    let quote = text.chars().next()?;
    let mut escaped = false;
    for (index, ch) in text.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Some(index);
        }
    }
    None
}

/// Byte spans of `name` used as a type-level identifier token.
///
/// Occurrences inside string literals, member accesses (`X.y`, `a.X`) and
/// property keys (`X:` / `X?:`) are skipped.
pub fn identifier_tokens(text: &str, name: &str) -> Vec<Span> {
    if name.is_empty() {
        return Vec::new();
    }
    let mut spans = Vec::new();
    let mut next_free = 0;
    for c in scan(text) {
        if c.index < next_free || !text[c.index..].starts_with(name) {
            continue;
        }
        let prev = text[..c.index].chars().next_back();
        if prev.is_some_and(|p| is_ident_char(p) || p == '.') {
            continue;
        }
        let end = c.index + name.len();
        let next = text[end..].chars().next();
        if next.is_some_and(|n| is_ident_char(n) || n == '.') {
            continue;
        }
        if is_property_key(&text[end..]) {
            continue;
        }
        spans.push(c.index..end);
        next_free = end;
    }
    spans
}

fn is_property_key(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.starts_with(':') || rest.starts_with("?:")
}

/// Replace every identifier token `from` with `to`.
pub fn replace_identifier(text: &str, from: &str, to: &str) -> String {
    let mut out = text.to_string();
    for span in identifier_tokens(text, from).into_iter().rev() {
        out = replace_span(&out, span, to);
    }
    out
}

// =============================================================================
// Object members
// =============================================================================

/// Kind of member inside an object type literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    /// `name: T` / `name?: T`
    Property,
    /// `[x: string]: T`
    Index,
}

/// One member of an object type literal, with absolute spans.
#[derive(Debug, Clone)]
pub struct Member {
    pub kind: MemberKind,
    /// Unquoted property name, or the bracketed index text for index signatures
    pub key: String,
    pub optional: bool,
    pub readonly: bool,
    /// The whole member, without the trailing `;`
    pub span: Span,
    /// The value type after the `:`
    pub value: Span,
}

/// Parse the members of `text`, which must be exactly one `{ ... }` group.
pub fn object_members(text: &str) -> Option<Vec<Member>> {
    let open = text.len() - text.trim_start().len();
    if !text[open..].starts_with('{') {
        return None;
    }
    let close = matching_close(text, open)?;
    if !text[close + 1..].trim().is_empty() {
        return None;
    }
    let interior = open + 1..close;
    let body = &text[interior.clone()];

    let mut members = Vec::new();
    for part in split_top_level(body, ';') {
        let span = interior.start + part.start..interior.start + part.end;
        if let Some(member) = parse_member(text, span) {
            members.push(member);
        }
    }
    Some(members)
}

fn parse_member(text: &str, span: Span) -> Option<Member> {
    let mut cursor = span.start;
    let mut readonly = false;
    let member_text = &text[span.clone()];
    if let Some(rest) = member_text.strip_prefix("readonly ") {
        readonly = true;
        cursor += member_text.len() - rest.len();
    }

    let head = &text[cursor..span.end];
    let (kind, key, after_key) = if head.starts_with('[') {
        let close = matching_close(text, cursor)?;
        (
            MemberKind::Index,
            text[cursor..=close].to_string(),
            close + 1,
        )
    } else if head.starts_with('"') || head.starts_with('\'') {
        let end = closing_quote(head)?;
        (
            MemberKind::Property,
            unescape(&head[1..end]),
            cursor + end + 1,
        )
    } else {
        let len = head
            .char_indices()
            .find(|(_, c)| !is_ident_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(head.len());
        if len == 0 {
            return None;
        }
        (MemberKind::Property, head[..len].to_string(), cursor + len)
    };

    let rest = &text[after_key..span.end];
    let trimmed = rest.trim_start();
    let mut offset = after_key + (rest.len() - trimmed.len());
    let mut optional = false;
    if trimmed.starts_with('?') {
        optional = true;
        offset += 1;
    }
    let rest = &text[offset..span.end];
    let trimmed = rest.trim_start();
    if !trimmed.starts_with(':') {
        return None;
    }
    offset += rest.len() - trimmed.len() + 1;
    let value = trim_span(text, offset..span.end);

    Some(Member {
        kind,
        key,
        optional,
        readonly,
        span,
        value,
    })
}

/// Spans of object literals reachable from the top of `text`.
///
/// Looks through `readonly` prefixes, parentheses, `[]` suffixes and the members
/// of top-level unions and intersections.
pub fn object_candidates(text: &str, span: Span) -> Vec<Span> {
    let span = trim_span(text, span);
    let slice = &text[span.clone()];
    if slice.is_empty() {
        return Vec::new();
    }

    for sep in ['|', '&'] {
        let parts = split_top_level(slice, sep);
        if parts.len() > 1 {
            return parts
                .into_iter()
                .flat_map(|p| object_candidates(text, span.start + p.start..span.start + p.end))
                .collect();
        }
    }

    if let Some(rest) = slice.strip_prefix("readonly ") {
        let start = span.start + (slice.len() - rest.len());
        return object_candidates(text, start..span.end);
    }
    if let Some(inner) = slice.strip_suffix("[]") {
        return object_candidates(text, span.start..span.start + inner.len());
    }
    if slice.starts_with('(') && is_wrapped(slice, '(') {
        return object_candidates(text, span.start + 1..span.end - 1);
    }
    if slice.starts_with('{') && is_wrapped(slice, '{') {
        return vec![span];
    }
    Vec::new()
}

/// Locate the value span of a (dotted) property path inside a type text.
pub fn find_property_value(text: &str, path: &[&str]) -> Option<Span> {
    let (first, rest) = path.split_first()?;
    for candidate in object_candidates(text, 0..text.len()) {
        let object = &text[candidate.clone()];
        let Some(members) = object_members(object) else {
            continue;
        };
        let Some(member) = members
            .iter()
            .find(|m| m.kind == MemberKind::Property && m.key == *first)
        else {
            continue;
        };
        let value = candidate.start + member.value.start..candidate.start + member.value.end;
        if rest.is_empty() {
            return Some(value);
        }
        let nested = &text[value.clone()];
        if let Some(inner) = find_property_value(nested, rest) {
            return Some(value.start + inner.start..value.start + inner.end);
        }
    }
    None
}

/// Looks like an unexpanded inline object: `{ ... }`, optionally `readonly`.
pub fn looks_like_inline_object(text: &str) -> bool {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix("readonly ").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("[]").unwrap_or(trimmed);
    trimmed.starts_with('{') && is_wrapped(trimmed, '{')
}

/// Looks like a record index signature: `{ [x: string]: T; }`.
pub fn looks_like_record(text: &str) -> bool {
    object_members(text.trim())
        .map(|members| members.len() == 1 && members[0].kind == MemberKind::Index)
        .unwrap_or(false)
}

/// Add parentheses when `text` would bind incorrectly next to `[]` or `&`.
pub fn parenthesize_compound(text: &str) -> String {
    let needs = split_top_level(text, '|').len() > 1
        || split_top_level(text, '&').len() > 1
        || scan(text).iter().any(|c| c.depth == 0 && c.ch == '>' && text[..c.index].ends_with('='));
    if needs {
        format!("({})", text)
    } else {
        text.to_string()
    }
}
