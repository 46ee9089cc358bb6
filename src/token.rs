//! Identifier boundaries in C-like text
//!
//! This is an approximation of a lexer: comments and string literals are
//! scanned like any other text.

use std::collections::HashSet;

/// Characters that may appear inside a C identifier
pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A neighbour of a match counts as a boundary if it cannot extend the identifier.
///
/// `None` means the match touches the start or the end of the text. Both are
/// always accepted as boundaries since there is no character there that could
/// join the match into a longer identifier.
pub fn is_boundary(neighbour: Option<char>) -> bool {
    match neighbour {
        None => true,
        Some(c) => !is_identifier_char(c),
    }
}

/// True if `name` consists of identifier characters only
pub fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_identifier_char)
}

/// Byte offsets of every occurrence of `needle` in `text` that is not part of
/// a longer identifier
pub fn bounded_occurrences<'a>(text: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    text.match_indices(needle)
        .map(|(idx, _)| idx)
        .filter(move |&idx| {
            let before = text[..idx].chars().next_back();
            let after = text[idx + needle.len()..].chars().next();
            !needle.is_empty() && is_boundary(before) && is_boundary(after)
        })
}

/// Maximal runs of identifier characters, in order of appearance
pub fn identifier_spans(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_identifier_char(c))
        .filter(|span| !span.is_empty())
}

/// The set of distinct identifier spans in `text`
pub fn identifier_set(text: &str) -> HashSet<&str> {
    identifier_spans(text).collect()
}

/// 1-based line number of a byte offset
pub fn line_of_offset(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}
